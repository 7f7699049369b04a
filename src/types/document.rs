use serde::{Deserialize, Serialize};

/// A document associated with the active session.
///
/// Documents are only ever created from a server response; the position is the
/// document's ordinal within the set the server returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Display filename as reported by the server.
    pub filename: String,

    /// Zero-based position in the session's document set.
    pub position: usize,
}

impl Document {
    /// Creates a new Document.
    pub fn new(filename: impl Into<String>, position: usize) -> Self {
        Self {
            filename: filename.into(),
            position,
        }
    }
}

/// Builds an ordered document set from the filenames in a server response.
///
/// Duplicate filenames are kept; the server owns uniqueness.
pub fn documents_from_names<I, S>(names: I) -> Vec<Document>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .enumerate()
        .map(|(position, name)| Document::new(name, position))
        .collect()
}
