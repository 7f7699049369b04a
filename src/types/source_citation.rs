use std::fmt;

use serde::{Deserialize, Serialize};

/// Where in the session's documents an answer came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCitation {
    /// Filename of the cited document, if the service named it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Cited page, 1-based.
    pub page: u32,
}

impl SourceCitation {
    /// Creates a new SourceCitation.
    pub fn new(filename: Option<String>, page: u32) -> Self {
        Self { filename, page }
    }
}

impl fmt::Display for SourceCitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filename {
            Some(filename) => write!(f, "Source: {} - Page {}", filename, self.page),
            None => write!(f, "Source: Page {}", self.page),
        }
    }
}
