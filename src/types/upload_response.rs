use serde::{Deserialize, Serialize};

/// Response body of `/upload` and `/add_document`.
///
/// The service reports failure either with `success: false` or by omitting
/// `success` and sending only `error`, so every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    /// Whether the document was accepted and processed.
    #[serde(default)]
    pub success: bool,

    /// Server-side (sanitized) filename of the processed document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Filenames of every document in the session after this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,

    /// Error description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    /// Creates a successful response.
    pub fn ok(filename: impl Into<String>, documents: Option<Vec<String>>) -> Self {
        Self {
            success: true,
            filename: Some(filename.into()),
            documents,
            error: None,
        }
    }

    /// Creates a failed response.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            filename: None,
            documents: None,
            error: Some(error.into()),
        }
    }
}
