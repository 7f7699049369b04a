use serde::{Deserialize, Serialize};

/// Response body of `/get_documents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentsResponse {
    /// Filenames in the server-held session, in order.
    #[serde(default)]
    pub documents: Vec<String>,
}

/// Response body of `/set_api_key`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiKeyResponse {
    /// Whether the key was stored.
    #[serde(default)]
    pub success: bool,

    /// Error description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_documents_is_empty() {
        let response: DocumentsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.documents.is_empty());

        let response: DocumentsResponse =
            serde_json::from_str(r#"{"documents":["a.pdf"]}"#).unwrap();
        assert_eq!(response.documents, vec!["a.pdf".to_string()]);
    }

    #[test]
    fn api_key_failure() {
        let response: ApiKeyResponse =
            serde_json::from_str(r#"{"success":false,"error":"Invalid key"}"#).unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Invalid key"));
    }
}
