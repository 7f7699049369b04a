use serde::{Deserialize, Serialize};

/// JSON body for `/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The user's question, already trimmed.
    pub message: String,
}

impl ChatRequest {
    /// Creates a new ChatRequest.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// JSON body for `/set_api_key`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeyRequest {
    /// The key to hand to the service.
    pub api_key: String,
}

impl ApiKeyRequest {
    /// Creates a new ApiKeyRequest.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for ApiKeyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyRequest")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
