//! The seam between the controller and the document-chat service.

use std::path::Path;

use crate::client::DocChat;
use crate::error::Result;
use crate::types::{ApiKeyResponse, ChatResponse, DocumentsResponse, UploadResponse};

/// Operations the controller needs from the document-chat service.
///
/// Implementations return `Err(Error::Server { .. })` for logical failures the
/// service reports and a transport-class error when the request itself fails.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Start a new session with one document.
    async fn upload(&self, path: &Path) -> Result<UploadResponse>;

    /// Add one document to the current session.
    async fn add_document(&self, path: &Path) -> Result<UploadResponse>;

    /// Ask a question; succeeds only when an answer came back.
    async fn chat(&self, message: &str) -> Result<ChatResponse>;

    /// Forget the chat history server-side.
    async fn clear(&self) -> Result<()>;

    /// List the server-held session's documents.
    async fn get_documents(&self) -> Result<DocumentsResponse>;

    /// Store the service's model API key.
    async fn set_api_key(&self, api_key: &str) -> Result<ApiKeyResponse>;
}

#[async_trait::async_trait]
impl Backend for DocChat {
    async fn upload(&self, path: &Path) -> Result<UploadResponse> {
        DocChat::upload(self, path).await
    }

    async fn add_document(&self, path: &Path) -> Result<UploadResponse> {
        DocChat::add_document(self, path).await
    }

    async fn chat(&self, message: &str) -> Result<ChatResponse> {
        DocChat::chat(self, message).await
    }

    async fn clear(&self) -> Result<()> {
        DocChat::clear(self).await
    }

    async fn get_documents(&self) -> Result<DocumentsResponse> {
        DocChat::get_documents(self).await
    }

    async fn set_api_key(&self, api_key: &str) -> Result<ApiKeyResponse> {
        DocChat::set_api_key(self, api_key).await
    }
}
