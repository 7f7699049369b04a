// Public modules
pub mod chat_message;
pub mod chat_request;
pub mod chat_response;
pub mod document;
pub mod documents_response;
pub mod source_citation;
pub mod upload_response;

// Re-exports
pub use chat_message::{ChatMessage, MessageBody, MessageId, MessageKind, Role, format_confidence};
pub use chat_request::{ApiKeyRequest, ChatRequest};
pub use chat_response::ChatResponse;
pub use document::{Document, documents_from_names};
pub use documents_response::{ApiKeyResponse, DocumentsResponse};
pub use source_citation::SourceCitation;
pub use upload_response::UploadResponse;
