use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_UPLOAD_BYTES,
};
use crate::selection::{PDF_MIME, file_name, is_pdf};
use crate::types::{
    ApiKeyRequest, ApiKeyResponse, ChatRequest, ChatResponse, DocumentsResponse, UploadResponse,
};

/// Server used when neither a URL nor the environment variable is given.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000/";
/// Timeout applied to every request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable consulted when no server URL is given.
pub const SERVER_URL_ENV: &str = "PDFCHAT_SERVER";

/// Endpoint paths of the document-chat service.
pub mod endpoints {
    pub const UPLOAD: &str = "/upload";
    pub const ADD_DOCUMENT: &str = "/add_document";
    pub const CHAT: &str = "/chat";
    pub const CLEAR: &str = "/clear";
    pub const GET_DOCUMENTS: &str = "/get_documents";
    pub const SET_API_KEY: &str = "/set_api_key";
}

/// Message used when the service reports failure without saying why.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Client for the document-chat service.
///
/// Every method issues exactly one request.  Responses are decoded as JSON
/// whatever the HTTP status, because the service reports logical failures as
/// 4xx/5xx replies with an `error` field; those come back as
/// [`Error::Server`].  The session is carried by cookies, which the client
/// keeps for its whole lifetime.
#[derive(Debug, Clone)]
pub struct DocChat {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl DocChat {
    /// Create a new client.
    ///
    /// The server URL can be provided directly or read from the PDFCHAT_SERVER
    /// environment variable; it defaults to a local development server.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(SERVER_URL_ENV).unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL all endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request and map transport failures into our Error type.
    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        result.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })
    }

    /// Decode a JSON body regardless of status; returns the status alongside.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<(u16, T)> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok((status, value)),
            Err(e) if (200..300).contains(&status) => Err(Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )),
            Err(_) => Err(Error::api(status, body)),
        }
    }

    async fn post_file(&self, endpoint: &'static str, path: &Path) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| Error::io(format!("cannot read {}", path.display()), err))?;
        CLIENT_UPLOAD_BYTES.count(bytes.len() as u64);
        let mime = if is_pdf(path) {
            PDF_MIME
        } else {
            "application/octet-stream"
        };
        let part = Part::bytes(bytes)
            .file_name(file_name(path))
            .mime_str(mime)
            .map_err(|e| Error::http_client(format!("Invalid MIME type: {}", e), Some(Box::new(e))))?;
        let form = Form::new().part("file", part);

        let url = self.endpoint(endpoint)?;
        log::debug!("POST {url} ({})", path.display());
        let response = self.execute(self.client.post(url).multipart(form)).await?;
        let (status, body) = Self::decode::<UploadResponse>(response).await?;
        if body.success {
            Ok(body)
        } else {
            Err(Error::server(
                endpoint,
                status,
                body.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            ))
        }
    }

    /// Upload a PDF, starting a new session on the server.
    pub async fn upload(&self, path: &Path) -> Result<UploadResponse> {
        self.post_file(endpoints::UPLOAD, path).await
    }

    /// Add a PDF to the current session.
    pub async fn add_document(&self, path: &Path) -> Result<UploadResponse> {
        self.post_file(endpoints::ADD_DOCUMENT, path).await
    }

    /// Ask a question about the session's documents.
    ///
    /// Succeeds only if the service returned a non-empty answer.
    pub async fn chat(&self, message: &str) -> Result<ChatResponse> {
        let url = self.endpoint(endpoints::CHAT)?;
        log::debug!("POST {url}");
        let request = self.client.post(url).json(&ChatRequest::new(message));
        let response = self.execute(request).await?;
        let (status, body) = Self::decode::<ChatResponse>(response).await?;
        if body.answer.as_deref().is_some_and(|answer| !answer.is_empty()) {
            Ok(body)
        } else {
            Err(Error::server(
                endpoints::CHAT,
                status,
                body.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            ))
        }
    }

    /// Tell the service to forget the chat history.
    ///
    /// The body of a successful reply is ignored; any other status is an
    /// [`Error::Api`].
    pub async fn clear(&self) -> Result<()> {
        let url = self.endpoint(endpoints::CLEAR)?;
        log::debug!("POST {url}");
        let response = self.execute(self.client.post(url)).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::api(
                status.as_u16(),
                format!("{} answered {}", endpoints::CLEAR, status),
            ))
        }
    }

    /// List the documents of the server-held session.
    pub async fn get_documents(&self) -> Result<DocumentsResponse> {
        let url = self.endpoint(endpoints::GET_DOCUMENTS)?;
        log::debug!("GET {url}");
        let response = self.execute(self.client.get(url)).await?;
        let (_, body) = Self::decode::<DocumentsResponse>(response).await?;
        Ok(body)
    }

    /// Hand the service the key it should use for its language model.
    pub async fn set_api_key(&self, api_key: &str) -> Result<ApiKeyResponse> {
        let url = self.endpoint(endpoints::SET_API_KEY)?;
        log::debug!("POST {url}");
        let request = self.client.post(url).json(&ApiKeyRequest::new(api_key));
        let response = self.execute(request).await?;
        let (status, body) = Self::decode::<ApiKeyResponse>(response).await?;
        if body.success {
            Ok(body)
        } else {
            Err(Error::server(
                endpoints::SET_API_KEY,
                status,
                body.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            ))
        }
    }
}

/// Parse a base URL, making sure relative joins stay beneath its path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
