//! The chat client controller.
//!
//! [`ChatController`] owns every piece of client state: the document set, the
//! transcript, whether chat is enabled, and whether an API key must be entered
//! first.  Each handler turns one user intent into at most one request to the
//! [`Backend`], treats the response as authoritative, and reports every visible
//! effect to the registered [`StateObserver`]s as a [`StateChange`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::inflight::{Action, CancelHandle, InFlight};
use crate::observability::{
    CHAT_ANSWERS, CHAT_MESSAGES, CHAT_ROUND_TRIP, CONTROLLER_CANCELLATIONS,
    CONTROLLER_SERVER_ERRORS, CONTROLLER_SILENT_ERRORS, CONTROLLER_TRANSPORT_ERRORS,
    CONTROLLER_VALIDATION_REJECTIONS,
};
use crate::render::{render_documents_html, render_transcript_html};
use crate::selection::{FileSelection, check_file, file_name};
use crate::transcript::Transcript;
use crate::types::{
    ChatMessage, Document, MessageId, UploadResponse, documents_from_names,
};

pub const WELCOME_MESSAGE: &str =
    "Hello! Upload a PDF and ask me anything about its contents.";
pub const NEW_SESSION_CONFIRM: &str =
    "Are you sure you want to start a new session? This will clear the current chat and documents.";
pub const CLEAR_CONFIRM: &str = "Are you sure you want to clear the chat history?";
pub const PROCESSING_STATUS: &str = "Processing your PDF...";
pub const PROCESSED_STATUS: &str = "PDF processed successfully!";
pub const UPLOAD_TRANSPORT_ERROR: &str = "Error uploading file";
pub const ADD_DOCUMENT_ERROR: &str = "Error adding document";
pub const NEW_SESSION_ERROR: &str = "Error starting new session";
pub const API_KEY_ERROR: &str = "Error saving API key";
pub const API_KEY_SAVED: &str = "API key saved.";
pub const API_KEY_EMPTY: &str = "Please enter an API key.";
pub const API_KEY_REQUIRED: &str = "Please enter your API key first.";
pub const CHAT_DISABLED: &str = "Please upload a PDF first.";
pub const EMPTY_MESSAGE: &str = "Please enter a message.";
pub const NETWORK_ERROR: &str = "Network error";
pub const CANCELLED: &str = "Request cancelled";

/// A visible effect of a controller operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// The document set was replaced wholesale.
    DocumentsReplaced(Vec<Document>),
    /// A message was appended to the transcript.
    MessageAppended(ChatMessage),
    /// A message (the thinking placeholder) was removed.
    MessageRemoved(MessageId),
    /// Every message except the welcome message was removed.
    TranscriptCleared,
    /// The chat input was enabled or disabled.
    ChatEnabled(bool),
    /// The file named as the session's current document changed.
    CurrentFile(Option<String>),
    /// A request for `action` started or finished.
    Busy { action: Action, busy: bool },
    /// Status line text.
    Status(String),
    /// A blocking notice the user must see.
    Alert(String),
    /// The API-key gate was raised or lowered.
    ApiKeyGate(bool),
    /// A file selection was reset.
    SelectionCleared,
}

/// Receives state changes from the controller.
pub trait StateObserver: Send {
    /// Called once per change, in order.
    fn notify(&mut self, change: &StateChange);
}

/// Asks the user to confirm destructive actions.
pub trait Prompter: Send {
    /// Returns true if the user agreed.
    fn confirm(&mut self, question: &str) -> bool;
}

/// A prompter that agrees to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Prompter for AlwaysConfirm {
    fn confirm(&mut self, _: &str) -> bool {
        true
    }
}

/// Behavioral switches of the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Reject files that are not PDFs before uploading.
    pub validate_file_type: bool,
    /// Raise the API-key gate until a key is saved or a session is found.
    pub require_api_key: bool,
    /// Greeting kept at the top of the transcript; survives clears.
    pub welcome_message: Option<String>,
}

impl ControllerConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - File type validation: enabled
    /// - API key: not required
    /// - Welcome message: [`WELCOME_MESSAGE`]
    pub fn new() -> Self {
        Self {
            validate_file_type: true,
            require_api_key: false,
            welcome_message: Some(WELCOME_MESSAGE.to_string()),
        }
    }

    /// Sets whether file types are validated.
    pub fn with_type_validation(mut self, enabled: bool) -> Self {
        self.validate_file_type = enabled;
        self
    }

    /// Sets whether an API key is required.
    pub fn with_api_key_required(mut self, required: bool) -> Self {
        self.require_api_key = required;
        self
    }

    /// Sets or removes the welcome message.
    pub fn with_welcome_message(mut self, message: Option<String>) -> Self {
        self.welcome_message = message;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side view of the session.  The server is the source of truth; this
/// is what its latest authoritative responses said.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    documents: Vec<Document>,
    transcript: Transcript,
    chat_enabled: bool,
    current_filename: Option<String>,
    api_key_required: bool,
}

impl SessionState {
    /// The current document set.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// The transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Whether chat input is accepted.
    pub fn is_chat_enabled(&self) -> bool {
        self.chat_enabled
    }

    /// Whether a server-side session with documents is known to exist.
    pub fn is_session_active(&self) -> bool {
        self.chat_enabled
    }

    /// The most recently uploaded (or restored) document.
    pub fn current_filename(&self) -> Option<&str> {
        self.current_filename.as_deref()
    }

    /// Whether the API-key gate is up.
    pub fn api_key_required(&self) -> bool {
        self.api_key_required
    }
}

/// How a failed request should be reported.
enum Failure {
    Server(String),
    Transport,
    Cancelled,
    Local(String),
}

impl Failure {
    fn classify(err: &Error) -> Self {
        if let Some(message) = err.server_message() {
            CONTROLLER_SERVER_ERRORS.click();
            Failure::Server(message.to_string())
        } else if err.is_abort() {
            CONTROLLER_CANCELLATIONS.click();
            Failure::Cancelled
        } else if err.is_transport() {
            CONTROLLER_TRANSPORT_ERRORS.click();
            Failure::Transport
        } else {
            Failure::Local(err.to_string())
        }
    }

    /// `"<prefix>: <server error>"`, the bare prefix for transport failures.
    fn describe(&self, prefix: &str) -> String {
        match self {
            Failure::Server(message) => format!("{prefix}: {message}"),
            Failure::Transport => prefix.to_string(),
            Failure::Cancelled => CANCELLED.to_string(),
            Failure::Local(message) => format!("{prefix}: {message}"),
        }
    }
}

/// Event-driven controller for the document-chat client.
pub struct ChatController<B: Backend> {
    backend: B,
    config: ControllerConfig,
    prompter: Box<dyn Prompter>,
    observers: Vec<Box<dyn StateObserver>>,
    state: SessionState,
    in_flight: InFlight,
}

impl<B: Backend> ChatController<B> {
    /// Creates a controller.  Nothing is requested until [`bootstrap`](Self::bootstrap).
    pub fn new(backend: B, config: ControllerConfig, prompter: Box<dyn Prompter>) -> Self {
        let mut state = SessionState {
            api_key_required: config.require_api_key,
            ..SessionState::default()
        };
        if let Some(welcome) = &config.welcome_message {
            let id = state.transcript.next_id();
            state.transcript.push(ChatMessage::welcome(id, welcome.clone()));
        }
        Self {
            backend,
            config,
            prompter,
            observers: Vec::new(),
            state,
            in_flight: InFlight::new(),
        }
    }

    /// Registers an observer for subsequent state changes.
    pub fn add_observer(&mut self, observer: Box<dyn StateObserver>) {
        self.observers.push(observer);
    }

    /// Read-only view of the client state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The controller's configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// A handle for cancelling in-flight requests from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.in_flight.handle()
    }

    /// The transcript rendered through the sanitizing HTML templates.
    pub fn transcript_html(&self) -> String {
        render_transcript_html(self.state.transcript.messages())
    }

    /// The document list rendered as HTML.
    pub fn documents_html(&self) -> String {
        render_documents_html(&self.state.documents)
    }

    fn emit(&mut self, change: StateChange) {
        for observer in self.observers.iter_mut() {
            observer.notify(&change);
        }
    }

    fn append(&mut self, build: impl FnOnce(MessageId) -> ChatMessage) -> MessageId {
        let id = self.state.transcript.next_id();
        let message = build(id);
        self.state.transcript.push(message.clone());
        self.emit(StateChange::MessageAppended(message));
        id
    }

    fn alert(&mut self, message: impl Into<String>) {
        self.emit(StateChange::Alert(message.into()));
    }

    fn status(&mut self, message: impl Into<String>) {
        self.emit(StateChange::Status(message.into()));
    }

    fn clear_selection(&mut self, selection: &mut FileSelection) {
        selection.clear();
        self.emit(StateChange::SelectionCleared);
    }

    fn replace_documents(&mut self, documents: Vec<Document>) {
        self.state.documents = documents.clone();
        self.emit(StateChange::DocumentsReplaced(documents));
    }

    fn set_chat_enabled(&mut self, enabled: bool) {
        if self.state.chat_enabled != enabled {
            self.state.chat_enabled = enabled;
            self.emit(StateChange::ChatEnabled(enabled));
        }
    }

    fn set_current_file(&mut self, filename: Option<String>) {
        self.state.current_filename = filename.clone();
        self.emit(StateChange::CurrentFile(filename));
    }

    fn lower_api_key_gate(&mut self) {
        if self.state.api_key_required {
            self.state.api_key_required = false;
            self.emit(StateChange::ApiKeyGate(false));
        }
    }

    /// Runs one request under a fresh cancellation token for `action`.
    async fn run<T>(
        &self,
        action: Action,
        request: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let ticket = self.in_flight.begin(action);
        let result = tokio::select! {
            _ = ticket.token().cancelled() => {
                Err(Error::abort(format!("{action} request cancelled")))
            }
            result = request => result,
        };
        self.in_flight.finish(&ticket);
        result
    }

    /// Refuses everything but API-key entry while the gate is up.
    fn ensure_unlocked(&mut self) -> Result<()> {
        if self.state.api_key_required {
            CONTROLLER_VALIDATION_REJECTIONS.click();
            self.alert(API_KEY_REQUIRED);
            return Err(Error::validation(API_KEY_REQUIRED, None));
        }
        Ok(())
    }

    /// Validates a selection, returning the single file to send.
    ///
    /// On rejection the user is alerted and the selection is reset.
    async fn validated_file(&mut self, selection: &mut FileSelection) -> Result<Option<PathBuf>> {
        let result = match selection.single_file() {
            Ok(None) => Ok(None),
            Ok(Some(path)) => {
                let path = path.to_path_buf();
                check_file(&path, self.config.validate_file_type)
                    .await
                    .map(|()| Some(path))
            }
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            CONTROLLER_VALIDATION_REJECTIONS.click();
            log::info!("rejected file selection: {err}");
            match err.validation_message() {
                Some(message) => self.alert(message),
                None => self.alert(err.to_string()),
            }
            self.clear_selection(selection);
        }
        result
    }

    /// Posts `path` to `/upload` with status reporting.
    async fn send_upload(&mut self, action: Action, path: &Path) -> Result<UploadResponse> {
        self.emit(StateChange::Busy { action, busy: true });
        self.status(PROCESSING_STATUS);
        let result = self.run(action, self.backend.upload(path)).await;
        self.emit(StateChange::Busy {
            action,
            busy: false,
        });
        result
    }

    /// Replaces documents and transcript after a successful upload.
    fn start_session(&mut self, response: &UploadResponse, path: &Path) -> String {
        let filename = response
            .filename
            .clone()
            .unwrap_or_else(|| file_name(path));
        let documents = match &response.documents {
            Some(names) => documents_from_names(names.iter().cloned()),
            None => documents_from_names([filename.clone()]),
        };
        self.state.transcript.clear();
        self.emit(StateChange::TranscriptCleared);
        self.set_current_file(Some(filename.clone()));
        self.replace_documents(documents);
        self.set_chat_enabled(true);
        filename
    }

    /// Uploads the selected PDF, starting a fresh session.
    ///
    /// If a session is already active the user must confirm first; the old
    /// documents and messages are only discarded once the server accepts the
    /// new file.
    pub async fn upload(&mut self, selection: &mut FileSelection) -> Result<()> {
        self.ensure_unlocked()?;
        if selection.is_empty() {
            return Ok(());
        }
        if self.state.is_session_active() && !self.prompter.confirm(NEW_SESSION_CONFIRM) {
            self.clear_selection(selection);
            return Ok(());
        }
        let Some(path) = self.validated_file(selection).await? else {
            return Ok(());
        };

        let result = self.send_upload(Action::Upload, &path).await;
        self.clear_selection(selection);
        match result {
            Ok(response) => {
                self.start_session(&response, &path);
                self.status(PROCESSED_STATUS);
                Ok(())
            }
            Err(err) => {
                let status = match Failure::classify(&err) {
                    Failure::Server(message) => format!("Error: {message}"),
                    Failure::Transport => UPLOAD_TRANSPORT_ERROR.to_string(),
                    Failure::Cancelled => CANCELLED.to_string(),
                    Failure::Local(message) => format!("Error: {message}"),
                };
                log::info!("upload of {} failed: {err}", path.display());
                self.status(status);
                Err(err)
            }
        }
    }

    /// Adds the selected PDF to the current session.
    pub async fn add_document(&mut self, selection: &mut FileSelection) -> Result<()> {
        self.ensure_unlocked()?;
        let Some(path) = self.validated_file(selection).await? else {
            return Ok(());
        };

        let action = Action::AddDocument;
        self.emit(StateChange::Busy { action, busy: true });
        let result = self.run(action, self.backend.add_document(&path)).await;
        self.emit(StateChange::Busy {
            action,
            busy: false,
        });
        self.clear_selection(selection);

        match result {
            Ok(response) => {
                let filename = response
                    .filename
                    .clone()
                    .unwrap_or_else(|| file_name(&path));
                let documents = match response.documents {
                    Some(names) => documents_from_names(names),
                    None => {
                        let mut names: Vec<String> = self
                            .state
                            .documents
                            .iter()
                            .map(|d| d.filename.clone())
                            .collect();
                        names.push(filename.clone());
                        documents_from_names(names)
                    }
                };
                self.replace_documents(documents);
                self.append(|id| {
                    ChatMessage::bot_text(
                        id,
                        format!("✅ Document \"{filename}\" added successfully!"),
                    )
                });
                Ok(())
            }
            Err(err) => {
                log::info!("adding {} failed: {err}", path.display());
                let alert = Failure::classify(&err).describe(ADD_DOCUMENT_ERROR);
                self.alert(alert);
                Err(err)
            }
        }
    }

    /// Confirms, then replaces the session with the selected PDF.
    pub async fn new_session(&mut self, selection: &mut FileSelection) -> Result<()> {
        self.ensure_unlocked()?;
        if selection.is_empty() {
            return Ok(());
        }
        if !self.prompter.confirm(NEW_SESSION_CONFIRM) {
            self.clear_selection(selection);
            return Ok(());
        }
        let Some(path) = self.validated_file(selection).await? else {
            return Ok(());
        };

        let result = self.send_upload(Action::NewSession, &path).await;
        self.clear_selection(selection);
        match result {
            Ok(response) => {
                let filename = self.start_session(&response, &path);
                self.status(PROCESSED_STATUS);
                self.append(|id| {
                    ChatMessage::bot_text(
                        id,
                        format!("🆕 New session started with \"{filename}\"!"),
                    )
                });
                Ok(())
            }
            Err(err) => {
                log::info!("new session with {} failed: {err}", path.display());
                let alert = Failure::classify(&err).describe(NEW_SESSION_ERROR);
                self.alert(alert);
                Err(err)
            }
        }
    }

    /// Sends a question and renders the answer.
    ///
    /// The user's message is appended immediately.  A thinking placeholder is
    /// shown while the request is in flight and removed before the outcome is
    /// appended, whatever the outcome.
    pub async fn send_message(&mut self, input: &str) -> Result<()> {
        self.ensure_unlocked()?;
        let message = input.trim();
        if message.is_empty() {
            return Err(Error::validation(EMPTY_MESSAGE, None));
        }
        if !self.state.chat_enabled {
            CONTROLLER_VALIDATION_REJECTIONS.click();
            self.alert(CHAT_DISABLED);
            return Err(Error::validation(CHAT_DISABLED, None));
        }

        CHAT_MESSAGES.click();
        self.append(|id| ChatMessage::user(id, message));
        let placeholder = self.append(ChatMessage::thinking);

        let action = Action::Chat;
        self.emit(StateChange::Busy { action, busy: true });
        let start = Instant::now();
        let result = self.run(action, self.backend.chat(message)).await;
        CHAT_ROUND_TRIP.add(start.elapsed().as_secs_f64());
        if self.state.transcript.remove(placeholder).is_some() {
            self.emit(StateChange::MessageRemoved(placeholder));
        }
        self.emit(StateChange::Busy {
            action,
            busy: false,
        });

        match result {
            Ok(response) => {
                CHAT_ANSWERS.click();
                let citation = response.citation();
                let answer = response.answer.unwrap_or_default();
                self.append(|id| {
                    ChatMessage::bot_answer(id, &answer, response.confidence, citation)
                });
                Ok(())
            }
            Err(err) => {
                log::info!("chat request failed: {err}");
                let text = match Failure::classify(&err) {
                    Failure::Server(message) => format!("Error: {message}"),
                    Failure::Transport => NETWORK_ERROR.to_string(),
                    Failure::Cancelled => CANCELLED.to_string(),
                    Failure::Local(message) => format!("Error: {message}"),
                };
                self.append(|id| ChatMessage::error(id, text));
                Err(err)
            }
        }
    }

    /// Confirms, clears the transcript, and tells the server.
    ///
    /// The local clear stands even if the server cannot be told; that failure
    /// is only logged.
    pub async fn clear_history(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        if !self.prompter.confirm(CLEAR_CONFIRM) {
            return Ok(());
        }
        self.state.transcript.clear();
        self.emit(StateChange::TranscriptCleared);

        if let Err(err) = self.run(Action::Clear, self.backend.clear()).await {
            CONTROLLER_SILENT_ERRORS.click();
            log::warn!("failed to clear server-side history: {err}");
        }
        Ok(())
    }

    /// Submits the API key; lowers the gate on success.
    pub async fn submit_api_key(&mut self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            CONTROLLER_VALIDATION_REJECTIONS.click();
            self.alert(API_KEY_EMPTY);
            return Err(Error::validation(API_KEY_EMPTY, None));
        }

        let action = Action::SetApiKey;
        self.emit(StateChange::Busy { action, busy: true });
        let result = self.run(action, self.backend.set_api_key(api_key)).await;
        self.emit(StateChange::Busy {
            action,
            busy: false,
        });

        match result {
            Ok(_) => {
                self.lower_api_key_gate();
                self.status(API_KEY_SAVED);
                Ok(())
            }
            Err(err) => {
                log::info!("saving API key failed: {err}");
                let alert = Failure::classify(&err).describe(API_KEY_ERROR);
                self.alert(alert);
                Err(err)
            }
        }
    }

    /// Restores an existing server-side session, if there is one.
    ///
    /// Any failure means "no prior session" and is only logged.
    pub async fn bootstrap(&mut self) -> Result<()> {
        if self.state.api_key_required {
            self.emit(StateChange::ApiKeyGate(true));
        }
        match self
            .run(Action::Bootstrap, self.backend.get_documents())
            .await
        {
            Ok(response) if !response.documents.is_empty() => {
                log::info!(
                    "restored session with {} document(s)",
                    response.documents.len()
                );
                let current = response.documents.last().cloned();
                self.replace_documents(documents_from_names(response.documents));
                self.set_current_file(current);
                self.set_chat_enabled(true);
                self.lower_api_key_gate();
            }
            Ok(_) => log::debug!("no prior session"),
            Err(err) => {
                CONTROLLER_SILENT_ERRORS.click();
                log::warn!("session lookup failed: {err}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::selection::{MULTIPLE_FILES_MESSAGE, NOT_PDF_MESSAGE};
    use crate::types::{
        ApiKeyResponse, ChatResponse, DocumentsResponse, MessageBody, MessageKind, Role,
    };

    #[derive(Default)]
    struct FakeBackend {
        uploads: Mutex<VecDeque<Result<UploadResponse>>>,
        adds: Mutex<VecDeque<Result<UploadResponse>>>,
        chats: Mutex<VecDeque<Result<ChatResponse>>>,
        documents: Mutex<VecDeque<Result<DocumentsResponse>>>,
        clears: Mutex<VecDeque<Result<()>>>,
        api_keys: Mutex<VecDeque<Result<ApiKeyResponse>>>,
        calls: Arc<Mutex<Vec<&'static str>>>,
        hang_chat: bool,
    }

    fn next<T>(queue: &Mutex<VecDeque<Result<T>>>) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::connection("no scripted response", None)))
    }

    impl FakeBackend {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl Backend for FakeBackend {
        async fn upload(&self, _: &Path) -> Result<UploadResponse> {
            self.record("upload");
            next(&self.uploads)
        }

        async fn add_document(&self, _: &Path) -> Result<UploadResponse> {
            self.record("add_document");
            next(&self.adds)
        }

        async fn chat(&self, _: &str) -> Result<ChatResponse> {
            self.record("chat");
            if self.hang_chat {
                std::future::pending::<()>().await;
            }
            next(&self.chats)
        }

        async fn clear(&self) -> Result<()> {
            self.record("clear");
            next(&self.clears)
        }

        async fn get_documents(&self) -> Result<DocumentsResponse> {
            self.record("get_documents");
            next(&self.documents)
        }

        async fn set_api_key(&self, _: &str) -> Result<ApiKeyResponse> {
            self.record("set_api_key");
            next(&self.api_keys)
        }
    }

    struct Recorder(Arc<Mutex<Vec<StateChange>>>);

    impl StateObserver for Recorder {
        fn notify(&mut self, change: &StateChange) {
            self.0.lock().unwrap().push(change.clone());
        }
    }

    struct Answer(bool);

    impl Prompter for Answer {
        fn confirm(&mut self, _: &str) -> bool {
            self.0
        }
    }

    struct Harness {
        controller: ChatController<FakeBackend>,
        changes: Arc<Mutex<Vec<StateChange>>>,
        calls: Arc<Mutex<Vec<&'static str>>>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(backend: FakeBackend) -> Self {
            Self::with(backend, ControllerConfig::default(), true)
        }

        fn with(backend: FakeBackend, config: ControllerConfig, confirm: bool) -> Self {
            let calls = backend.calls.clone();
            let changes = Arc::new(Mutex::new(Vec::new()));
            let mut controller = ChatController::new(backend, config, Box::new(Answer(confirm)));
            controller.add_observer(Box::new(Recorder(changes.clone())));
            Self {
                controller,
                changes,
                calls,
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn file(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, b"%PDF-1.4\n").unwrap();
            path
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn alerts(&self) -> Vec<String> {
            self.changes
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    StateChange::Alert(a) => Some(a.clone()),
                    _ => None,
                })
                .collect()
        }

        fn statuses(&self) -> Vec<String> {
            self.changes
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    StateChange::Status(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        }

        fn filenames(&self) -> Vec<String> {
            self.controller
                .state()
                .documents()
                .iter()
                .map(|d| d.filename.clone())
                .collect()
        }

        fn last_text(&self) -> String {
            self.controller
                .state()
                .transcript()
                .last()
                .map(|m| m.body.as_source().to_string())
                .unwrap_or_default()
        }
    }

    fn scripted<T>(items: Vec<Result<T>>) -> Mutex<VecDeque<Result<T>>> {
        Mutex::new(items.into_iter().collect())
    }

    async fn active(backend: FakeBackend) -> Harness {
        let backend = FakeBackend {
            documents: scripted(vec![Ok(DocumentsResponse {
                documents: vec!["terms.pdf".to_string()],
            })]),
            ..backend
        };
        let mut harness = Harness::new(backend);
        harness.controller.bootstrap().await.unwrap();
        harness
    }

    #[tokio::test]
    async fn multiple_files_never_reach_the_server() {
        let mut harness = Harness::new(FakeBackend::default());
        let a = harness.file("a.pdf");
        let b = harness.file("b.pdf");

        for round in 0..3 {
            let mut selection: FileSelection = [a.clone(), b.clone()].into_iter().collect();
            let result = match round {
                0 => harness.controller.upload(&mut selection).await,
                1 => harness.controller.add_document(&mut selection).await,
                _ => harness.controller.new_session(&mut selection).await,
            };
            assert!(result.unwrap_err().is_validation());
            assert!(selection.is_empty());
        }
        assert!(harness.calls().is_empty());
        assert_eq!(harness.alerts(), vec![MULTIPLE_FILES_MESSAGE; 3]);
    }

    #[tokio::test]
    async fn non_pdf_is_rejected_before_sending() {
        let mut harness = Harness::new(FakeBackend::default());
        let txt = harness.dir.path().join("notes.txt");
        std::fs::write(&txt, b"plain").unwrap();

        let mut selection = FileSelection::single(&txt);
        let err = harness.controller.upload(&mut selection).await.unwrap_err();
        assert_eq!(err.validation_message(), Some(NOT_PDF_MESSAGE));
        assert!(selection.is_empty());
        assert!(harness.calls().is_empty());
        assert_eq!(harness.alerts(), vec![NOT_PDF_MESSAGE]);
    }

    #[tokio::test]
    async fn type_check_can_be_disabled() {
        let backend = FakeBackend {
            uploads: scripted(vec![Ok(UploadResponse::ok("notes.txt", None))]),
            ..FakeBackend::default()
        };
        let config = ControllerConfig::new().with_type_validation(false);
        let mut harness = Harness::with(backend, config, true);
        let txt = harness.dir.path().join("notes.txt");
        std::fs::write(&txt, b"plain").unwrap();

        let mut selection = FileSelection::single(&txt);
        harness.controller.upload(&mut selection).await.unwrap();
        assert_eq!(harness.calls(), vec!["upload"]);
    }

    #[tokio::test]
    async fn empty_selection_is_a_no_op() {
        let mut harness = Harness::new(FakeBackend::default());
        let mut selection = FileSelection::new();
        harness.controller.upload(&mut selection).await.unwrap();
        harness.controller.add_document(&mut selection).await.unwrap();
        harness.controller.new_session(&mut selection).await.unwrap();
        assert!(harness.calls().is_empty());
        assert!(harness.alerts().is_empty());
    }

    #[tokio::test]
    async fn upload_uses_server_documents() {
        let backend = FakeBackend {
            uploads: scripted(vec![Ok(UploadResponse::ok(
                "terms.pdf",
                Some(vec!["terms.pdf".to_string(), "faq.pdf".to_string()]),
            ))]),
            ..FakeBackend::default()
        };
        let mut harness = Harness::new(backend);
        let path = harness.file("terms.pdf");

        let mut selection = FileSelection::single(&path);
        harness.controller.upload(&mut selection).await.unwrap();

        assert_eq!(harness.filenames(), vec!["terms.pdf", "faq.pdf"]);
        let state = harness.controller.state();
        assert!(state.is_chat_enabled());
        assert_eq!(state.current_filename(), Some("terms.pdf"));
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(
            harness.statuses(),
            vec![PROCESSING_STATUS, PROCESSED_STATUS]
        );
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn upload_synthesizes_document_list() {
        let backend = FakeBackend {
            uploads: scripted(vec![Ok(UploadResponse::ok("terms.pdf", None))]),
            ..FakeBackend::default()
        };
        let mut harness = Harness::new(backend);
        let path = harness.file("terms.pdf");
        harness
            .controller
            .upload(&mut FileSelection::single(&path))
            .await
            .unwrap();
        assert_eq!(harness.filenames(), vec!["terms.pdf"]);
    }

    #[tokio::test]
    async fn upload_failure_leaves_state_alone() {
        let backend = FakeBackend {
            uploads: scripted(vec![
                Err(Error::server("/upload", 400, "Invalid file type. Please upload a PDF file.")),
                Err(Error::connection("refused", None)),
            ]),
            ..FakeBackend::default()
        };
        let mut harness = Harness::new(backend);
        let path = harness.file("terms.pdf");

        let err = harness
            .controller
            .upload(&mut FileSelection::single(&path))
            .await
            .unwrap_err();
        assert!(err.is_server());
        let err = harness
            .controller
            .upload(&mut FileSelection::single(&path))
            .await
            .unwrap_err();
        assert!(err.is_transport());

        assert!(harness.filenames().is_empty());
        assert!(!harness.controller.state().is_chat_enabled());
        assert_eq!(
            harness.statuses(),
            vec![
                PROCESSING_STATUS.to_string(),
                "Error: Invalid file type. Please upload a PDF file.".to_string(),
                PROCESSING_STATUS.to_string(),
                UPLOAD_TRANSPORT_ERROR.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn upload_over_active_session_needs_confirmation() {
        let backend = FakeBackend {
            documents: scripted(vec![Ok(DocumentsResponse {
                documents: vec!["old.pdf".to_string()],
            })]),
            ..FakeBackend::default()
        };
        let mut harness = Harness::with(backend, ControllerConfig::default(), false);
        harness.controller.bootstrap().await.unwrap();
        let path = harness.file("new.pdf");

        let mut selection = FileSelection::single(&path);
        harness.controller.upload(&mut selection).await.unwrap();
        assert_eq!(harness.calls(), vec!["get_documents"]);
        assert_eq!(harness.filenames(), vec!["old.pdf"]);
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn add_document_replaces_list_and_keeps_messages() {
        let backend = FakeBackend {
            adds: scripted(vec![Ok(UploadResponse::ok(
                "faq.pdf",
                Some(vec!["terms.pdf".to_string(), "faq.pdf".to_string()]),
            ))]),
            chats: scripted(vec![Ok(ChatResponse::answer("Yes."))]),
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;
        harness.controller.send_message("Is it?").await.unwrap();
        let before = harness.controller.state().transcript().len();

        let path = harness.file("faq.pdf");
        harness
            .controller
            .add_document(&mut FileSelection::single(&path))
            .await
            .unwrap();

        assert_eq!(harness.filenames(), vec!["terms.pdf", "faq.pdf"]);
        assert_eq!(harness.controller.state().transcript().len(), before + 1);
        assert_eq!(
            harness.last_text(),
            "✅ Document \"faq.pdf\" added successfully!"
        );
    }

    #[tokio::test]
    async fn add_document_failure_alerts() {
        let backend = FakeBackend {
            adds: scripted(vec![
                Err(Error::server("/add_document", 500, "Processing failed")),
                Err(Error::timeout("slow", Some(1.0))),
            ]),
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;
        let path = harness.file("faq.pdf");
        for _ in 0..2 {
            let mut selection = FileSelection::single(&path);
            assert!(harness.controller.add_document(&mut selection).await.is_err());
            assert!(selection.is_empty());
        }
        assert_eq!(
            harness.alerts(),
            vec![
                "Error adding document: Processing failed".to_string(),
                ADD_DOCUMENT_ERROR.to_string(),
            ]
        );
        assert_eq!(harness.filenames(), vec!["terms.pdf"]);
    }

    #[tokio::test]
    async fn new_session_replaces_everything() {
        let backend = FakeBackend {
            chats: scripted(vec![Ok(ChatResponse::answer("Old answer"))]),
            uploads: scripted(vec![Ok(UploadResponse::ok("fresh.pdf", None))]),
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;
        harness.controller.send_message("old question").await.unwrap();

        let path = harness.file("fresh.pdf");
        harness
            .controller
            .new_session(&mut FileSelection::single(&path))
            .await
            .unwrap();

        assert_eq!(harness.filenames(), vec!["fresh.pdf"]);
        let messages = harness.controller.state().transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, MessageKind::Welcome);
        assert_eq!(
            messages[1].body.as_source(),
            "🆕 New session started with \"fresh.pdf\"!"
        );
    }

    #[tokio::test]
    async fn new_session_declined() {
        let mut harness = Harness::with(FakeBackend::default(), ControllerConfig::default(), false);
        let path = harness.file("fresh.pdf");
        let mut selection = FileSelection::single(&path);
        harness.controller.new_session(&mut selection).await.unwrap();
        assert!(harness.calls().is_empty());
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn chat_renders_answer_with_metadata() {
        let backend = FakeBackend {
            chats: scripted(vec![Ok(ChatResponse::answer("## Refund\nWithin 30 days.")
                .with_confidence(0.87)
                .with_source(Some("terms.pdf".to_string()), 4))]),
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;
        harness
            .controller
            .send_message("  What is the refund policy?  ")
            .await
            .unwrap();

        let transcript = harness.controller.state().transcript();
        assert!(!transcript.has_thinking());
        let messages = transcript.messages();
        let question = &messages[messages.len() - 2];
        assert_eq!(question.role, Role::User);
        assert_eq!(question.body.as_source(), "What is the refund policy?");

        let html = harness.controller.transcript_html();
        assert!(html.contains("<h2>Refund</h2>"));
        assert!(html.contains("Confidence: 87.0%"));
        assert!(html.contains("Source: terms.pdf - Page 4"));
        assert!(!html.contains("Thinking..."));
    }

    #[tokio::test]
    async fn chat_answer_is_sanitized() {
        let backend = FakeBackend {
            chats: scripted(vec![Ok(ChatResponse::answer(
                "Sure <script>document.cookie</script><img src=x onerror=alert(1)>",
            ))]),
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;
        harness.controller.send_message("hi").await.unwrap();

        match &harness.controller.state().transcript().last().unwrap().body {
            MessageBody::Markdown { html, .. } => {
                assert!(!html.as_str().contains("<script"));
                assert!(!html.as_str().contains("onerror"));
            }
            other => panic!("unexpected body: {other:?}"),
        }
        assert!(!harness.controller.transcript_html().contains("<script"));
    }

    #[tokio::test]
    async fn chat_errors_remove_placeholder() {
        let backend = FakeBackend {
            chats: scripted(vec![
                Err(Error::server("/chat", 400, "Please upload a PDF first")),
                Err(Error::connection("refused", None)),
                Err(Error::server("/chat", 500, "<b>boom</b>")),
            ]),
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;

        assert!(harness.controller.send_message("one").await.is_err());
        assert_eq!(harness.last_text(), "Error: Please upload a PDF first");
        assert!(harness.controller.send_message("two").await.is_err());
        assert_eq!(harness.last_text(), NETWORK_ERROR);
        assert!(harness.controller.send_message("three").await.is_err());
        assert!(!harness.controller.transcript_html().contains("<b>boom"));

        let transcript = harness.controller.state().transcript();
        assert!(!transcript.has_thinking());
        assert_eq!(
            transcript
                .messages()
                .iter()
                .filter(|m| m.kind == MessageKind::Error)
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn chat_cancellation_removes_placeholder() {
        let backend = FakeBackend {
            hang_chat: true,
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;
        let handle = harness.controller.cancel_handle();
        let canceller = tokio::spawn(async move {
            while !handle.cancel(Action::Chat) {
                tokio::task::yield_now().await;
            }
        });

        let err = harness.controller.send_message("hang").await.unwrap_err();
        canceller.await.unwrap();
        assert!(err.is_abort());
        assert!(!harness.controller.state().transcript().has_thinking());
        assert_eq!(harness.last_text(), CANCELLED);
        let changes = harness.changes.lock().unwrap();
        assert!(changes.contains(&StateChange::Busy {
            action: Action::Chat,
            busy: false
        }));
    }

    #[tokio::test]
    async fn empty_or_disabled_chat_sends_nothing() {
        let mut harness = Harness::new(FakeBackend::default());
        let err = harness.controller.send_message("   ").await.unwrap_err();
        assert_eq!(err.validation_message(), Some(EMPTY_MESSAGE));
        let err = harness.controller.send_message("hello").await.unwrap_err();
        assert_eq!(err.validation_message(), Some(CHAT_DISABLED));
        assert!(harness.calls().is_empty());
        assert_eq!(harness.controller.state().transcript().len(), 1);
    }

    #[tokio::test]
    async fn clear_survives_server_failure() {
        let backend = FakeBackend {
            chats: scripted(vec![Ok(ChatResponse::answer("a"))]),
            clears: scripted(vec![Err(Error::connection("refused", None))]),
            ..FakeBackend::default()
        };
        let mut harness = active(backend).await;
        harness.controller.send_message("q").await.unwrap();
        assert_eq!(harness.controller.state().transcript().len(), 3);

        harness.controller.clear_history().await.unwrap();
        let messages = harness.controller.state().transcript().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Welcome);
        assert!(harness.calls().contains(&"clear"));
        assert!(harness.alerts().is_empty());
    }

    #[tokio::test]
    async fn clear_declined_keeps_messages() {
        let backend = FakeBackend {
            documents: scripted(vec![Ok(DocumentsResponse {
                documents: vec!["a.pdf".to_string()],
            })]),
            chats: scripted(vec![Ok(ChatResponse::answer("a"))]),
            ..FakeBackend::default()
        };
        let mut harness = Harness::with(backend, ControllerConfig::default(), false);
        harness.controller.bootstrap().await.unwrap();
        harness.controller.send_message("q").await.unwrap();
        harness.controller.clear_history().await.unwrap();
        assert_eq!(harness.controller.state().transcript().len(), 3);
        assert!(!harness.calls().contains(&"clear"));
    }

    #[tokio::test]
    async fn clear_without_welcome_empties_transcript() {
        let config = ControllerConfig::new().with_welcome_message(None);
        let mut harness = Harness::with(FakeBackend::default(), config, true);
        harness.controller.clear_history().await.unwrap();
        assert!(harness.controller.state().transcript().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_restores_session() {
        let harness = active(FakeBackend::default()).await;
        let state = harness.controller.state();
        assert!(state.is_chat_enabled());
        assert_eq!(state.current_filename(), Some("terms.pdf"));
        assert_eq!(harness.filenames(), vec!["terms.pdf"]);
        assert_eq!(
            harness.controller.documents_html(),
            r#"<h4>Current Documents (1):</h4><span class="document-item">terms.pdf</span>"#
        );
    }

    #[tokio::test]
    async fn bootstrap_failure_is_silent() {
        let mut harness = Harness::new(FakeBackend::default());
        harness.controller.bootstrap().await.unwrap();
        assert!(!harness.controller.state().is_chat_enabled());
        assert!(harness.alerts().is_empty());
        assert!(harness.statuses().is_empty());
    }

    #[tokio::test]
    async fn api_key_gate_blocks_until_saved() {
        let backend = FakeBackend {
            documents: scripted(vec![Ok(DocumentsResponse::default())]),
            api_keys: scripted(vec![
                Err(Error::server("/set_api_key", 400, "Invalid key")),
                Ok(ApiKeyResponse {
                    success: true,
                    error: None,
                }),
            ]),
            ..FakeBackend::default()
        };
        let config = ControllerConfig::new().with_api_key_required(true);
        let mut harness = Harness::with(backend, config, true);
        harness.controller.bootstrap().await.unwrap();
        assert!(harness.controller.state().api_key_required());

        let path = harness.file("terms.pdf");
        let err = harness
            .controller
            .upload(&mut FileSelection::single(&path))
            .await
            .unwrap_err();
        assert_eq!(err.validation_message(), Some(API_KEY_REQUIRED));
        assert!(harness.controller.send_message("hi").await.is_err());

        let err = harness.controller.submit_api_key("  ").await.unwrap_err();
        assert_eq!(err.validation_message(), Some(API_KEY_EMPTY));
        assert!(harness.controller.submit_api_key("bad").await.is_err());
        assert!(harness.controller.state().api_key_required());
        harness.controller.submit_api_key("good").await.unwrap();
        assert!(!harness.controller.state().api_key_required());

        assert_eq!(harness.calls(), vec!["get_documents", "set_api_key", "set_api_key"]);
        assert!(harness.alerts().contains(&"Error saving API key: Invalid key".to_string()));
    }

    #[tokio::test]
    async fn api_key_gate_lowered_by_existing_session() {
        let backend = FakeBackend {
            documents: scripted(vec![Ok(DocumentsResponse {
                documents: vec!["a.pdf".to_string()],
            })]),
            ..FakeBackend::default()
        };
        let config = ControllerConfig::new().with_api_key_required(true);
        let mut harness = Harness::with(backend, config, true);
        harness.controller.bootstrap().await.unwrap();
        assert!(!harness.controller.state().api_key_required());
        let changes = harness.changes.lock().unwrap();
        assert_eq!(changes.first(), Some(&StateChange::ApiKeyGate(true)));
        assert!(changes.contains(&StateChange::ApiKeyGate(false)));
    }
}
