//! Rendering of controller state.
//!
//! Two front-ends share this module: HTML templating for transcript and
//! document views (used for transcript export), and a plain-text terminal
//! renderer that observes the controller's state changes.  Both take every
//! piece of message text from [`crate::sanitize`].

use std::io::{self, Stdout, Write};

use crate::controller::{StateChange, StateObserver};
use crate::sanitize::{escape_text, terminal_safe};
use crate::types::{ChatMessage, Document, MessageBody, MessageId, MessageKind, Role};

/// ANSI escape code for dim text (used for status lines and the placeholder).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for the placeholder).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for document lists).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for alerts).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for citations).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for error messages).
const ANSI_RED: &str = "\x1b[31m";

/// Return to column zero and erase the line.
const ANSI_ERASE_LINE: &str = "\r\x1b[2K";

///////////////////////////////////////////// HTML /////////////////////////////////////////////

/// Renders one transcript entry as an HTML fragment.
pub fn render_message_html(message: &ChatMessage) -> String {
    let class = match (message.role, message.kind) {
        (_, MessageKind::Error) => "message error-message",
        (_, MessageKind::Thinking) => "message bot-message thinking",
        (_, MessageKind::Welcome) => "message bot-message welcome-message",
        (Role::User, MessageKind::Normal) => "message user-message",
        (Role::Bot, MessageKind::Normal) => "message bot-message",
    };

    let mut html = format!(r#"<div class="{class}">"#);
    match &message.body {
        MessageBody::Text { text } => html.push_str(escape_text(text).as_str()),
        MessageBody::Markdown { html: answer, .. } => {
            html.push_str(r#"<div class="answer">"#);
            html.push_str(answer.as_str());
            html.push_str("</div>");
        }
    }
    if let Some(percent) = message.confidence_percent() {
        html.push_str(&format!(
            r#"<div class="confidence">Confidence: {percent}</div>"#
        ));
    }
    if let Some(source) = &message.source {
        html.push_str(r#"<div class="source-page">Source: "#);
        if let Some(filename) = &source.filename {
            html.push_str(escape_text(filename).as_str());
            html.push_str(" - ");
        }
        html.push_str(&format!("Page {}</div>", source.page));
    }
    html.push_str("</div>");
    html
}

/// Renders a whole transcript.
pub fn render_transcript_html(messages: &[ChatMessage]) -> String {
    let mut html = String::from(r#"<div id="chat-messages">"#);
    for message in messages {
        html.push('\n');
        html.push_str(&render_message_html(message));
    }
    html.push_str("\n</div>\n");
    html
}

/// Renders the document list; empty for an empty set.
pub fn render_documents_html(documents: &[Document]) -> String {
    if documents.is_empty() {
        return String::new();
    }
    let mut html = format!("<h4>Current Documents ({}):</h4>", documents.len());
    for document in documents {
        html.push_str(r#"<span class="document-item">"#);
        html.push_str(escape_text(&document.filename).as_str());
        html.push_str("</span>");
    }
    html
}

/////////////////////////////////////////// Terminal ///////////////////////////////////////////

/// Formats a message for the terminal.  User messages format as their text.
pub fn format_message_text(message: &ChatMessage, use_color: bool) -> String {
    let body = terminal_safe(message.body.as_source());
    let mut text = match (message.kind, use_color) {
        (MessageKind::Error, true) => format!("{ANSI_RED}{body}{ANSI_RESET}"),
        (MessageKind::Thinking, true) => format!("{ANSI_DIM}{ANSI_ITALIC}{body}{ANSI_RESET}"),
        _ => body,
    };
    if let Some(percent) = message.confidence_percent() {
        text.push_str(&format!("\n  Confidence: {percent}"));
    }
    if let Some(source) = &message.source {
        let source = terminal_safe(&source.to_string());
        if use_color {
            text.push_str(&format!("\n  {ANSI_GREEN}{source}{ANSI_RESET}"));
        } else {
            text.push_str(&format!("\n  {source}"));
        }
    }
    text
}

/// Formats the document list for the terminal.
pub fn format_documents_text(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents loaded.".to_string();
    }
    let mut text = format!("Current Documents ({}):", documents.len());
    for document in documents {
        text.push_str(&format!(
            "\n  {}. {}",
            document.position + 1,
            terminal_safe(&document.filename)
        ));
    }
    text
}

/// Plain text renderer with optional ANSI styling.
///
/// Observes the controller and writes each state change to stdout (alerts go
/// to stderr).  The thinking placeholder is written without a newline so it
/// can be erased when the controller removes it.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    placeholder: Option<MessageId>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            placeholder: None,
        }
    }

    /// Flushes stdout to ensure immediate display.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Print an informational line.
    pub fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }

    /// Print an error line to stderr.
    pub fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_alert(&mut self, alert: &str) {
        let alert = terminal_safe(alert);
        if self.use_color {
            eprintln!("{ANSI_YELLOW}! {alert}{ANSI_RESET}");
        } else {
            eprintln!("! {alert}");
        }
    }

    fn print_message(&mut self, message: &ChatMessage) {
        match (message.role, message.kind) {
            // Already on screen as the line the user typed.
            (Role::User, _) => {}
            (_, MessageKind::Thinking) => {
                print!("{}", format_message_text(message, self.use_color));
                self.placeholder = Some(message.id);
                self.flush();
            }
            _ => {
                println!("{}", format_message_text(message, self.use_color));
                self.flush();
            }
        }
    }

    fn erase_placeholder(&mut self, id: MessageId) {
        if self.placeholder == Some(id) {
            self.placeholder = None;
            if self.use_color {
                print!("{ANSI_ERASE_LINE}");
            } else {
                println!();
            }
            self.flush();
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StateObserver for PlainTextRenderer {
    fn notify(&mut self, change: &StateChange) {
        match change {
            StateChange::MessageAppended(message) => self.print_message(message),
            StateChange::MessageRemoved(id) => self.erase_placeholder(*id),
            StateChange::TranscriptCleared => self.print_info("Chat history cleared."),
            StateChange::DocumentsReplaced(documents) => {
                let text = format_documents_text(documents);
                if self.use_color {
                    println!("{ANSI_CYAN}{text}{ANSI_RESET}");
                } else {
                    println!("{text}");
                }
                self.flush();
            }
            StateChange::ChatEnabled(true) => {
                self.print_info("Ask a question about your documents.")
            }
            StateChange::ChatEnabled(false) => {}
            StateChange::CurrentFile(Some(filename)) => {
                self.print_info(&format!("Current file: {}", terminal_safe(filename)))
            }
            StateChange::CurrentFile(None) => {}
            StateChange::Status(status) => self.print_info(&terminal_safe(status)),
            StateChange::Alert(alert) => self.print_alert(alert),
            StateChange::ApiKeyGate(true) => {
                self.print_alert("An API key is required. Enter it with /apikey <key>.")
            }
            StateChange::ApiKeyGate(false) => {}
            StateChange::Busy { .. } | StateChange::SelectionCleared => {}
        }
    }
}
