use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::SourceCitation;
use crate::sanitize::{SanitizedHtml, render_markdown};

/// Identifier of a message within one controller's transcript.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person at the keyboard.
    User,
    /// The document-chat service (or the client speaking on its behalf).
    Bot,
}

/// How a message participates in the transcript.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// An ordinary question, answer, or confirmation.
    Normal,
    /// A failure reported in the transcript.
    Error,
    /// Transient placeholder shown while `/chat` is in flight.
    Thinking,
    /// Greeting that survives a clear.
    Welcome,
}

/// Body of a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum MessageBody {
    /// Plain text; escaped whenever it is rendered as HTML.
    Text { text: String },
    /// Markdown from the service together with its sanitized rendering.
    Markdown { source: String, html: SanitizedHtml },
}

impl MessageBody {
    /// Wraps plain text.
    pub fn text(text: impl Into<String>) -> Self {
        MessageBody::Text { text: text.into() }
    }

    /// Renders untrusted markdown and keeps the source alongside the sanitized HTML.
    pub fn markdown(source: impl Into<String>) -> Self {
        let source = source.into();
        let html = render_markdown(&source);
        MessageBody::Markdown { source, html }
    }

    /// The text as the author wrote it (markdown source for rendered bodies).
    pub fn as_source(&self) -> &str {
        match self {
            MessageBody::Text { text } => text,
            MessageBody::Markdown { source, .. } => source,
        }
    }
}

/// A message in the transcript.  Messages are never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub kind: MessageKind,
    pub body: MessageBody,
    /// Confidence between 0.0 and 1.0, for answers that carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceCitation>,
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,
}

impl ChatMessage {
    fn build(id: MessageId, role: Role, kind: MessageKind, body: MessageBody) -> Self {
        Self {
            id,
            role,
            kind,
            body,
            confidence: None,
            source: None,
            created_at: crate::utils::time::now(),
        }
    }

    /// A question typed by the user.
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::build(id, Role::User, MessageKind::Normal, MessageBody::text(text))
    }

    /// An informational bot message written by the client.
    pub fn bot_text(id: MessageId, text: impl Into<String>) -> Self {
        Self::build(id, Role::Bot, MessageKind::Normal, MessageBody::text(text))
    }

    /// An answer from the service, rendered from markdown.
    pub fn bot_answer(
        id: MessageId,
        markdown: &str,
        confidence: Option<f64>,
        source: Option<SourceCitation>,
    ) -> Self {
        let mut message = Self::build(
            id,
            Role::Bot,
            MessageKind::Normal,
            MessageBody::markdown(markdown),
        );
        message.confidence = confidence;
        message.source = source;
        message
    }

    /// A failure shown in the transcript.
    pub fn error(id: MessageId, text: impl Into<String>) -> Self {
        Self::build(id, Role::Bot, MessageKind::Error, MessageBody::text(text))
    }

    /// The transient placeholder shown while waiting for an answer.
    pub fn thinking(id: MessageId) -> Self {
        Self::build(
            id,
            Role::Bot,
            MessageKind::Thinking,
            MessageBody::text("Thinking..."),
        )
    }

    /// The persistent greeting.
    pub fn welcome(id: MessageId, text: impl Into<String>) -> Self {
        Self::build(id, Role::Bot, MessageKind::Welcome, MessageBody::text(text))
    }

    /// Confidence formatted as a percentage with one decimal, e.g. `87.0%`.
    pub fn confidence_percent(&self) -> Option<String> {
        self.confidence.map(format_confidence)
    }
}

/// Formats a 0.0-1.0 confidence as a percentage rounded to one decimal.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}
