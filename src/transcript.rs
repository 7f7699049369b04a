//! The ordered list of chat messages shown for the current session.

use crate::types::{ChatMessage, MessageId, MessageKind};

/// Chat transcript.
///
/// Messages are append-only; the only removals are the thinking placeholder
/// and a clear, which keeps the welcome message.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the id for the next message.
    pub fn next_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }

    /// Appends a message and returns its id.
    pub fn push(&mut self, message: ChatMessage) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Removes the message with `id`; returns it if it was present.
    pub fn remove(&mut self, id: MessageId) -> Option<ChatMessage> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Removes every message except welcome messages.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.kind == MessageKind::Welcome);
    }

    /// Returns the messages in display order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the transcript holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Returns true if a thinking placeholder is present.
    pub fn has_thinking(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.kind == MessageKind::Thinking)
    }
}
