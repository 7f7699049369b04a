//! Terminal front-end for the document-chat client.
//!
//! The REPL in `pdfchat` is built from these pieces:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//! - [`prompter`]: Terminal confirmation for destructive actions
//!
//! Output comes from [`PlainTextRenderer`], registered as an observer of the
//! [`ChatController`](crate::controller::ChatController).

mod commands;
mod config;
mod prompter;

pub use crate::render::PlainTextRenderer;
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use prompter::{TerminalPrompter, is_yes};
