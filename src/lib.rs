// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod controller;
pub mod error;
pub mod inflight;
pub mod observability;
pub mod render;
pub mod sanitize;
pub mod selection;
pub mod transcript;
pub mod types;
pub mod utils;

// Re-exports
pub use backend::Backend;
pub use client::DocChat;
pub use controller::{
    AlwaysConfirm, ChatController, ControllerConfig, Prompter, SessionState, StateChange,
    StateObserver,
};
pub use error::{Error, Result};
pub use inflight::{Action, CancelHandle};
pub use observability::register_biometrics;
pub use sanitize::SanitizedHtml;
pub use selection::FileSelection;
pub use transcript::Transcript;
pub use types::*;
