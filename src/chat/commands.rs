//! Slash command parsing for the chat application.
//!
//! Lines starting with `/` drive the controller's non-chat handlers; every
//! other line is a question for the service.

use std::path::PathBuf;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Upload a PDF, starting a new session.
    Upload(Vec<PathBuf>),

    /// Add a PDF to the current session.
    Add(Vec<PathBuf>),

    /// Confirm, then start over with a PDF.
    NewSession(Vec<PathBuf>),

    /// Clear the chat history.
    Clear,

    /// List the current documents.
    Docs,

    /// Submit the service's API key.
    ApiKey(String),

    /// Write the transcript as HTML to a file.
    Save(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a question.
///
/// # Examples
///
/// ```
/// # use pdfchat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/upload terms.pdf").is_some());
/// assert!(parse_command("What is the refund policy?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "upload" => parse_paths(argument, ChatCommand::Upload, "/upload"),
        "add" => parse_paths(argument, ChatCommand::Add, "/add"),
        "new" => parse_paths(argument, ChatCommand::NewSession, "/new"),
        "clear" => ChatCommand::Clear,
        "docs" | "documents" => ChatCommand::Docs,
        "apikey" | "api_key" => match argument {
            Some(key) => ChatCommand::ApiKey(key.to_string()),
            None => ChatCommand::Invalid("/apikey requires a key".to_string()),
        },
        "save" => match argument {
            Some(arg) => ChatCommand::Save(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Whitespace-separated paths; more than one is passed through so the
/// controller can reject the selection.
fn parse_paths<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(Vec<PathBuf>) -> ChatCommand,
{
    match argument {
        Some(arg) => constructor(arg.split_whitespace().map(PathBuf::from).collect()),
        None => ChatCommand::Invalid(format!("{} requires a PDF path", name)),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /upload <file.pdf>     Upload a PDF and start a new session
  /add <file.pdf>        Add a PDF to the current session
  /new <file.pdf>        Start over with a different PDF
  /clear                 Clear the chat history
  /docs                  List the current documents
  /apikey <key>          Save the API key used by the server
  /save <file.html>      Save the transcript as HTML
  /help                  Show this help message
  /quit                  Exit the chat
Anything else is sent as a question about your documents.
Press Ctrl+C to cancel a request in flight."#
}
