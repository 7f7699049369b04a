//! Yes/no confirmation on the terminal.

use rustyline::DefaultEditor;

use crate::controller::Prompter;

/// Asks confirmation questions on the terminal; anything but yes is no.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str) -> bool {
        let prompt = format!("{question} [y/N] ");
        let answer = match DefaultEditor::new() {
            Ok(mut editor) => editor.readline(&prompt),
            Err(err) => {
                log::warn!("cannot open line editor: {err}");
                return false;
            }
        };
        match answer {
            Ok(line) => is_yes(&line),
            Err(_) => false,
        }
    }
}

/// Parses a y/N answer.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
