//! Interactive client for a PDF document-chat service.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local server
//! pdfchat
//!
//! # Talk to another server, asking for the API key first
//! pdfchat --server http://docs.internal:5000 --require-api-key
//!
//! # Disable colors (useful for piping output)
//! pdfchat --no-color
//! ```
//!
//! # Commands
//!
//! - `/upload <file.pdf>` - Upload a PDF and start a session
//! - `/add <file.pdf>` - Add a PDF to the session
//! - `/new <file.pdf>` - Start over with another PDF
//! - `/clear` - Clear the chat history
//! - `/docs` - List the current documents
//! - `/save <file.html>` - Save the transcript
//! - `/quit` - Exit the application
//!
//! Set `RUST_LOG=pdfchat=debug` for diagnostics.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use pdfchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, TerminalPrompter, help_text,
    parse_command,
};
use pdfchat::render::format_documents_text;
use pdfchat::{ChatController, DocChat, FileSelection};

/// Main entry point for the pdfchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let (args, _) = ChatArgs::from_command_line_relaxed("pdfchat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let client = DocChat::with_options(config.server_url.clone(), Some(config.timeout))?;
    let server = client.base_url().to_string();
    let mut controller = ChatController::new(
        client,
        config.controller_config(),
        Box::new(TerminalPrompter::new()),
    );
    controller.add_observer(Box::new(PlainTextRenderer::with_color(use_color)));
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C while a request is in flight cancels it.
    let cancel = controller.cancel_handle();
    ctrlc::set_handler(move || {
        let cancelled = cancel.cancel_all();
        log::debug!("cancelled {cancelled} in-flight request(s)");
    })?;

    println!("PDF Chat ({server})");
    println!("Type /help for commands, /quit to exit\n");
    for message in controller.state().transcript().messages() {
        println!("{}", pdfchat::render::format_message_text(message, use_color));
    }

    let _ = controller.bootstrap().await;

    while controller.state().api_key_required() {
        match rl.readline("API key: ") {
            Ok(line) => {
                let _ = controller.submit_api_key(&line).await;
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(_) => {
                println!("\nGoodbye!");
                return Ok(());
            }
        }
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    let result = match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Upload(paths) => {
                            let mut selection: FileSelection = paths.into_iter().collect();
                            controller.upload(&mut selection).await
                        }
                        ChatCommand::Add(paths) => {
                            let mut selection: FileSelection = paths.into_iter().collect();
                            controller.add_document(&mut selection).await
                        }
                        ChatCommand::NewSession(paths) => {
                            let mut selection: FileSelection = paths.into_iter().collect();
                            controller.new_session(&mut selection).await
                        }
                        ChatCommand::Clear => controller.clear_history().await,
                        ChatCommand::ApiKey(key) => controller.submit_api_key(&key).await,
                        ChatCommand::Docs => {
                            renderer.print_info(&format_documents_text(
                                controller.state().documents(),
                            ));
                            Ok(())
                        }
                        ChatCommand::Save(path) => {
                            match tokio::fs::write(&path, controller.transcript_html()).await {
                                Ok(()) => {
                                    renderer.print_info(&format!("Transcript saved to {}", path))
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Failed to save transcript: {}", err)),
                            }
                            Ok(())
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                            Ok(())
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                            Ok(())
                        }
                    };
                    // Failures were already shown through the renderer.
                    if let Err(err) = result {
                        log::debug!("command failed: {err}");
                    }
                    continue;
                }

                if let Err(err) = controller.send_message(line).await {
                    log::debug!("chat failed: {err}");
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}
