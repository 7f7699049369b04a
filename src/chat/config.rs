//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{DEFAULT_TIMEOUT, SERVER_URL_ENV};
use crate::controller::ControllerConfig;

/// Command-line arguments for the pdfchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the document-chat service.
    #[arrrg(optional, "Server URL (default: $PDFCHAT_SERVER or http://localhost:5000/)", "URL")]
    pub server: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 120)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Ask for the API key before anything else.
    #[arrrg(flag, "Require an API key before uploading or chatting")]
    pub require_api_key: bool,

    /// Skip the client-side PDF check.
    #[arrrg(flag, "Let the server decide which file types it accepts")]
    pub no_type_check: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Start with an empty transcript.
    #[arrrg(flag, "Do not show the welcome message")]
    pub no_welcome: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Service base URL; `None` means the client default.
    pub server_url: Option<String>,

    /// Timeout applied to every request.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether the API-key gate starts raised.
    pub require_api_key: bool,

    /// Whether files are checked for the PDF extension before upload.
    pub validate_file_type: bool,

    /// Whether the transcript starts with the welcome message.
    pub show_welcome: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Server: client default
    /// - Timeout: 120 seconds
    /// - Color: enabled
    /// - API key: not required
    /// - Type check: enabled
    /// - Welcome message: shown
    pub fn new() -> Self {
        Self {
            server_url: None,
            timeout: DEFAULT_TIMEOUT,
            use_color: true,
            require_api_key: false,
            validate_file_type: true,
            show_welcome: true,
        }
    }

    /// Sets the server URL.
    pub fn with_server_url(mut self, server_url: Option<String>) -> Self {
        self.server_url = server_url;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets whether an API key is required up front.
    pub fn with_api_key_required(mut self, required: bool) -> Self {
        self.require_api_key = required;
        self
    }

    /// Sets whether files are type-checked.
    pub fn with_type_validation(mut self, enabled: bool) -> Self {
        self.validate_file_type = enabled;
        self
    }

    /// Sets whether the welcome message is shown.
    pub fn with_welcome(mut self, show: bool) -> Self {
        self.show_welcome = show;
        self
    }

    /// The controller settings implied by this configuration.
    pub fn controller_config(&self) -> ControllerConfig {
        let config = ControllerConfig::new()
            .with_type_validation(self.validate_file_type)
            .with_api_key_required(self.require_api_key);
        if self.show_welcome {
            config
        } else {
            config.with_welcome_message(None)
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatConfig {
    /// Resolves arguments, falling back to `env_server` when `--server` is absent.
    pub fn from_args(args: ChatArgs, env_server: Option<String>) -> Self {
        let server_url = args
            .server
            .or(env_server)
            .filter(|url| !url.trim().is_empty());
        ChatConfig {
            server_url,
            timeout: args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            use_color: !args.no_color,
            require_api_key: args.require_api_key,
            validate_file_type: !args.no_type_check,
            show_welcome: !args.no_welcome,
        }
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig::from_args(args, std::env::var(SERVER_URL_ENV).ok())
    }
}
