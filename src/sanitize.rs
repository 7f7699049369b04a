//! Sanitization of untrusted text.
//!
//! Answers from the document-chat service are derived from uploaded documents
//! and must be treated as attacker-influenced.  Every string that ends up in
//! rendered output goes through one of the functions here:
//!
//! - [`render_markdown`] turns markdown into allow-listed HTML.
//! - [`escape_text`] escapes plain text for inclusion in HTML.
//! - [`terminal_safe`] removes control characters before text reaches a terminal.

use std::fmt;

use pulldown_cmark::{Options, Parser};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// HTML that has been through the sanitizer.
///
/// The only ways to obtain one are [`render_markdown`], [`escape_text`],
/// [`SanitizedHtml::clean`], and deserialization (which cleans again).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedHtml(String);

impl SanitizedHtml {
    /// Sanitizes an untrusted HTML fragment against ammonia's tag allow-list.
    pub fn clean(untrusted: &str) -> Self {
        SanitizedHtml(ammonia::clean(untrusted))
    }

    /// Returns the sanitized markup.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the sanitized markup.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SanitizedHtml {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SanitizedHtml {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SanitizedHtml::clean(&raw))
    }
}

/// Renders untrusted markdown to sanitized HTML.
pub fn render_markdown(markdown: &str) -> SanitizedHtml {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    SanitizedHtml::clean(&html_output)
}

/// Escapes plain text so that it renders literally inside HTML.
pub fn escape_text(text: &str) -> SanitizedHtml {
    SanitizedHtml(ammonia::clean_text(text))
}

/// Strips control characters (escape sequences included) except newlines and tabs.
pub fn terminal_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
