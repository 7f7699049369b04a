use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::SourceCitation;

/// Response body of `/chat`.
///
/// Older deployments of the service return the answer under `response`
/// instead of `answer`; both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// Markdown answer produced by the service.
    #[serde(default, alias = "response", skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Confidence score between 0.0 and 1.0.
    #[serde(
        default,
        deserialize_with = "lenient_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,

    /// Page of the cited source, 1-based.
    #[serde(
        default,
        deserialize_with = "lenient_page",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_number: Option<u32>,

    /// Filename of the cited source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Error description when no answer could be produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Creates a response carrying an answer.
    pub fn answer(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    /// Sets the confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the cited source.
    pub fn with_source(mut self, filename: Option<String>, page_number: u32) -> Self {
        self.filename = filename;
        self.page_number = Some(page_number);
        self
    }

    /// Returns the citation to display, if any.
    ///
    /// A citation needs a non-zero page number; an empty filename is treated
    /// as absent.
    pub fn citation(&self) -> Option<SourceCitation> {
        let page = self.page_number.filter(|page| *page != 0)?;
        let filename = self.filename.clone().filter(|name| !name.is_empty());
        Some(SourceCitation::new(filename, page))
    }
}

/// Confidence as a finite number or numeric string; anything else is absent.
fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let confidence = match &value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(confidence.filter(|c| c.is_finite()))
}

/// Page as an integer, an integral float (`4.0`), or a numeric string;
/// anything else is absent.
fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let page = match &value {
        Value::Number(number) => match number.as_u64() {
            Some(page) => Some(page as f64),
            None => number.as_f64(),
        },
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(page
        .filter(|p| p.is_finite() && p.fract() == 0.0 && *p >= 0.0 && *p <= u32::MAX as f64)
        .map(|p| p as u32))
}
