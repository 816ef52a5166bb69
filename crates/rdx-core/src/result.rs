//! Redaction results

use serde::Serialize;

/// The artifact produced by a redaction pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RedactedContent {
    Text(String),
    Structured(serde_json::Value),
    /// Input returned untouched (unsupported or unreadable content)
    Original(Vec<u8>),
}

impl RedactedContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RedactedContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            RedactedContent::Structured(value) => Some(value),
            _ => None,
        }
    }

    /// Encode for transport (UTF-8 text, compact JSON, or raw bytes)
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RedactedContent::Text(text) => text.into_bytes(),
            RedactedContent::Structured(value) => value.to_string().into_bytes(),
            RedactedContent::Original(bytes) => bytes,
        }
    }
}

/// Outcome of one redaction pass. Created per call and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RedactionResult {
    pub content: RedactedContent,
    /// MIME type of `content`; differs from the input for PDFs
    pub content_type: String,
    pub matches_found: usize,
    pub patterns_applied: usize,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
