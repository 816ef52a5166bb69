//! Redaction transforms
//!
//! - [`TextRedactor`]: ordered rule passes over plain text
//! - [`StructuredRedactor`]: JSON walk with field-level blackout
//! - [`EntityRedactor`]: best-effort person/organization/location fallback

pub mod entity;
pub mod structured;
pub mod text;

pub use entity::{EntityRecognizer, EntityRedactor, HeuristicRecognizer};
pub use structured::{FIELD_SENTINEL, StructuredRedaction, StructuredRedactor};
pub use text::{TextRedaction, TextRedactor, compile_rule, redact_text};
