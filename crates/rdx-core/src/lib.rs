//! Core domain models for rdx
//!
//! This crate contains:
//! - Redaction rules and their lookup keys
//! - Redaction requests, content types and results
//! - Audit records (metadata only, never document content)

pub mod audit;
pub mod document;
pub mod error;
pub mod result;
pub mod rule;

pub use audit::{AuditEvent, AuditRecord};
pub use document::{ContentType, DocumentRef, RedactionRequest, Requester};
pub use error::{Error, Result};
pub use result::{RedactedContent, RedactionResult};
pub use rule::{DEFAULT_RULE_PRIORITY, RuleKey, RulePattern, default_rules};
