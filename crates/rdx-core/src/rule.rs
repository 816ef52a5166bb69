//! Redaction rule domain model

use serde::{Deserialize, Serialize};

/// Priority tier assigned to the built-in fallback rules
pub const DEFAULT_RULE_PRIORITY: i64 = 100;

/// A single redaction rule.
///
/// Rules are applied in ascending `priority` order. A rule is never mutated
/// during a redaction pass; resolved rule sets are shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePattern {
    /// Literal substring, or regex source when `is_regex` is set
    pub pattern: String,
    /// Literal text inserted in place of each match
    pub replacement: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default = "default_true")]
    pub is_global: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_true() -> bool {
    true
}

impl RulePattern {
    /// Literal, global, case-insensitive rule
    pub fn literal(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            priority: 0,
            is_regex: false,
            is_global: true,
            case_sensitive: false,
        }
    }

    /// Regex, global, case-insensitive rule
    pub fn regex(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            is_regex: true,
            ..Self::literal(pattern, replacement)
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Replace only the first match instead of every match
    pub fn first_only(mut self) -> Self {
        self.is_global = false;
        self
    }
}

/// Lookup key for a document's rule set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    pub document_id: String,
    pub document_type: String,
    #[serde(default)]
    pub document_subtype: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl RuleKey {
    pub fn new(document_id: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            document_type: document_type.into(),
            document_subtype: None,
            tenant_id: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.document_subtype = Some(subtype.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

impl std::fmt::Display for RuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.document_id,
            self.document_type,
            self.document_subtype.as_deref().unwrap_or("*"),
            self.tenant_id.as_deref().unwrap_or("*"),
        )
    }
}

/// Built-in rules used when a document has no rules of its own.
///
/// Order: SSN, phone (dashed/dotted), phone (parenthesized area code), email,
/// honorific-prefixed name.
pub fn default_rules() -> Vec<RulePattern> {
    vec![
        RulePattern::regex(r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
        RulePattern::regex(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b", "[REDACTED-PHONE]"),
        RulePattern::regex(r"\(\d{3}\)\s*\d{3}[-.]?\d{4}\b", "[REDACTED-PHONE]"),
        RulePattern::regex(
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            "[REDACTED-EMAIL]",
        ),
        RulePattern::regex(
            r"\b(?:Mr|Mrs|Ms|Dr|Prof)\.\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\b",
            "[REDACTED-NAME]",
        )
        .case_sensitive(),
    ]
    .into_iter()
    .map(|rule| rule.with_priority(DEFAULT_RULE_PRIORITY))
    .collect()
}
