use rdx_core::RulePattern;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A stored rule with the key columns it applies to.
///
/// `None` in `document_id`, `document_subtype` or `tenant_id` means the rule
/// applies to every value of that column within its `document_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: i64,
    pub document_id: Option<String>,
    pub document_type: String,
    pub document_subtype: Option<String>,
    pub tenant_id: Option<String>,
    #[serde(flatten)]
    pub rule: RulePattern,
    pub is_active: bool,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

/// Rule to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRule {
    #[serde(default)]
    pub document_id: Option<String>,
    pub document_type: String,
    #[serde(default)]
    pub document_subtype: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(flatten)]
    pub rule: RulePattern,
}

impl NewRule {
    pub fn for_document(
        document_id: impl Into<String>,
        document_type: impl Into<String>,
        rule: RulePattern,
    ) -> Self {
        Self {
            document_id: Some(document_id.into()),
            document_type: document_type.into(),
            document_subtype: None,
            tenant_id: None,
            rule,
        }
    }

    /// Rule applying to every document of `document_type`
    pub fn for_type(document_type: impl Into<String>, rule: RulePattern) -> Self {
        Self {
            document_id: None,
            document_type: document_type.into(),
            document_subtype: None,
            tenant_id: None,
            rule,
        }
    }
}
