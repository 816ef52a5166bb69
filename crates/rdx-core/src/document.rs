//! Redaction request model

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::RuleKey;

/// Content handling branch selected from a MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    PlainText,
    Json,
    Pdf,
    Unsupported(String),
}

impl ContentType {
    /// Resolve a MIME string (parameters such as `; charset=utf-8` are ignored)
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            ContentType::Json
        } else if essence == "application/pdf" {
            ContentType::Pdf
        } else if essence.starts_with("text/") {
            ContentType::PlainText
        } else {
            ContentType::Unsupported(essence)
        }
    }
}

/// Identity of the document being redacted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    pub document_type: String,
    #[serde(default)]
    pub document_subtype: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl DocumentRef {
    pub fn new(document_id: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            version_id: None,
            document_type: document_type.into(),
            document_subtype: None,
            tenant_id: None,
        }
    }

    pub fn rule_key(&self) -> RuleKey {
        RuleKey {
            document_id: self.document_id.clone(),
            document_type: self.document_type.clone(),
            document_subtype: self.document_subtype.clone(),
            tenant_id: self.tenant_id.clone(),
        }
    }
}

/// Who asked for the redaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requester {
    pub token_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// One redaction pass over one document
#[derive(Debug, Clone)]
pub struct RedactionRequest {
    pub document: DocumentRef,
    pub content_type: String,
    pub content: Vec<u8>,
    /// JSON keys whose values are blacked out entirely
    pub sensitive_fields: HashSet<String>,
    pub requester: Requester,
}

impl RedactionRequest {
    pub fn new(document: DocumentRef, content_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            document,
            content_type: content_type.into(),
            content,
            sensitive_fields: HashSet::new(),
            requester: Requester::default(),
        }
    }

    pub fn with_sensitive_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitive_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = requester;
        self
    }
}
