//! Document redaction pipeline
//!
//! [`DocumentRedactor`] resolves the content type of a request, obtains the
//! document's rules through the shared [`RuleCache`], runs the matching
//! transform and emits the audit events for the pass.

pub mod audit;
pub mod extract;

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use rdx_core::{
    AuditEvent, AuditRecord, ContentType, RedactedContent, RedactionRequest, RedactionResult,
    RulePattern,
};
use rdx_rules::RuleCache;
use rdx_security::{
    EntityRecognizer, EntityRedactor, HeuristicRecognizer, StructuredRedactor, TextRedactor,
};

pub use audit::{AuditSink, StorageAuditSink, TracingAuditSink};
pub use extract::{PdftotextExtractor, TextExtractor};

const TEXT_MIME: &str = "text/plain";
const LOSSY_UTF8_WARNING: &str = "Content is not valid UTF-8; invalid sequences were replaced";

/// Decode text bytes, replacing invalid sequences and reporting that it did
fn decode_text(content: &[u8]) -> (Cow<'_, str>, Option<String>) {
    match std::str::from_utf8(content) {
        Ok(text) => (Cow::Borrowed(text), None),
        Err(e) => {
            tracing::warn!(valid_up_to = e.valid_up_to(), "Content is not valid UTF-8");
            (
                String::from_utf8_lossy(content),
                Some(LOSSY_UTF8_WARNING.to_string()),
            )
        }
    }
}

/// Output of one content-type branch, before timing is attached
struct Pass {
    content: RedactedContent,
    content_type: String,
    matches_found: usize,
    patterns_applied: usize,
    warning: Option<String>,
}

impl Pass {
    fn untouched(content: Vec<u8>, content_type: String, warning: String) -> Self {
        Self {
            content: RedactedContent::Original(content),
            content_type,
            matches_found: 0,
            patterns_applied: 0,
            warning: Some(warning),
        }
    }

    fn text(text: &str, rules: &[RulePattern], content_type: String) -> Self {
        let redactor = TextRedactor::new(rules);
        let result = redactor.redact(text);
        Self {
            content: RedactedContent::Text(result.text),
            content_type,
            matches_found: result.matches_found,
            patterns_applied: redactor.patterns_applied(),
            warning: None,
        }
    }
}

pub struct DocumentRedactor {
    rules: Arc<RuleCache>,
    extractor: Arc<dyn TextExtractor>,
    audit: Arc<dyn AuditSink>,
    entities: EntityRedactor,
}

impl DocumentRedactor {
    pub fn new(
        rules: Arc<RuleCache>,
        extractor: Arc<dyn TextExtractor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            rules,
            extractor,
            audit,
            entities: EntityRedactor::new(HeuristicRecognizer),
        }
    }

    /// Swap the recognizer used by [`Self::redact_entities`]
    pub fn with_entity_recognizer(mut self, recognizer: impl EntityRecognizer + 'static) -> Self {
        self.entities = EntityRedactor::new(recognizer);
        self
    }

    pub fn rule_cache(&self) -> &Arc<RuleCache> {
        &self.rules
    }

    /// Run one redaction pass. Never fails: every degraded path still
    /// produces a result, and exactly one pair of audit events is emitted.
    pub async fn redact(&self, request: RedactionRequest) -> RedactionResult {
        let start = Instant::now();
        let RedactionRequest {
            document,
            content_type,
            content,
            sensitive_fields,
            requester,
        } = request;
        let key = document.rule_key();

        let pass = match ContentType::from_mime(&content_type) {
            ContentType::PlainText => {
                let rules = self.rules.get(&key).await;
                let (text, warning) = decode_text(&content);
                let mut pass = Pass::text(&text, &rules, content_type.clone());
                pass.warning = warning;
                pass
            }
            ContentType::Json => {
                let rules = self.rules.get(&key).await;
                self.redact_json(&content, &rules, sensitive_fields, &content_type)
            }
            ContentType::Pdf => self.redact_pdf(content, &key).await,
            ContentType::Unsupported(mime) => {
                tracing::warn!(
                    document_id = %document.document_id,
                    content_type = %mime,
                    "Unsupported content type; returning document unchanged"
                );
                Pass::untouched(
                    content,
                    content_type.clone(),
                    format!("Content type '{mime}' is not supported for redaction; document returned unchanged"),
                )
            }
        };

        let result = RedactionResult {
            content: pass.content,
            content_type: pass.content_type,
            matches_found: pass.matches_found,
            patterns_applied: pass.patterns_applied,
            execution_time_ms: start.elapsed().as_millis() as u64,
            warning: pass.warning,
        };

        tracing::info!(
            document_id = %document.document_id,
            content_type = %content_type,
            patterns_applied = result.patterns_applied,
            matches_found = result.matches_found,
            elapsed_ms = result.execution_time_ms,
            "Redaction pass complete"
        );

        let record = AuditRecord::new(
            &document,
            &requester,
            content_type,
            result.patterns_applied,
            result.matches_found,
            result.execution_time_ms,
        );
        self.emit_audit(record).await;

        result
    }

    /// Best-effort entity pass; not part of [`Self::redact`]
    pub fn redact_entities(&self, text: &str) -> String {
        self.entities.redact(text)
    }

    fn redact_json(
        &self,
        content: &[u8],
        rules: &[RulePattern],
        sensitive_fields: HashSet<String>,
        content_type: &str,
    ) -> Pass {
        match serde_json::from_slice::<serde_json::Value>(content) {
            Ok(value) => {
                let redactor = StructuredRedactor::new(rules, sensitive_fields);
                let result = redactor.redact(&value);
                Pass {
                    content: RedactedContent::Structured(result.value),
                    content_type: content_type.to_string(),
                    matches_found: result.matches_found,
                    patterns_applied: redactor.patterns_applied(),
                    warning: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Body is not valid JSON; redacting as plain text");
                let (text, lossy) = decode_text(content);
                let mut pass = Pass::text(&text, rules, TEXT_MIME.to_string());
                let mut warning = format!("Content is not valid JSON ({e}); redacted as plain text");
                if let Some(lossy) = lossy {
                    warning = format!("{warning}. {lossy}");
                }
                pass.warning = Some(warning);
                pass
            }
        }
    }

    async fn redact_pdf(&self, content: Vec<u8>, key: &rdx_core::RuleKey) -> Pass {
        match self.extractor.extract_text(&content).await {
            Ok(text) => {
                let rules = self.rules.get(key).await;
                let mut pass = Pass::text(&text, &rules, TEXT_MIME.to_string());
                pass.warning = Some(
                    "PDF redacted as extracted plain text; original layout is not preserved"
                        .to_string(),
                );
                pass
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "PDF text extraction failed");
                Pass::untouched(
                    content,
                    "application/pdf".to_string(),
                    format!("PDF text extraction failed ({e}); document returned unchanged"),
                )
            }
        }
    }

    async fn emit_audit(&self, record: AuditRecord) {
        for event in AuditEvent::for_pass(record) {
            if let Err(e) = self.audit.record(&event).await {
                tracing::warn!(
                    document_id = %event.record().document_id,
                    error = %e,
                    "Failed to record audit event"
                );
            }
        }
    }
}
