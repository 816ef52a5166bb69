pub mod redact;
pub mod rules;
pub mod serve;

use std::sync::Arc;

use rdx_config::{AuditSinkKind, Config, RuleSourceKind};
use rdx_engine::{
    AuditSink, DocumentRedactor, PdftotextExtractor, StorageAuditSink, TracingAuditSink,
};
use rdx_rules::{RuleCache, RuleSource, StaticRuleSource, StoreRuleSource};
use rdx_storage::Storage;

/// Wire the redaction pipeline from configuration
pub fn build_redactor(config: &Config, storage: &Storage) -> DocumentRedactor {
    let source: Arc<dyn RuleSource> = match config.rules.source {
        RuleSourceKind::Store => Arc::new(StoreRuleSource::new(storage.clone())),
        RuleSourceKind::Static => Arc::new(StaticRuleSource),
    };
    let ttl_secs = i64::try_from(config.rules.cache_ttl_secs).unwrap_or(i64::MAX);
    let cache = RuleCache::new(source).with_ttl(time::Duration::seconds(ttl_secs));

    let audit: Arc<dyn AuditSink> = match config.audit.sink {
        AuditSinkKind::Store => Arc::new(StorageAuditSink::new(storage.clone())),
        AuditSinkKind::Log => Arc::new(TracingAuditSink),
    };

    DocumentRedactor::new(
        Arc::new(cache),
        Arc::new(PdftotextExtractor::new(config.extract.pdftotext.clone())),
        audit,
    )
}
