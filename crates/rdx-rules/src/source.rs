//! Rule source trait

use async_trait::async_trait;
use rdx_core::{RuleKey, RulePattern, default_rules};
use rdx_storage::Storage;

/// Resolves the rule set for a document key.
///
/// An empty `Ok` means no rules are configured for the key. The cache treats
/// both that and `Err` as "use the defaults".
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn resolve(&self, key: &RuleKey) -> anyhow::Result<Vec<RulePattern>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Serves the built-in rules for every key
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticRuleSource;

#[async_trait]
impl RuleSource for StaticRuleSource {
    async fn resolve(&self, _key: &RuleKey) -> anyhow::Result<Vec<RulePattern>> {
        Ok(default_rules())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Reads rules from the SQLite rule store
#[derive(Clone)]
pub struct StoreRuleSource {
    storage: Storage,
}

impl StoreRuleSource {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl RuleSource for StoreRuleSource {
    async fn resolve(&self, key: &RuleKey) -> anyhow::Result<Vec<RulePattern>> {
        Ok(self.storage.rules_for(key).await?)
    }

    fn name(&self) -> &'static str {
        "store"
    }
}
