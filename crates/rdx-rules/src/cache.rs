//! Per-document rule cache

use std::sync::Arc;

use dashmap::DashMap;
use rdx_core::{RuleKey, RulePattern, default_rules};
use time::{Duration, OffsetDateTime};

use crate::source::RuleSource;

/// Entries older than this are refetched
pub const DEFAULT_TTL: Duration = Duration::hours(1);

/// Time source for staleness checks
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

struct CacheEntry {
    patterns: Arc<[RulePattern]>,
    fetched_at: OffsetDateTime,
}

/// Caches resolved rule sets by document key.
///
/// A stale or missing entry is always refetched; concurrent refetches of the
/// same key may both hit the source and the last insert wins. Source errors
/// and empty results are replaced by the default rules, and that fallback is
/// cached for the full TTL like any other result.
pub struct RuleCache {
    source: Arc<dyn RuleSource>,
    entries: DashMap<RuleKey, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RuleCache {
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self {
            source,
            entries: DashMap::new(),
            ttl: DEFAULT_TTL,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Rules for `key`, sorted by ascending priority. Never fails.
    pub async fn get(&self, key: &RuleKey) -> Arc<[RulePattern]> {
        let now = self.clock.now();
        let fresh = self
            .entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| Arc::clone(&entry.patterns));
        if let Some(patterns) = fresh {
            return patterns;
        }

        // Misses also drop stale entries for keys that are never asked for again
        self.evict_expired(now);

        let patterns = self.fetch(key).await;
        self.entries.insert(
            key.clone(),
            CacheEntry {
                patterns: Arc::clone(&patterns),
                fetched_at: self.clock.now(),
            },
        );
        patterns
    }

    async fn fetch(&self, key: &RuleKey) -> Arc<[RulePattern]> {
        match self.source.resolve(key).await {
            Ok(mut rules) if !rules.is_empty() => {
                // Stable: equal priorities keep fetch order
                rules.sort_by_key(|rule| rule.priority);
                tracing::debug!(
                    key = %key,
                    source = self.source.name(),
                    rules = rules.len(),
                    "Resolved redaction rules"
                );
                rules.into()
            }
            Ok(_) => {
                tracing::info!(
                    key = %key,
                    source = self.source.name(),
                    "No redaction rules configured; using defaults"
                );
                fallback_rules()
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    source = self.source.name(),
                    error = %e,
                    "Rule source failed; using default rules"
                );
                fallback_rules()
            }
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: OffsetDateTime) -> bool {
        now - entry.fetched_at < self.ttl
    }

    fn evict_expired(&self, now: OffsetDateTime) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired rule sets");
        }
    }

    pub fn invalidate(&self, key: &RuleKey) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fallback_rules() -> Arc<[RulePattern]> {
    let mut rules = default_rules();
    rules.sort_by_key(|rule| rule.priority);
    rules.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;

    enum Reply {
        Rules(Vec<RulePattern>),
        Fail,
    }

    struct CountingSource {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RuleSource for CountingSource {
        async fn resolve(&self, _key: &RuleKey) -> anyhow::Result<Vec<RulePattern>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Rules(rules) => Ok(rules.clone()),
                Reply::Fail => anyhow::bail!("connection refused"),
            }
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct ManualClock(Mutex<OffsetDateTime>);

    impl ManualClock {
        fn at(t: OffsetDateTime) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> OffsetDateTime {
            *self.0.lock().unwrap()
        }
    }

    fn key() -> RuleKey {
        RuleKey::new("doc-1", "510k")
    }

    #[tokio::test]
    async fn test_hit_serves_cached_rules() {
        let source = CountingSource::new(Reply::Rules(vec![RulePattern::literal("x", "[X]")]));
        let cache = RuleCache::new(source.clone());

        let first = cache.get(&key()).await;
        let second = cache.get(&key()).await;

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_falls_back_to_cached_defaults() {
        let source = CountingSource::new(Reply::Rules(Vec::new()));
        let cache = RuleCache::new(source.clone());

        let rules = cache.get(&key()).await;
        assert_eq!(rules.len(), 5);
        assert_eq!(&rules[..], &default_rules()[..]);

        cache.get(&key()).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_source_falls_back_and_caches() {
        let source = CountingSource::new(Reply::Fail);
        let cache = RuleCache::new(source.clone());

        let rules = cache.get(&key()).await;
        assert_eq!(&rules[..], &default_rules()[..]);

        cache.get(&key()).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let source = CountingSource::new(Reply::Rules(vec![RulePattern::literal("x", "[X]")]));
        let clock = ManualClock::at(datetime!(2026-03-01 9:00 UTC));
        let cache = RuleCache::new(source.clone()).with_clock(clock.clone());

        cache.get(&key()).await;

        clock.advance(Duration::minutes(59));
        cache.get(&key()).await;
        assert_eq!(source.calls(), 1);

        clock.advance(Duration::minutes(2));
        cache.get(&key()).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_entry_fetched_at_t0_is_miss_at_61_minutes() {
        let source = CountingSource::new(Reply::Rules(Vec::new()));
        let clock = ManualClock::at(datetime!(2026-03-01 9:00 UTC));
        let cache = RuleCache::new(source.clone()).with_clock(clock.clone());

        cache.get(&key()).await;
        clock.advance(Duration::minutes(61));
        cache.get(&key()).await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_miss_evicts_expired_entries_for_other_keys() {
        let source = CountingSource::new(Reply::Rules(vec![RulePattern::literal("x", "[X]")]));
        let clock = ManualClock::at(datetime!(2026-03-01 9:00 UTC));
        let cache = RuleCache::new(source.clone()).with_clock(clock.clone());

        for id in ["doc-a", "doc-b", "doc-c"] {
            cache.get(&RuleKey::new(id, "510k")).await;
        }
        clock.advance(Duration::minutes(30));
        cache.get(&RuleKey::new("doc-d", "510k")).await;
        assert_eq!(cache.len(), 4);

        clock.advance(Duration::minutes(31));
        cache.get(&RuleKey::new("doc-e", "510k")).await;

        // doc-a..c are past the TTL; doc-d is 31 minutes old
        assert_eq!(cache.len(), 2);
        cache.get(&RuleKey::new("doc-d", "510k")).await;
        assert_eq!(source.calls(), 5);
    }

    #[tokio::test]
    async fn test_zero_ttl_does_not_accumulate_entries() {
        let source = CountingSource::new(Reply::Rules(vec![RulePattern::literal("x", "[X]")]));
        let cache = RuleCache::new(source.clone()).with_ttl(Duration::ZERO);

        for i in 0..100 {
            cache.get(&RuleKey::new(format!("doc-{i}"), "510k")).await;
        }

        assert_eq!(cache.len(), 1);
        assert_eq!(source.calls(), 100);
    }

    #[tokio::test]
    async fn test_rules_sorted_stably_by_priority() {
        let source = CountingSource::new(Reply::Rules(vec![
            RulePattern::literal("a", "[A]").with_priority(5),
            RulePattern::literal("b", "[B]").with_priority(1),
            RulePattern::literal("c", "[C]").with_priority(5),
        ]));
        let cache = RuleCache::new(source);

        let rules = cache.get(&key()).await;
        let order: Vec<_> = rules.iter().map(|r| r.pattern.as_str()).collect();

        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = CountingSource::new(Reply::Rules(vec![RulePattern::literal("x", "[X]")]));
        let cache = RuleCache::new(source.clone());

        cache.get(&key()).await;
        cache.invalidate(&key());
        assert!(cache.is_empty());
        cache.get(&key()).await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_keys_are_cached_independently() {
        let source = CountingSource::new(Reply::Rules(vec![RulePattern::literal("x", "[X]")]));
        let cache = RuleCache::new(source.clone());

        cache.get(&key()).await;
        cache.get(&key().with_tenant("acme")).await;
        cache.get(&key().with_subtype("special")).await;

        assert_eq!(source.calls(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let source = CountingSource::new(Reply::Rules(vec![RulePattern::literal("x", "[X]")]));
        let cache = Arc::new(RuleCache::new(source.clone()));
        cache.get(&key()).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get(&key()).await.len() }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
        assert_eq!(source.calls(), 1);
    }
}
