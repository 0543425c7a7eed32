use analysis_core::{DividendObservation, FinancialStatements, PriceBar, ProviderFundamentals, Ticker};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Default TTL for memoized provider calls (1 hour).
pub const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PriceHistory,
    DividendHistory,
    Fundamentals,
    FinancialStatements,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: Operation,
    pub ticker: Ticker,
    /// Call parameters that change the response, e.g. the lookback in years.
    pub params: String,
}

impl CacheKey {
    pub fn new(operation: Operation, ticker: &Ticker, params: impl Into<String>) -> Self {
        Self {
            operation,
            ticker: ticker.clone(),
            params: params.into(),
        }
    }
}

/// Payloads are behind `Arc` so hits don't copy whole histories under the shard lock.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Prices(Arc<Vec<PriceBar>>),
    Dividends(Arc<Vec<DividendObservation>>),
    Fundamentals(Arc<ProviderFundamentals>),
    Statements(Arc<FinancialStatements>),
}

/// Memoization store shared by every pipeline in the process.
pub trait FetchCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CachedValue>;
    fn insert(&self, key: CacheKey, value: CachedValue);
}

/// Internal cache entry with timestamp
struct CacheEntry {
    data: CachedValue,
    cached_at: DateTime<Utc>,
}

/// DashMap-backed cache; expired entries are never served.
pub struct TtlCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry older than the TTL.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.cached_at < self.ttl);
        before.saturating_sub(self.entries.len())
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL_SECS)
    }
}

impl FetchCache for TtlCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        if let Some(entry) = self.entries.get(key) {
            if Utc::now() - entry.cached_at < self.ttl {
                return Some(entry.data.clone());
            }
        }
        // only removes if still stale, a concurrent refresh wins
        self.entries
            .remove_if(key, |_, entry| Utc::now() - entry.cached_at >= self.ttl);
        None
    }

    fn insert(&self, key: CacheKey, value: CachedValue) {
        self.entries.insert(
            key,
            CacheEntry {
                data: value,
                cached_at: Utc::now(),
            },
        );
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl FetchCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<CachedValue> {
        None
    }

    fn insert(&self, _key: CacheKey, _value: CachedValue) {}
}
