use crate::cache::{CacheKey, CachedValue, FetchCache, Operation};
use analysis_core::{
    AnalysisError, DividendObservation, FinancialStatements, MarketDataGateway, PriceBar, ProviderFundamentals,
    Ticker,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Gateway decorator memoizing successful calls; failures are never cached.
pub struct CachedGateway<G> {
    inner: G,
    cache: Arc<dyn FetchCache>,
}

impl<G: MarketDataGateway> CachedGateway<G> {
    pub fn new(inner: G, cache: Arc<dyn FetchCache>) -> Self {
        Self { inner, cache }
    }

    fn lookup(&self, key: &CacheKey) -> Option<CachedValue> {
        let hit = self.cache.get(key);
        debug!(
            "cache {} for {:?} {} {}",
            if hit.is_some() { "hit" } else { "miss" },
            key.operation,
            key.ticker,
            key.params
        );
        hit
    }
}

#[async_trait]
impl<G: MarketDataGateway> MarketDataGateway for CachedGateway<G> {
    async fn price_history(&self, ticker: &Ticker, years: u32) -> Result<Vec<PriceBar>, AnalysisError> {
        let key = CacheKey::new(Operation::PriceHistory, ticker, years.to_string());
        if let Some(CachedValue::Prices(bars)) = self.lookup(&key) {
            return Ok(bars.as_ref().clone());
        }
        let bars = self.inner.price_history(ticker, years).await?;
        self.cache.insert(key, CachedValue::Prices(Arc::new(bars.clone())));
        Ok(bars)
    }

    async fn dividend_history(&self, ticker: &Ticker) -> Result<Vec<DividendObservation>, AnalysisError> {
        let key = CacheKey::new(Operation::DividendHistory, ticker, "");
        if let Some(CachedValue::Dividends(divs)) = self.lookup(&key) {
            return Ok(divs.as_ref().clone());
        }
        let divs = self.inner.dividend_history(ticker).await?;
        self.cache.insert(key, CachedValue::Dividends(Arc::new(divs.clone())));
        Ok(divs)
    }

    async fn fundamentals(&self, ticker: &Ticker) -> Result<ProviderFundamentals, AnalysisError> {
        let key = CacheKey::new(Operation::Fundamentals, ticker, "");
        if let Some(CachedValue::Fundamentals(f)) = self.lookup(&key) {
            return Ok(f.as_ref().clone());
        }
        let f = self.inner.fundamentals(ticker).await?;
        self.cache.insert(key, CachedValue::Fundamentals(Arc::new(f.clone())));
        Ok(f)
    }

    async fn financial_statements(&self, ticker: &Ticker) -> Result<FinancialStatements, AnalysisError> {
        let key = CacheKey::new(Operation::FinancialStatements, ticker, "");
        if let Some(CachedValue::Statements(s)) = self.lookup(&key) {
            return Ok(s.as_ref().clone());
        }
        let s = self.inner.financial_statements(ticker).await?;
        self.cache.insert(key, CachedValue::Statements(Arc::new(s.clone())));
        Ok(s)
    }

    fn queue_allowance(&self) -> Duration {
        self.inner.queue_allowance()
    }
}
