use async_trait::async_trait;
use std::time::Duration;
use crate::{AnalysisError, DividendObservation, FinancialStatements, PriceBar, ProviderFundamentals, Ticker};

/// External market data provider.
///
/// Every method may fail or return partial data; callers degrade rather than abort.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Daily bars over the trailing `years`, ascending by date.
    async fn price_history(&self, ticker: &Ticker, years: u32) -> Result<Vec<PriceBar>, AnalysisError>;

    /// Full dividend history, ascending by date.
    async fn dividend_history(&self, ticker: &Ticker) -> Result<Vec<DividendObservation>, AnalysisError>;

    async fn fundamentals(&self, ticker: &Ticker) -> Result<ProviderFundamentals, AnalysisError>;

    async fn financial_statements(&self, ticker: &Ticker) -> Result<FinancialStatements, AnalysisError>;

    /// Longest time one call may spend queued behind provider throttling
    /// before its request is sent. Callers add it to their per-call timeout.
    fn queue_allowance(&self) -> Duration {
        Duration::ZERO
    }
}
