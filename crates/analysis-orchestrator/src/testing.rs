//! In-memory gateway used by the orchestrator tests.

use analysis_core::{
    AnalysisError, DividendObservation, FinancialStatements, MarketDataGateway, PriceBar, ProviderFundamentals,
    Ticker,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct StaticGateway {
    prices: HashMap<String, Vec<PriceBar>>,
    dividends: HashMap<String, Vec<DividendObservation>>,
    fundamentals: HashMap<String, ProviderFundamentals>,
    statements: HashMap<String, FinancialStatements>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    throttle: Duration,
    calls: Arc<AtomicUsize>,
}

impl StaticGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn with_fundamentals(mut self, symbol: &str, price: f64, eps: f64, bvps: f64) -> Self {
        self.fundamentals.insert(
            symbol.to_string(),
            ProviderFundamentals {
                regular_market_price: Some(price),
                trailing_eps: Some(eps),
                book_value: Some(bvps),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_provider(mut self, symbol: &str, fundamentals: ProviderFundamentals) -> Self {
        self.fundamentals.insert(symbol.to_string(), fundamentals);
        self
    }

    /// One payment of `annual_dpa` every June for each year in `years`.
    pub fn with_annual_dividends(mut self, symbol: &str, years: std::ops::RangeInclusive<i32>, annual_dpa: f64) -> Self {
        let divs = years
            .filter_map(|y| NaiveDate::from_ymd_opt(y, 6, 15))
            .map(|date| DividendObservation { date, amount: annual_dpa })
            .collect();
        self.dividends.insert(symbol.to_string(), divs);
        self
    }

    /// Flat monthly bars at `close` for each year in `years`.
    pub fn with_flat_prices(mut self, symbol: &str, years: std::ops::RangeInclusive<i32>, close: f64) -> Self {
        let bars = years
            .flat_map(|y| (1..=12u32).filter_map(move |m| NaiveDate::from_ymd_opt(y, m, 3)))
            .map(|date| PriceBar { date, open: close, high: close, low: close, close })
            .collect();
        self.prices.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_statements(mut self, symbol: &str, statements: FinancialStatements) -> Self {
        self.statements.insert(symbol.to_string(), statements);
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn panicking(mut self, symbol: &str) -> Self {
        self.panicking.insert(symbol.to_string());
        self
    }

    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    /// Every call waits `wait` for a slot and declares it as queue allowance.
    pub fn with_throttle(mut self, wait: Duration) -> Self {
        self.throttle = wait;
        self
    }

    async fn lookup<T: Clone>(&self, map: &HashMap<String, T>, ticker: &Ticker) -> Result<T, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let symbol = ticker.as_str();
        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }
        if let Some(delay) = self.delays.get(symbol) {
            tokio::time::sleep(*delay).await;
        }
        if self.panicking.contains(symbol) {
            panic!("provider blew up for {}", symbol);
        }
        if self.failing.contains(symbol) {
            return Err(AnalysisError::ApiError(format!("connection reset for {}", symbol)));
        }
        map.get(symbol)
            .cloned()
            .ok_or_else(|| AnalysisError::DataUnavailable(format!("no data for {}", symbol)))
    }
}

#[async_trait]
impl MarketDataGateway for StaticGateway {
    async fn price_history(&self, ticker: &Ticker, _years: u32) -> Result<Vec<PriceBar>, AnalysisError> {
        self.lookup(&self.prices, ticker).await
    }

    async fn dividend_history(&self, ticker: &Ticker) -> Result<Vec<DividendObservation>, AnalysisError> {
        self.lookup(&self.dividends, ticker).await
    }

    async fn fundamentals(&self, ticker: &Ticker) -> Result<ProviderFundamentals, AnalysisError> {
        self.lookup(&self.fundamentals, ticker).await
    }

    async fn financial_statements(&self, ticker: &Ticker) -> Result<FinancialStatements, AnalysisError> {
        self.lookup(&self.statements, ticker).await
    }

    fn queue_allowance(&self) -> Duration {
        self.throttle
    }
}
