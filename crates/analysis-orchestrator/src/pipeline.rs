use analysis_core::{AnalysisError, MarketDataGateway, SecurityAnalysis, Ticker};
use fundamental_analysis::{SecurityInputs, ValuationEngine};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-call timeout for provider requests.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetch-and-compute sequence for a single security.
///
/// Every fetch is bounded by `call_timeout` plus the gateway's queue
/// allowance, so time spent waiting for a rate-limit slot is not charged to
/// the request. A failed or timed-out fetch only degrades the metrics derived
/// from it.
pub struct AnalysisPipeline {
    gateway: Arc<dyn MarketDataGateway>,
    engine: ValuationEngine,
    call_timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, engine: ValuationEngine, call_timeout: Duration) -> Self {
        Self {
            gateway,
            engine,
            call_timeout,
        }
    }

    async fn step<T, F>(&self, ticker: &Ticker, name: &str, fetch: F) -> Option<T>
    where
        F: Future<Output = Result<T, AnalysisError>>,
    {
        let limit = self.call_timeout + self.gateway.queue_allowance();
        let result = match tokio::time::timeout(limit, fetch).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout(format!(
                "{} exceeded {:.1}s",
                name,
                limit.as_secs_f64()
            ))),
        };

        match result {
            Ok(value) => Some(value),
            Err(AnalysisError::DataUnavailable(msg)) => {
                debug!("{}: {} unavailable: {}", ticker, name, msg);
                None
            }
            Err(e) => {
                warn!(transient = e.is_transient(), "{}: {} failed: {}", ticker, name, e);
                None
            }
        }
    }

    pub async fn run(&self, ticker: &Ticker) -> SecurityAnalysis {
        let years = self.engine.params().years;
        let gw = &self.gateway;

        let (dividends, price_history, fundamentals, statements) = tokio::join!(
            self.step(ticker, "dividend history", gw.dividend_history(ticker)),
            self.step(ticker, "price history", gw.price_history(ticker, years)),
            self.step(ticker, "fundamentals", gw.fundamentals(ticker)),
            self.step(ticker, "financial statements", gw.financial_statements(ticker)),
        );

        if dividends.is_none() && price_history.is_none() && fundamentals.is_none() && statements.is_none() {
            warn!("{}: no data returned by the provider", ticker);
        }

        let inputs = SecurityInputs {
            dividends,
            price_history,
            fundamentals,
            statements,
        };
        self.engine.evaluate(ticker, &inputs)
    }
}
