pub mod cache;
pub mod cached_gateway;
pub mod executor;
pub mod pipeline;
pub mod screener;
#[cfg(test)]
mod testing;

pub use cache::{CacheKey, CachedValue, FetchCache, NoopCache, Operation, TtlCache};
pub use cached_gateway::CachedGateway;
pub use executor::{BoundedExecutor, ExecutorConfig};
pub use pipeline::AnalysisPipeline;
pub use screener::{aggregate, BatchReport, BatchWarning, FundamentalRow, ScreenFilters};

use analysis_core::{normalize_tickers, AnalysisError, MarketDataGateway, NormalizerConfig, SecurityAnalysis};
use chrono::NaiveDate;
use fundamental_analysis::{EngineParams, ValuationEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const MIN_YEARS: u32 = 1;
pub const MAX_YEARS: u32 = 20;
pub const MIN_TARGET_RETURN_PCT: f64 = 0.1;
pub const MAX_TARGET_RETURN_PCT: f64 = 100.0;

/// Caller-supplied parameters for one batch.
#[derive(Debug, Clone)]
pub struct BatchParams {
    pub years: u32,
    /// Target annual return in percent (6.0 for 6%).
    pub target_return_pct: f64,
    pub growth_years: u32,
    /// Today in the market timezone.
    pub as_of: NaiveDate,
    pub filters: ScreenFilters,
}

impl BatchParams {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(MIN_YEARS..=MAX_YEARS).contains(&self.years) {
            return Err(AnalysisError::InvalidConfig(format!(
                "years must be between {} and {}, got {}",
                MIN_YEARS, MAX_YEARS, self.years
            )));
        }
        if !(MIN_TARGET_RETURN_PCT..=MAX_TARGET_RETURN_PCT).contains(&self.target_return_pct) {
            return Err(AnalysisError::InvalidConfig(format!(
                "target return must be between {}% and {}%, got {}%",
                MIN_TARGET_RETURN_PCT, MAX_TARGET_RETURN_PCT, self.target_return_pct
            )));
        }
        if self.growth_years == 0 {
            return Err(AnalysisError::InvalidConfig("growth window must be at least 1 year".to_string()));
        }
        Ok(())
    }

    /// Target return as a decimal.
    pub fn target_rate(&self) -> f64 {
        self.target_return_pct / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub normalizer: NormalizerConfig,
    pub executor: ExecutorConfig,
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            executor: ExecutorConfig::default(),
            call_timeout: pipeline::DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Runs normalization, the per-security pipeline and ranking for a batch.
pub struct ValuationOrchestrator {
    gateway: Arc<dyn MarketDataGateway>,
    executor: BoundedExecutor,
    config: OrchestratorConfig,
}

impl ValuationOrchestrator {
    /// `gateway` is usually a [`CachedGateway`] so the cache outlives batches.
    pub fn new(gateway: Arc<dyn MarketDataGateway>, config: OrchestratorConfig) -> Self {
        Self {
            gateway,
            executor: BoundedExecutor::new(config.executor.clone()),
            config,
        }
    }

    pub async fn run_batch(&self, raw_tickers: &str, params: &BatchParams) -> Result<BatchReport, AnalysisError> {
        params.validate()?;

        let normalized = normalize_tickers(raw_tickers, &self.config.normalizer);
        let mut warnings = Vec::new();
        if !normalized.invalid.is_empty() {
            warnings.push(BatchWarning::InvalidTickers(normalized.invalid.clone()));
        }
        if !normalized.over_limit.is_empty() {
            warnings.push(BatchWarning::OverLimit(normalized.over_limit.clone()));
        }
        let tickers = normalized.require_any()?.to_vec();

        info!(
            "Starting valuation of {} tickers ({} years, {:.2}% target return, {} workers)",
            tickers.len(),
            params.years,
            params.target_return_pct,
            self.executor.pool_size(tickers.len())
        );

        let engine = ValuationEngine::new(EngineParams {
            years: params.years,
            target_rate: params.target_rate(),
            growth_years: params.growth_years,
            as_of: params.as_of,
        });
        let pipeline = Arc::new(AnalysisPipeline::new(
            Arc::clone(&self.gateway),
            engine,
            self.config.call_timeout,
        ));

        let analyses = self
            .executor
            .run(
                tickers,
                move |ticker| {
                    let pipeline = Arc::clone(&pipeline);
                    async move { pipeline.run(&ticker).await }
                },
                |ticker| SecurityAnalysis::degraded(ticker.clone()),
            )
            .await;

        let report = aggregate(analyses, &params.filters, warnings);
        info!(
            "Valuation complete: {}/{} tickers passed filters, {} opportunities",
            report.total_passed_filters,
            report.total_analyzed,
            report.alerts.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticGateway;

    fn params() -> BatchParams {
        BatchParams {
            years: 5,
            target_return_pct: 6.0,
            growth_years: 5,
            as_of: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            filters: ScreenFilters::default(),
        }
    }

    fn gateway() -> StaticGateway {
        StaticGateway::new()
            .with_fundamentals("TAEE11.SA", 15.0, 2.0, 10.0)
            .with_annual_dividends("TAEE11.SA", 2018..=2026, 1.2)
            .with_flat_prices("TAEE11.SA", 2021..=2026, 15.0)
            .with_fundamentals("BBSE3.SA", 40.0, 4.0, 8.0)
            .with_annual_dividends("BBSE3.SA", 2018..=2026, 3.0)
            .with_flat_prices("BBSE3.SA", 2021..=2026, 40.0)
            .failing("BROKEN.SA")
    }

    fn orchestrator(gw: StaticGateway) -> ValuationOrchestrator {
        ValuationOrchestrator::new(Arc::new(gw), OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_failing_ticker_does_not_abort_batch() {
        let report = orchestrator(gateway())
            .run_batch("TAEE11.SA, BROKEN.SA, BBSE3.SA", &params())
            .await
            .unwrap();

        assert_eq!(report.valuations.len(), 3);
        let broken = report
            .valuations
            .iter()
            .find(|v| v.ticker.as_str() == "BROKEN.SA")
            .unwrap();
        assert_eq!(broken.current_price, 0.0);
        assert_eq!(broken.margin_of_safety, -100.0);

        let taee = report
            .valuations
            .iter()
            .find(|v| v.ticker.as_str() == "TAEE11.SA")
            .unwrap();
        assert!((taee.ceiling_price - 20.0).abs() < 1e-6);

        // BBSE3: ceiling 50 vs price 40 = 25%, TAEE11: 33.33%
        let order: Vec<&str> = report.valuations.iter().map(|v| v.ticker.as_str()).collect();
        assert_eq!(order, vec!["TAEE11.SA", "BBSE3.SA", "BROKEN.SA"]);
        assert!(report.warnings.contains(&BatchWarning::NoData(vec![analysis_core::Ticker::new("BROKEN.SA")])));
        assert_eq!(report.alerts.len(), 2);
    }

    #[tokio::test]
    async fn test_panicking_gateway_is_isolated() {
        let gw = gateway().panicking("PANIC.SA");
        let report = orchestrator(gw).run_batch("PANIC.SA,TAEE11.SA", &params()).await.unwrap();
        assert_eq!(report.valuations.len(), 2);
        let last = report.valuations.last().unwrap();
        assert_eq!(last.ticker.as_str(), "PANIC.SA");
        assert_eq!(last.margin_of_safety, -100.0);
    }

    #[tokio::test]
    async fn test_no_valid_tickers() {
        let err = orchestrator(gateway()).run_batch(" , $$$", &params()).await.unwrap_err();
        assert_eq!(err, AnalysisError::NoValidTickers);
    }

    #[tokio::test]
    async fn test_invalid_params_stop_before_fetch() {
        let gw = gateway();
        let calls = gw.call_counter();
        let orch = orchestrator(gw);

        let mut p = params();
        p.years = 21;
        assert!(matches!(orch.run_batch("TAEE11.SA", &p).await, Err(AnalysisError::InvalidConfig(_))));

        let mut p = params();
        p.target_return_pct = 0.05;
        assert!(matches!(orch.run_batch("TAEE11.SA", &p).await, Err(AnalysisError::InvalidConfig(_))));

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_normalizer_warnings_reported() {
        let orch = ValuationOrchestrator::new(
            Arc::new(gateway()),
            OrchestratorConfig {
                normalizer: NormalizerConfig { max_tickers: 1 },
                ..Default::default()
            },
        );
        let report = orch.run_batch("taee11.sa, bad!, BBSE3.SA", &params()).await.unwrap();
        assert_eq!(report.valuations.len(), 1);
        assert!(report.warnings.contains(&BatchWarning::InvalidTickers(vec!["BAD!".to_string()])));
        assert!(report.warnings.contains(&BatchWarning::OverLimit(vec!["BBSE3.SA".to_string()])));
    }

    #[tokio::test]
    async fn test_throttled_batch_completes() {
        let gw = gateway().with_throttle(Duration::from_millis(120));
        let orch = ValuationOrchestrator::new(
            Arc::new(gw),
            OrchestratorConfig {
                call_timeout: Duration::from_millis(30),
                ..Default::default()
            },
        );
        let report = orch.run_batch("TAEE11.SA,BBSE3.SA", &params()).await.unwrap();
        assert!(report.valuations.iter().all(|v| v.current_price > 0.0));
        assert!(!report.warnings.iter().any(|w| matches!(w, BatchWarning::NoData(_))));
    }

    #[tokio::test]
    async fn test_cache_shared_across_batches() {
        let gw = gateway();
        let calls = gw.call_counter();
        let cached = CachedGateway::new(gw, Arc::new(TtlCache::new(3600)));
        let orch = ValuationOrchestrator::new(Arc::new(cached), OrchestratorConfig::default());

        orch.run_batch("TAEE11.SA", &params()).await.unwrap();
        let after_first = calls.load(std::sync::atomic::Ordering::SeqCst);
        orch.run_batch("TAEE11.SA", &params()).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), after_first);
    }
}
