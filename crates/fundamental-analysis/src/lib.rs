pub mod dividends;
pub mod fallbacks;
pub mod growth;
pub mod seasonality;
pub mod valuation;

use analysis_core::stats::round2;
use analysis_core::{
    DividendObservation, DividendStats, FinancialStatements, FundamentalSnapshot, PriceBar,
    ProviderFundamentals, SecurityAnalysis, SeasonalityWindow, Ticker, ValuationResult,
};
use chrono::NaiveDate;

pub use valuation::{bazin_ceiling, graham_fair_price, margin_of_safety, payout_ratio};

#[derive(Debug, Clone)]
pub struct EngineParams {
    pub years: u32,
    /// Target annual return as a decimal (0.06 for 6%).
    pub target_rate: f64,
    pub growth_years: u32,
    /// Today in the market's timezone; its year is the incomplete one.
    pub as_of: NaiveDate,
}

/// Fetched inputs for one security. `None` means that fetch failed.
#[derive(Debug, Clone, Default)]
pub struct SecurityInputs {
    pub dividends: Option<Vec<DividendObservation>>,
    pub price_history: Option<Vec<PriceBar>>,
    pub fundamentals: Option<ProviderFundamentals>,
    pub statements: Option<FinancialStatements>,
}

pub struct ValuationEngine {
    params: EngineParams,
}

impl ValuationEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Derive every metric for one security. Missing inputs degrade their
    /// own outputs only.
    pub fn evaluate(&self, ticker: &Ticker, inputs: &SecurityInputs) -> SecurityAnalysis {
        let p = &self.params;
        let observations = inputs.dividends.as_deref().unwrap_or_default();

        let series = dividends::annual_dividends(ticker, observations, p.years, p.as_of);
        let statements = inputs.statements.as_ref();
        let fundamentals = match &inputs.fundamentals {
            Some(provider) => fallbacks::build_snapshot(ticker, provider, statements),
            None => FundamentalSnapshot::empty(ticker.clone()),
        };
        let growth = growth::growth_metrics(statements, p.growth_years);

        let since = dividends::window_start(p.as_of, p.years);
        let (payment_months, best_purchase_months) = match &inputs.price_history {
            None => (SeasonalityWindow::Failed, SeasonalityWindow::Failed),
            Some(bars) if bars.is_empty() => (SeasonalityWindow::Unavailable, SeasonalityWindow::Unavailable),
            Some(bars) => match &inputs.dividends {
                Some(divs) => (
                    seasonality::payment_months(divs, since, p.years),
                    seasonality::cheapest_months(bars),
                ),
                None => (SeasonalityWindow::Failed, seasonality::cheapest_months(bars)),
            },
        };

        let price = inputs
            .fundamentals
            .as_ref()
            .map(valuation::current_price)
            .unwrap_or(0.0);
        let ceiling = bazin_ceiling(series.mean, p.target_rate);
        let fair = graham_fair_price(fundamentals.eps, fundamentals.bvps);
        let margin = margin_of_safety(ceiling, price);
        let dpa_cagr = dividends::dpa_cagr(&series);
        let consecutive = dividends::consecutive_years(&series);
        let payout = payout_ratio(&fundamentals);

        let median_ceiling = bazin_ceiling(series.median, p.target_rate);
        let stats = DividendStats {
            ticker: ticker.clone(),
            current_price: price,
            dpa_mean: series.mean,
            dpa_median: series.median,
            dpa_cagr,
            consecutive_years: consecutive,
            median_ceiling_price: median_ceiling,
            median_margin_of_safety: round2(margin_of_safety(median_ceiling, price)),
        };

        let valuation = ValuationResult {
            ticker: ticker.clone(),
            current_price: price,
            ceiling_price: ceiling,
            fair_price: fair,
            margin_of_safety: margin,
            best_purchase_months,
            payment_months,
            dpa_mean: series.mean,
            dpa_median: series.median,
            dpa_cagr,
            payout_ratio: payout,
            consecutive_years: consecutive,
        };

        let alert = valuation::opportunity_alert(ticker, price, ceiling, margin);

        SecurityAnalysis {
            valuation,
            fundamentals,
            growth,
            dividends: series,
            stats,
            alert,
        }
    }
}
