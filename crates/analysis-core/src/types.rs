use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized security identifier (uppercase, `[A-Z0-9.-]+`).
///
/// Only [`crate::tickers`] constructs validated values; `Ticker::new` is the
/// unchecked constructor used by gateways and tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Daily OHLC bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Raw cash distribution as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendObservation {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Dividends per share summed over one completed calendar year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualDividendRecord {
    pub ticker: Ticker,
    pub year: i32,
    pub dpa: f64,
}

/// Trimmed annual series plus the statistics computed over it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DividendSeries {
    /// Ascending by year.
    pub records: Vec<AnnualDividendRecord>,
    pub mean: f64,
    pub median: f64,
}

impl DividendSeries {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.dpa).collect()
    }
}

/// Key statistics as the provider exposes them, before any normalization.
///
/// `debt_to_equity` is percentage-scaled (150.0 means 1.5x).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderFundamentals {
    pub regular_market_price: Option<f64>,
    pub current_price: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub sector: Option<String>,
    pub debt_to_equity: Option<f64>,
    pub debt_to_ebitda: Option<f64>,
    pub enterprise_to_ebitda: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub book_value: Option<f64>,
    pub dividend_rate: Option<f64>,
}

/// Normalized per-security fundamentals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub ticker: Ticker,
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub roe: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub sector: Option<String>,
    pub debt_to_equity: Option<f64>,
    pub debt_to_ebitda: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    /// Only used for Graham and payout computations.
    #[serde(skip)]
    pub eps: Option<f64>,
    #[serde(skip)]
    pub bvps: Option<f64>,
    #[serde(skip)]
    pub dividend_rate: Option<f64>,
}

impl FundamentalSnapshot {
    pub fn empty(ticker: Ticker) -> Self {
        Self {
            ticker,
            pe: None,
            pb: None,
            roe: None,
            dividend_yield: None,
            sector: None,
            debt_to_equity: None,
            debt_to_ebitda: None,
            ev_to_ebitda: None,
            eps: None,
            bvps: None,
            dividend_rate: None,
        }
    }

    pub fn is_financial(&self) -> bool {
        self.sector
            .as_deref()
            .map(|s| s.to_lowercase().contains("financial"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub revenue_cagr: Option<f64>,
    pub net_income_cagr: Option<f64>,
}

/// Month rendering used by both seasonality columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonalityWindow {
    /// Month numbers 1-12, ascending.
    Months(Vec<u32>),
    NoDividends,
    /// Empty price history.
    Unavailable,
    /// The underlying fetch failed.
    Failed,
}

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl fmt::Display for SeasonalityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonalityWindow::Months(months) => {
                let names: Vec<&str> = months
                    .iter()
                    .filter_map(|m| MONTH_ABBREVIATIONS.get((*m as usize).wrapping_sub(1)))
                    .copied()
                    .collect();
                f.write_str(&names.join(", "))
            }
            SeasonalityWindow::NoDividends => f.write_str("no dividends"),
            SeasonalityWindow::Unavailable => f.write_str("N/A"),
            SeasonalityWindow::Failed => f.write_str("Error"),
        }
    }
}

impl Serialize for SeasonalityWindow {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityTier {
    Strong,
    Moderate,
    Mild,
}

impl OpportunityTier {
    /// `None` unless the margin is strictly positive.
    pub fn from_margin(margin_of_safety: f64) -> Option<Self> {
        if margin_of_safety >= 20.0 {
            Some(OpportunityTier::Strong)
        } else if margin_of_safety >= 10.0 {
            Some(OpportunityTier::Moderate)
        } else if margin_of_safety > 0.0 {
            Some(OpportunityTier::Mild)
        } else {
            None
        }
    }
}

/// Per-security valuation, produced once per batch and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    pub ticker: Ticker,
    pub current_price: f64,
    pub ceiling_price: f64,
    pub fair_price: f64,
    pub margin_of_safety: f64,
    pub best_purchase_months: SeasonalityWindow,
    pub payment_months: SeasonalityWindow,
    pub dpa_mean: f64,
    pub dpa_median: f64,
    pub dpa_cagr: f64,
    pub payout_ratio: f64,
    pub consecutive_years: u32,
}

impl ValuationResult {
    /// Zeros and sentinels with the identifier preserved.
    pub fn degraded(ticker: Ticker) -> Self {
        Self {
            ticker,
            current_price: 0.0,
            ceiling_price: 0.0,
            fair_price: 0.0,
            margin_of_safety: -100.0,
            best_purchase_months: SeasonalityWindow::Failed,
            payment_months: SeasonalityWindow::Failed,
            dpa_mean: 0.0,
            dpa_median: 0.0,
            dpa_cagr: 0.0,
            payout_ratio: 0.0,
            consecutive_years: 0,
        }
    }

    pub fn is_opportunity(&self) -> bool {
        self.margin_of_safety > 0.0
    }

    pub fn tier(&self) -> Option<OpportunityTier> {
        OpportunityTier::from_margin(self.margin_of_safety)
    }

    /// Price and ceiling both exactly zero means nothing came back from the provider.
    pub fn has_no_data(&self) -> bool {
        self.current_price == 0.0 && self.ceiling_price == 0.0
    }
}

/// Dividend statistics row with the median-based ceiling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendStats {
    pub ticker: Ticker,
    pub current_price: f64,
    pub dpa_mean: f64,
    pub dpa_median: f64,
    pub dpa_cagr: f64,
    pub consecutive_years: u32,
    pub median_ceiling_price: f64,
    pub median_margin_of_safety: f64,
}

/// Everything the pipeline produces for one security.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityAnalysis {
    pub valuation: ValuationResult,
    pub fundamentals: FundamentalSnapshot,
    pub growth: GrowthMetrics,
    pub dividends: DividendSeries,
    pub stats: DividendStats,
    pub alert: Option<String>,
}

impl SecurityAnalysis {
    pub fn degraded(ticker: Ticker) -> Self {
        Self {
            valuation: ValuationResult::degraded(ticker.clone()),
            fundamentals: FundamentalSnapshot::empty(ticker.clone()),
            growth: GrowthMetrics::default(),
            dividends: DividendSeries::default(),
            stats: DividendStats {
                ticker,
                current_price: 0.0,
                dpa_mean: 0.0,
                dpa_median: 0.0,
                dpa_cagr: 0.0,
                consecutive_years: 0,
                median_ceiling_price: 0.0,
                median_margin_of_safety: -100.0,
            },
            alert: None,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.valuation.ticker
    }
}
