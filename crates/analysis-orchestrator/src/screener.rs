use analysis_core::{
    AnnualDividendRecord, DividendStats, FundamentalSnapshot, SecurityAnalysis, Ticker, ValuationResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Threshold filters; each one is skipped at its disabled sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenFilters {
    /// Maximum P/E, disabled at 0.
    pub max_pe: f64,
    /// Minimum dividend yield in percent (6.0 for 6%), disabled at 0.
    /// Provider yields are fractions and are scaled before comparing.
    pub min_dividend_yield: f64,
    /// Minimum margin of safety in percent, disabled at -100.
    pub min_margin_of_safety: f64,
}

impl Default for ScreenFilters {
    fn default() -> Self {
        Self {
            max_pe: 0.0,
            min_dividend_yield: 0.0,
            min_margin_of_safety: -100.0,
        }
    }
}

impl ScreenFilters {
    pub fn is_active(&self) -> bool {
        self.max_pe > 0.0 || self.min_dividend_yield > 0.0 || self.min_margin_of_safety > -100.0
    }

    /// AND of every enabled filter; a missing field fails an enabled filter.
    pub fn passes(&self, analysis: &SecurityAnalysis) -> bool {
        if self.max_pe > 0.0 {
            match analysis.fundamentals.pe {
                Some(pe) if pe <= self.max_pe => {}
                _ => return false,
            }
        }
        if self.min_dividend_yield > 0.0 {
            match analysis.fundamentals.dividend_yield {
                Some(dy) if dy * 100.0 >= self.min_dividend_yield => {}
                _ => return false,
            }
        }
        if self.min_margin_of_safety > -100.0 && analysis.valuation.margin_of_safety < self.min_margin_of_safety {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "tickers", rename_all = "snake_case")]
pub enum BatchWarning {
    InvalidTickers(Vec<String>),
    OverLimit(Vec<String>),
    FinancialSector(Vec<Ticker>),
    NoData(Vec<Ticker>),
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for BatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchWarning::InvalidTickers(t) => write!(f, "Removed tickers with invalid format: {}", join(t)),
            BatchWarning::OverLimit(t) => write!(f, "Ticker limit reached, {} dropped: {}", t.len(), join(t)),
            BatchWarning::FinancialSector(t) => write!(
                f,
                "Financial institutions detected ({}): debt/EBITDA is not meaningful for them, focus on ROE and P/B",
                join(t)
            ),
            BatchWarning::NoData(t) => write!(
                f,
                "No data returned for {}, check that the symbols are correct (e.g. PETR4.SA)",
                join(t)
            ),
        }
    }
}

/// Fundamentals table row: snapshot plus derived payout and growth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalRow {
    #[serde(flatten)]
    pub snapshot: FundamentalSnapshot,
    pub payout_ratio: f64,
    pub revenue_cagr: Option<f64>,
    pub net_income_cagr: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Ranked by margin of safety, descending.
    pub valuations: Vec<ValuationResult>,
    pub fundamentals: Vec<FundamentalRow>,
    pub dividend_stats: Vec<DividendStats>,
    pub dividend_series: Vec<AnnualDividendRecord>,
    pub alerts: Vec<String>,
    pub warnings: Vec<BatchWarning>,
    pub total_analyzed: usize,
    pub total_passed_filters: usize,
    pub generated_at: DateTime<Utc>,
}

/// Merge completed analyses into ranked tables.
///
/// `analyses` must be in completion order; ties on margin keep that order.
pub fn aggregate(
    analyses: Vec<SecurityAnalysis>,
    filters: &ScreenFilters,
    mut warnings: Vec<BatchWarning>,
) -> BatchReport {
    let total_analyzed = analyses.len();

    let no_data: Vec<Ticker> = analyses
        .iter()
        .filter(|a| a.valuation.has_no_data())
        .map(|a| a.ticker().clone())
        .collect();
    let financial: Vec<Ticker> = analyses
        .iter()
        .filter(|a| a.fundamentals.is_financial())
        .map(|a| a.ticker().clone())
        .collect();

    let mut kept: Vec<SecurityAnalysis> = analyses.into_iter().filter(|a| filters.passes(a)).collect();
    kept.sort_by(|a, b| {
        b.valuation
            .margin_of_safety
            .partial_cmp(&a.valuation.margin_of_safety)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if !financial.is_empty() {
        warnings.push(BatchWarning::FinancialSector(financial));
    }
    if !no_data.is_empty() {
        tracing::warn!("No data returned for: {}", join(&no_data));
        warnings.push(BatchWarning::NoData(no_data));
    }

    let total_passed_filters = kept.len();
    let mut report = BatchReport {
        valuations: Vec::with_capacity(kept.len()),
        fundamentals: Vec::with_capacity(kept.len()),
        dividend_stats: Vec::with_capacity(kept.len()),
        dividend_series: Vec::new(),
        alerts: Vec::new(),
        warnings,
        total_analyzed,
        total_passed_filters,
        generated_at: Utc::now(),
    };

    for a in kept {
        report.fundamentals.push(FundamentalRow {
            payout_ratio: a.valuation.payout_ratio,
            revenue_cagr: a.growth.revenue_cagr,
            net_income_cagr: a.growth.net_income_cagr,
            snapshot: a.fundamentals,
        });
        report.dividend_stats.push(a.stats);
        report.dividend_series.extend(a.dividends.records);
        if let Some(alert) = a.alert {
            report.alerts.push(alert);
        }
        report.valuations.push(a.valuation);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(symbol: &str, margin: f64) -> SecurityAnalysis {
        let mut a = SecurityAnalysis::degraded(Ticker::new(symbol));
        a.valuation.current_price = 10.0;
        a.valuation.ceiling_price = 10.0 * (1.0 + margin / 100.0);
        a.valuation.margin_of_safety = margin;
        a
    }

    fn order(report: &BatchReport) -> Vec<&str> {
        report.valuations.iter().map(|v| v.ticker.as_str()).collect()
    }

    #[test]
    fn test_stable_sort_by_margin() {
        let analyses = vec![
            analysis("A", -10.0),
            analysis("B", 25.0),
            analysis("C", 0.0),
            analysis("D", 25.0),
        ];
        let report = aggregate(analyses, &ScreenFilters::default(), Vec::new());
        assert_eq!(order(&report), vec!["B", "D", "C", "A"]);
        assert_eq!(report.fundamentals[0].snapshot.ticker.as_str(), "B");
        assert_eq!(report.dividend_stats[1].ticker.as_str(), "D");
    }

    #[test]
    fn test_filters_are_and_combined() {
        let mut cheap = analysis("CHEAP", 30.0);
        cheap.fundamentals.pe = Some(6.0);
        cheap.fundamentals.dividend_yield = Some(0.08);
        let mut pricey = analysis("PRICEY", 30.0);
        pricey.fundamentals.pe = Some(25.0);
        pricey.fundamentals.dividend_yield = Some(0.08);
        let mut low_yield = analysis("LOWDY", 30.0);
        low_yield.fundamentals.pe = Some(6.0);
        low_yield.fundamentals.dividend_yield = Some(0.01);
        let mut no_pe = analysis("NOPE", 30.0);
        no_pe.fundamentals.dividend_yield = Some(0.08);

        let filters = ScreenFilters {
            max_pe: 10.0,
            min_dividend_yield: 5.0,
            min_margin_of_safety: -100.0,
        };
        let report = aggregate(vec![cheap, pricey, low_yield, no_pe], &filters, Vec::new());
        assert_eq!(order(&report), vec!["CHEAP"]);
        assert_eq!(report.total_analyzed, 4);
        assert_eq!(report.total_passed_filters, 1);
    }

    #[test]
    fn test_dividend_yield_filter_in_percent() {
        let mut high = analysis("HIGH", 10.0);
        high.fundamentals.dividend_yield = Some(0.065);
        let mut low = analysis("LOW", 10.0);
        low.fundamentals.dividend_yield = Some(0.04);
        let filters = ScreenFilters {
            min_dividend_yield: 6.0,
            ..Default::default()
        };
        let report = aggregate(vec![high, low], &filters, Vec::new());
        assert_eq!(order(&report), vec!["HIGH"]);
    }

    #[test]
    fn test_margin_filter() {
        let filters = ScreenFilters {
            min_margin_of_safety: 10.0,
            ..Default::default()
        };
        let report = aggregate(vec![analysis("A", 5.0), analysis("B", 15.0)], &filters, Vec::new());
        assert_eq!(order(&report), vec!["B"]);
    }

    #[test]
    fn test_disabled_filters_keep_everything() {
        let filters = ScreenFilters::default();
        assert!(!filters.is_active());
        let report = aggregate(
            vec![SecurityAnalysis::degraded(Ticker::new("X")), analysis("Y", -50.0)],
            &filters,
            Vec::new(),
        );
        assert_eq!(report.valuations.len(), 2);
    }

    #[test]
    fn test_zero_data_and_financial_warnings() {
        let mut bank = analysis("ITUB4.SA", 5.0);
        bank.fundamentals.sector = Some("Financial Services".to_string());
        let empty = SecurityAnalysis::degraded(Ticker::new("XXXX3.SA"));
        let unfavorable = analysis("WEGE3.SA", -40.0);

        let report = aggregate(vec![bank, empty, unfavorable], &ScreenFilters::default(), Vec::new());
        assert!(report
            .warnings
            .contains(&BatchWarning::FinancialSector(vec![Ticker::new("ITUB4.SA")])));
        assert!(report.warnings.contains(&BatchWarning::NoData(vec![Ticker::new("XXXX3.SA")])));
    }

    #[test]
    fn test_alerts_collected() {
        let mut a = analysis("A", 20.0);
        a.alert = Some("Opportunity in A".to_string());
        let report = aggregate(vec![a, analysis("B", -5.0)], &ScreenFilters::default(), Vec::new());
        assert_eq!(report.alerts, vec!["Opportunity in A".to_string()]);
    }

    #[test]
    fn test_report_serializes_without_internal_fields() {
        let mut a = analysis("A", 20.0);
        a.fundamentals.eps = Some(3.0);
        let report = aggregate(vec![a], &ScreenFilters::default(), Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["fundamentals"][0].get("eps").is_none());
        assert_eq!(json["fundamentals"][0]["ticker"], "A");
        assert_eq!(json["valuations"][0]["payment_months"], "Error");
    }
}
