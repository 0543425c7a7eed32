use analysis_core::stats::mean;
use analysis_core::{DividendObservation, PriceBar, SeasonalityWindow};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// Share of the requested years a month must pay in to count as recurring.
pub const RECURRENCE_THRESHOLD: f64 = 0.3;

/// Months in which dividends were paid in at least 30% of the requested years.
pub fn payment_months(dividends: &[DividendObservation], since: NaiveDate, years: u32) -> SeasonalityWindow {
    let mut years_by_month: BTreeMap<u32, BTreeSet<i32>> = BTreeMap::new();
    for d in dividends.iter().filter(|d| d.date >= since) {
        years_by_month.entry(d.date.month()).or_default().insert(d.date.year());
    }

    let threshold = f64::from(years) * RECURRENCE_THRESHOLD;
    let months: Vec<u32> = years_by_month
        .into_iter()
        .filter(|(_, paid)| paid.len() as f64 >= threshold)
        .map(|(month, _)| month)
        .collect();

    if months.is_empty() {
        SeasonalityWindow::NoDividends
    } else {
        SeasonalityWindow::Months(months)
    }
}

/// The three months with the lowest average close across observed years.
///
/// Each month's close is averaged per year first so years with more bars
/// don't dominate.
pub fn cheapest_months(bars: &[PriceBar]) -> SeasonalityWindow {
    if bars.is_empty() {
        return SeasonalityWindow::Unavailable;
    }

    let mut closes: BTreeMap<(u32, i32), Vec<f64>> = BTreeMap::new();
    for bar in bars {
        closes.entry((bar.date.month(), bar.date.year())).or_default().push(bar.close);
    }

    let mut yearly_by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for ((month, _), values) in &closes {
        yearly_by_month.entry(*month).or_default().push(mean(values));
    }

    let mut averages: Vec<(u32, f64)> = yearly_by_month
        .into_iter()
        .map(|(month, values)| (month, mean(&values)))
        .collect();
    averages.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut months: Vec<u32> = averages.into_iter().take(3).map(|(m, _)| m).collect();
    months.sort_unstable();
    SeasonalityWindow::Months(months)
}
