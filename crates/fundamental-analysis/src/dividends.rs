use analysis_core::stats::{cagr, mean, median, round2};
use analysis_core::{AnnualDividendRecord, DividendObservation, DividendSeries, Ticker};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// January 1st, `years` calendar years before the year of `as_of`, so the
/// window holds exactly `years` completed years plus the current one.
pub fn window_start(as_of: NaiveDate, years: u32) -> NaiveDate {
    let start_year = as_of.year() - years as i32;
    NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap_or(as_of)
}

/// Sum dividends by calendar year inside the trailing window, drop the
/// current year and keep exactly the `years` most recent completed years.
///
/// Every completed year from the first known payment (or the window start,
/// whichever is later) appears, with 0 for years without a payment. A company
/// that stopped paying therefore reports trailing zeros.
/// Returned records are ascending by year.
pub fn annual_dividends(
    ticker: &Ticker,
    observations: &[DividendObservation],
    years: u32,
    as_of: NaiveDate,
) -> DividendSeries {
    if observations.is_empty() || years == 0 {
        return DividendSeries::default();
    }

    let start = window_start(as_of, years);
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for obs in observations.iter().filter(|o| o.date >= start && o.date <= as_of) {
        *by_year.entry(obs.date.year()).or_insert(0.0) += obs.amount;
    }

    let current_year = as_of.year();
    let first_paid = match observations.iter().map(|o| o.date).filter(|d| *d <= as_of).min() {
        Some(date) => date.year(),
        None => return DividendSeries::default(),
    };
    for year in first_paid.max(start.year())..current_year {
        by_year.entry(year).or_insert(0.0);
    }

    let mut records: Vec<AnnualDividendRecord> = by_year
        .into_iter()
        .rev()
        .filter(|(year, _)| *year < current_year)
        .take(years as usize)
        .map(|(year, dpa)| AnnualDividendRecord {
            ticker: ticker.clone(),
            year,
            dpa,
        })
        .collect();

    let values: Vec<f64> = records.iter().map(|r| r.dpa).collect();
    let series_mean = mean(&values);
    let series_median = median(&values);
    records.reverse();

    DividendSeries {
        records,
        mean: series_mean,
        median: series_median,
    }
}

/// DPA growth in percent (2 decimals) between the first and last positive years.
pub fn dpa_cagr(series: &DividendSeries) -> f64 {
    let positive: Vec<&AnnualDividendRecord> = series.records.iter().filter(|r| r.dpa > 0.0).collect();
    let (first, last) = match (positive.first(), positive.last()) {
        (Some(f), Some(l)) if positive.len() >= 2 => (*f, *l),
        _ => return 0.0,
    };
    let periods = f64::from(last.year - first.year);
    cagr(first.dpa, last.dpa, periods)
        .map(|g| round2(g * 100.0))
        .unwrap_or(0.0)
}

/// Unbroken run of paying years counted back from the most recent year.
pub fn consecutive_years(series: &DividendSeries) -> u32 {
    series
        .records
        .iter()
        .rev()
        .take_while(|r| r.dpa > 0.0)
        .count() as u32
}
