use analysis_core::stats::cagr;
use analysis_core::{FinancialStatements, GrowthMetrics, LineItem, StatementTable};

pub const DEFAULT_GROWTH_YEARS: u32 = 5;

/// CAGR over the trailing `years + 1` non-missing points of one line item.
pub fn line_item_cagr(table: &StatementTable, item: LineItem, years: u32) -> Option<f64> {
    let values = table.series(item);
    let keep = (years as usize + 1).min(values.len());
    let window = &values[values.len() - keep..];
    if window.len() < 2 {
        return None;
    }
    cagr(window[0], window[window.len() - 1], (window.len() - 1) as f64)
}

pub fn growth_metrics(statements: Option<&FinancialStatements>, years: u32) -> GrowthMetrics {
    match statements {
        Some(s) if !s.income.is_empty() => GrowthMetrics {
            revenue_cagr: line_item_cagr(&s.income, LineItem::TotalRevenue, years),
            net_income_cagr: line_item_cagr(&s.income, LineItem::NetIncome, years),
        },
        _ => GrowthMetrics::default(),
    }
}
