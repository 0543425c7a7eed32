use analysis_core::{FinancialStatements, FundamentalSnapshot, LineItem, ProviderFundamentals, Ticker};
use tracing::info;

/// Debt ÷ equity from the latest balance sheet; zero or absent equity is undeterminable.
pub fn debt_to_equity_from_statements(statements: &FinancialStatements) -> Option<f64> {
    let debt = statements.balance_sheet.latest(LineItem::TotalDebt)?;
    let equity = statements.balance_sheet.latest(LineItem::StockholdersEquity)?;
    if equity == 0.0 {
        return None;
    }
    Some(debt / equity)
}

/// Debt ÷ (EBIT + |D&A|), pulling each figure from its own statement.
pub fn debt_to_ebitda_from_statements(statements: &FinancialStatements) -> Option<f64> {
    if statements.balance_sheet.is_empty() || statements.income.is_empty() || statements.cashflow.is_empty() {
        return None;
    }
    let debt = statements.balance_sheet.latest(LineItem::TotalDebt)?;
    let ebit = statements.income.latest(LineItem::Ebit)?;
    let da = statements.cashflow.latest(LineItem::DepreciationAmortization)?;
    let ebitda = ebit + da.abs();
    if ebitda == 0.0 {
        return None;
    }
    Some(debt / ebitda)
}

/// Provider debt/equity is percentage-scaled; statements are consulted only when it is absent.
pub fn resolve_debt_to_equity(
    ticker: &Ticker,
    primary: Option<f64>,
    statements: Option<&FinancialStatements>,
) -> Option<f64> {
    if let Some(raw) = primary {
        return Some(raw / 100.0);
    }
    let derived = statements.and_then(debt_to_equity_from_statements);
    if let Some(value) = derived {
        info!("{}: debt/equity derived from balance sheet = {:.4}", ticker, value);
    }
    derived
}

pub fn resolve_debt_to_ebitda(
    ticker: &Ticker,
    primary: Option<f64>,
    statements: Option<&FinancialStatements>,
) -> Option<f64> {
    if primary.is_some() {
        return primary;
    }
    let derived = statements.and_then(debt_to_ebitda_from_statements);
    if let Some(value) = derived {
        info!("{}: debt/EBITDA derived from statements = {:.4}", ticker, value);
    }
    derived
}

/// Map raw provider fields onto the snapshot, running both fallback chains.
pub fn build_snapshot(
    ticker: &Ticker,
    provider: &ProviderFundamentals,
    statements: Option<&FinancialStatements>,
) -> FundamentalSnapshot {
    FundamentalSnapshot {
        ticker: ticker.clone(),
        pe: provider.trailing_pe,
        pb: provider.price_to_book,
        roe: provider.return_on_equity,
        dividend_yield: provider.dividend_yield,
        sector: provider.sector.clone(),
        debt_to_equity: resolve_debt_to_equity(ticker, provider.debt_to_equity, statements),
        debt_to_ebitda: resolve_debt_to_ebitda(ticker, provider.debt_to_ebitda, statements),
        ev_to_ebitda: provider.enterprise_to_ebitda,
        eps: provider.trailing_eps,
        bvps: provider.book_value,
        dividend_rate: provider.dividend_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::StatementTable;
    use chrono::NaiveDate;

    fn d(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 12, 31).unwrap()
    }

    fn statements() -> FinancialStatements {
        FinancialStatements {
            income: StatementTable::new().with_row("Operating Income", vec![(d(2022), Some(70.0)), (d(2023), Some(80.0))]),
            balance_sheet: StatementTable::new()
                .with_row("Total Debt", vec![(d(2023), Some(200.0))])
                .with_row("Stockholders Equity", vec![(d(2023), Some(400.0))]),
            cashflow: StatementTable::new().with_row("Depreciation And Amortization", vec![(d(2023), Some(-20.0))]),
        }
    }

    #[test]
    fn test_primary_debt_to_equity_is_rescaled() {
        let t = Ticker::new("X");
        let v = resolve_debt_to_equity(&t, Some(150.0), Some(&statements())).unwrap();
        assert!((v - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_debt_to_equity_fallback() {
        let t = Ticker::new("X");
        let v = resolve_debt_to_equity(&t, None, Some(&statements())).unwrap();
        assert!((v - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_equity_is_undeterminable() {
        let mut s = statements();
        s.balance_sheet.insert("Stockholders Equity", vec![(d(2023), Some(0.0))]);
        assert_eq!(debt_to_equity_from_statements(&s), None);
    }

    #[test]
    fn test_debt_to_ebitda_fallback_uses_absolute_da() {
        let v = debt_to_ebitda_from_statements(&statements()).unwrap();
        assert!((v - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_debt_to_ebitda_primary_wins() {
        let t = Ticker::new("X");
        let v = resolve_debt_to_ebitda(&t, Some(3.7), Some(&statements()));
        assert_eq!(v, Some(3.7));
    }

    #[test]
    fn test_debt_to_ebitda_requires_all_statements() {
        let mut s = statements();
        s.cashflow = StatementTable::new();
        assert_eq!(debt_to_ebitda_from_statements(&s), None);
        assert_eq!(resolve_debt_to_ebitda(&Ticker::new("X"), None, None), None);
    }

    #[test]
    fn test_zero_ebitda_is_undeterminable() {
        let mut s = statements();
        s.income.insert("EBIT", vec![(d(2023), Some(-20.0))]);
        assert_eq!(debt_to_ebitda_from_statements(&s), None);
    }

    #[test]
    fn test_build_snapshot_maps_fields() {
        let provider = ProviderFundamentals {
            trailing_pe: Some(8.0),
            dividend_yield: Some(0.07),
            sector: Some("Utilities".to_string()),
            trailing_eps: Some(2.0),
            book_value: Some(10.0),
            ..Default::default()
        };
        let snap = build_snapshot(&Ticker::new("X"), &provider, Some(&statements()));
        assert_eq!(snap.pe, Some(8.0));
        assert_eq!(snap.eps, Some(2.0));
        assert!((snap.debt_to_equity.unwrap() - 0.5).abs() < 1e-9);
        assert!((snap.debt_to_ebitda.unwrap() - 2.0).abs() < 1e-9);
    }
}
