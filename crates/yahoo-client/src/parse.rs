//! Response parsing for the chart, quoteSummary and fundamentals-timeseries endpoints.

use analysis_core::{
    AnalysisError, DividendObservation, FinancialStatements, PriceBar, ProviderFundamentals, StatementTable,
};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Income,
    BalanceSheet,
    Cashflow,
}

/// Timeseries type → (statement, line-item label).
pub const TIMESERIES_TYPES: &[(&str, Statement, &str)] = &[
    ("annualTotalRevenue", Statement::Income, "Total Revenue"),
    ("annualNetIncome", Statement::Income, "Net Income"),
    ("annualEBIT", Statement::Income, "EBIT"),
    ("annualOperatingIncome", Statement::Income, "Operating Income"),
    ("annualTotalDebt", Statement::BalanceSheet, "Total Debt"),
    ("annualLongTermDebt", Statement::BalanceSheet, "Long Term Debt"),
    ("annualCurrentDebt", Statement::BalanceSheet, "Short Long Term Debt"),
    ("annualStockholdersEquity", Statement::BalanceSheet, "Stockholders Equity"),
    ("annualCommonStockEquity", Statement::BalanceSheet, "Common Stock Equity"),
    ("annualDepreciationAndAmortization", Statement::Cashflow, "Depreciation And Amortization"),
    ("annualDepreciation", Statement::Cashflow, "Depreciation"),
    ("annualReconciledDepreciation", Statement::Cashflow, "Reconciled Depreciation"),
];

fn chart_result(json: &Value) -> Result<&Value, AnalysisError> {
    if let Some(desc) = json
        .get("chart")
        .and_then(|c| c.get("error"))
        .and_then(|e| e.get("description"))
        .and_then(|d| d.as_str())
    {
        return Err(AnalysisError::DataUnavailable(desc.to_string()));
    }
    json.get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalysisError::InvalidData("No chart data found".to_string()))
}

/// Exchange-local calendar date of a unix timestamp.
fn local_date(ts: i64, gmt_offset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmt_offset, 0).map(|dt| dt.date_naive())
}

fn gmt_offset(chart: &Value) -> i64 {
    chart
        .get("meta")
        .and_then(|m| m.get("gmtoffset"))
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

/// Daily bars; rows with any missing price are skipped.
pub fn parse_chart_bars(json: &Value) -> Result<Vec<PriceBar>, AnalysisError> {
    let chart = chart_result(json)?;
    let offset = gmt_offset(chart);

    let timestamps = match chart.get("timestamp").and_then(|v| v.as_array()) {
        Some(ts) => ts,
        None => return Ok(Vec::new()),
    };
    let quote = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalysisError::InvalidData("No quote data found".to_string()))?;

    let column = |name: &str| -> Vec<Option<f64>> {
        quote
            .get(name)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().map(|v| v.as_f64()).collect())
            .unwrap_or_default()
    };
    let (opens, highs, lows, closes) = (column("open"), column("high"), column("low"), column("close"));

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let cell = |col: &Vec<Option<f64>>| col.get(i).copied().flatten();
        if let (Some(date), Some(open), Some(high), Some(low), Some(close)) = (
            ts.as_i64().and_then(|t| local_date(t, offset)),
            cell(&opens),
            cell(&highs),
            cell(&lows),
            cell(&closes),
        ) {
            bars.push(PriceBar { date, open, high, low, close });
        }
    }
    Ok(bars)
}

/// Dividend events attached to a chart response, ascending by date.
pub fn parse_chart_dividends(json: &Value) -> Result<Vec<DividendObservation>, AnalysisError> {
    let chart = chart_result(json)?;
    let offset = gmt_offset(chart);

    let events = match chart
        .get("events")
        .and_then(|e| e.get("dividends"))
        .and_then(|d| d.as_object())
    {
        Some(events) => events,
        None => return Ok(Vec::new()),
    };

    let mut out: Vec<DividendObservation> = events
        .values()
        .filter_map(|ev| {
            let amount = ev.get("amount").and_then(|v| v.as_f64())?;
            let date = ev.get("date").and_then(|v| v.as_i64()).and_then(|t| local_date(t, offset))?;
            Some(DividendObservation { date, amount })
        })
        .collect();
    out.sort_by_key(|d| d.date);
    Ok(out)
}

/// quoteSummary numbers come either bare or as `{"raw": .., "fmt": ..}`.
fn raw_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.get("raw").and_then(|r| r.as_f64()))
}

/// Parse a quoteSummary response into provider fields.
pub fn parse_quote_summary(json: &Value) -> Result<ProviderFundamentals, AnalysisError> {
    let result = json
        .get("quoteSummary")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalysisError::DataUnavailable("No quoteSummary data found".to_string()))?;

    // first module carrying the field wins
    let field = |key: &str| -> Option<f64> {
        ["price", "financialData", "summaryDetail", "defaultKeyStatistics"]
            .iter()
            .filter_map(|m| result.get(*m))
            .find_map(|module| module.get(key).and_then(raw_f64))
    };

    Ok(ProviderFundamentals {
        regular_market_price: result
            .get("price")
            .and_then(|p| p.get("regularMarketPrice"))
            .and_then(raw_f64),
        current_price: result
            .get("financialData")
            .and_then(|p| p.get("currentPrice"))
            .and_then(raw_f64),
        trailing_pe: field("trailingPE"),
        price_to_book: field("priceToBook"),
        return_on_equity: field("returnOnEquity"),
        dividend_yield: field("dividendYield"),
        sector: result
            .get("assetProfile")
            .and_then(|p| p.get("sector"))
            .and_then(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        debt_to_equity: field("debtToEquity"),
        debt_to_ebitda: field("debtToEbitda"),
        enterprise_to_ebitda: field("enterpriseToEbitda"),
        trailing_eps: field("trailingEps"),
        book_value: field("bookValue"),
        dividend_rate: field("dividendRate"),
    })
}

/// Split a fundamentals-timeseries response into the three statement tables.
pub fn parse_timeseries(json: &Value) -> Result<FinancialStatements, AnalysisError> {
    let results = json
        .get("timeseries")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| AnalysisError::InvalidData("No timeseries data found".to_string()))?;

    let mut statements = FinancialStatements::default();
    for entry in results {
        let type_name = match entry
            .get("meta")
            .and_then(|m| m.get("type"))
            .and_then(|t| t.as_array())
            .and_then(|arr| arr.first())
            .and_then(|t| t.as_str())
        {
            Some(t) => t,
            None => continue,
        };
        let (statement, label) = match TIMESERIES_TYPES.iter().find(|(t, _, _)| *t == type_name) {
            Some((_, statement, label)) => (*statement, *label),
            None => continue,
        };
        let points = match entry.get(type_name).and_then(|v| v.as_array()) {
            Some(points) => points,
            None => continue,
        };

        let values: Vec<(NaiveDate, Option<f64>)> = points
            .iter()
            .filter(|p| !p.is_null())
            .filter_map(|p| {
                let date = p
                    .get("asOfDate")
                    .and_then(|d| d.as_str())
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())?;
                Some((date, p.get("reportedValue").and_then(raw_f64)))
            })
            .collect();
        if values.is_empty() {
            continue;
        }

        let table: &mut StatementTable = match statement {
            Statement::Income => &mut statements.income,
            Statement::BalanceSheet => &mut statements.balance_sheet,
            Statement::Cashflow => &mut statements.cashflow,
        };
        table.insert(label, values);
    }
    Ok(statements)
}
