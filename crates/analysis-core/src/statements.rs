use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logical line items looked up across provider statement tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineItem {
    TotalDebt,
    StockholdersEquity,
    Ebit,
    DepreciationAmortization,
    TotalRevenue,
    NetIncome,
}

impl LineItem {
    /// Accepted provider labels, in lookup priority order.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            LineItem::TotalDebt => &["Total Debt", "Long Term Debt", "Short Long Term Debt"],
            LineItem::StockholdersEquity => &[
                "Stockholders Equity",
                "Total Stockholder Equity",
                "Common Stock Equity",
            ],
            LineItem::Ebit => &["EBIT", "Operating Income"],
            LineItem::DepreciationAmortization => &[
                "Depreciation And Amortization",
                "Depreciation",
                "Reconciled Depreciation",
            ],
            LineItem::TotalRevenue => &["Total Revenue"],
            LineItem::NetIncome => &["Net Income"],
        }
    }
}

/// One statement: line-item label to dated values (`None` = reported but empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    rows: HashMap<String, Vec<(NaiveDate, Option<f64>)>>,
}

impl StatementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, mut values: Vec<(NaiveDate, Option<f64>)>) {
        values.sort_by_key(|(date, _)| *date);
        self.rows.insert(label.into(), values);
    }

    pub fn with_row(mut self, label: &str, values: Vec<(NaiveDate, Option<f64>)>) -> Self {
        self.insert(label, values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First alias present in the table, with its values ascending by date.
    pub fn row(&self, item: LineItem) -> Option<&[(NaiveDate, Option<f64>)]> {
        item.aliases()
            .iter()
            .find_map(|alias| self.rows.get(*alias))
            .map(|v| v.as_slice())
    }

    /// Value in the most recent reporting period for the resolved alias.
    pub fn latest(&self, item: LineItem) -> Option<f64> {
        self.row(item)?.last().and_then(|(_, v)| *v)
    }

    /// Non-missing values ascending by date.
    pub fn series(&self, item: LineItem) -> Vec<f64> {
        self.row(item)
            .map(|row| row.iter().filter_map(|(_, v)| *v).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub income: StatementTable,
    pub balance_sheet: StatementTable,
    pub cashflow: StatementTable,
}
