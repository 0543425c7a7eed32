use crate::{AnalysisError, Ticker};
use std::collections::HashSet;
use std::io::Read;

pub const DEFAULT_MAX_TICKERS: usize = 20;

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub max_tickers: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_tickers: DEFAULT_MAX_TICKERS,
        }
    }
}

/// Normalizer output: accepted identifiers plus the two kinds of rejects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTickers {
    pub tickers: Vec<Ticker>,
    /// Tokens that failed the `^[A-Z0-9.-]+$` check.
    pub invalid: Vec<String>,
    /// Valid tokens dropped by the count cap.
    pub over_limit: Vec<String>,
}

impl NormalizedTickers {
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Fails with `NoValidTickers` when nothing survived.
    pub fn require_any(&self) -> Result<&[Ticker], AnalysisError> {
        if self.tickers.is_empty() {
            Err(AnalysisError::NoValidTickers)
        } else {
            Ok(&self.tickers)
        }
    }
}

pub fn is_valid_ticker(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

/// Parse comma-separated identifiers: trim, uppercase, validate, dedupe, cap.
pub fn normalize_tickers(raw: &str, config: &NormalizerConfig) -> NormalizedTickers {
    let mut out = NormalizedTickers::default();
    let mut seen = HashSet::new();

    for token in raw.split(',') {
        let token = token.trim().to_uppercase();
        if token.is_empty() {
            continue;
        }
        if !is_valid_ticker(&token) {
            if !out.invalid.contains(&token) {
                out.invalid.push(token);
            }
            continue;
        }
        if !seen.insert(token.clone()) {
            continue;
        }
        if out.tickers.len() < config.max_tickers {
            out.tickers.push(Ticker::new(token));
        } else {
            out.over_limit.push(token);
        }
    }

    if !out.invalid.is_empty() {
        tracing::warn!("Removed invalid tickers: {}", out.invalid.join(", "));
    }
    if !out.over_limit.is_empty() {
        tracing::warn!(
            "Limit of {} tickers per analysis, dropped {}: {}",
            config.max_tickers,
            out.over_limit.len(),
            out.over_limit.join(", ")
        );
    }

    out
}

/// Read the `Ticker` column of an uploaded CSV and join it into a comma list.
pub fn tickers_from_csv<R: Read>(reader: R) -> Result<String, AnalysisError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(AnalysisError::InvalidInput("the CSV file is empty".to_string()));
    }
    let col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("ticker"))
        .ok_or_else(|| {
            AnalysisError::InvalidInput("the CSV file must contain a 'Ticker' column".to_string())
        })?;

    let mut values = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(v) = record.get(col) {
            values.push(v.to_string());
        }
    }

    tracing::info!("Loaded {} tickers from CSV", values.len());
    Ok(values.join(","))
}
