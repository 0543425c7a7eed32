use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    // Valuation parameters
    pub years: u32,               // 5
    pub target_return_pct: f64,   // 6.0 (%)
    pub growth_years: u32,        // 5

    // Batch limits
    pub max_tickers: usize,       // 20
    pub max_workers: usize,       // 5

    // Provider
    pub cache_ttl_secs: i64,      // 3600
    pub call_timeout_secs: u64,   // 20
    pub yahoo_rate_limit: usize,  // 60 req/min

    /// IANA name; decides which calendar year is still incomplete.
    pub timezone: String,

    // Filters (disabled at 0 / 0 / -100)
    pub max_pe: f64,
    /// Percent, like the target return (6 for 6%).
    pub min_dy: f64,
    pub min_margin: f64,

    // Input / output, set from the command line
    pub tickers: Option<String>,
    pub ticker_file: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            years: 5,
            target_return_pct: 6.0,
            growth_years: 5,
            max_tickers: 20,
            max_workers: 5,
            cache_ttl_secs: 3600,
            call_timeout_secs: 20,
            yahoo_rate_limit: 60,
            timezone: "America/Sao_Paulo".to_string(),
            max_pe: 0.0,
            min_dy: 0.0,
            min_margin: -100.0,
            tickers: None,
            ticker_file: None,
            export_dir: None,
            json: false,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("invalid value for {}", key))
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            years: env_or("VALUATION_YEARS", "5")?,
            target_return_pct: env_or("VALUATION_TARGET_RETURN", "6.0")?,
            growth_years: env_or("VALUATION_GROWTH_YEARS", "5")?,
            max_tickers: env_or("VALUATION_MAX_TICKERS", "20")?,
            max_workers: env_or("VALUATION_MAX_WORKERS", "5")?,
            cache_ttl_secs: env_or("VALUATION_CACHE_TTL_SECS", "3600")?,
            call_timeout_secs: env_or("VALUATION_CALL_TIMEOUT_SECS", "20")?,
            yahoo_rate_limit: env_or("YAHOO_RATE_LIMIT", "60")?,
            timezone: env::var("VALUATION_TIMEZONE").unwrap_or_else(|_| "America/Sao_Paulo".to_string()),
            max_pe: env_or("VALUATION_MAX_PE", "0")?,
            min_dy: env_or("VALUATION_MIN_DY", "0")?,
            min_margin: env_or("VALUATION_MIN_MARGIN", "-100")?,
            tickers: env::var("VALUATION_TICKERS").ok(),
            ticker_file: None,
            export_dir: None,
            json: false,
        };
        Ok(config)
    }

    /// Command-line flags override the environment.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        fn value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
            match args.iter().position(|a| a == flag) {
                Some(i) => args
                    .get(i + 1)
                    .map(|v| Some(v.as_str()))
                    .ok_or_else(|| anyhow!("{} requires a value", flag)),
                None => Ok(None),
            }
        }
        fn parsed<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            value(args, flag)?
                .map(|v| v.parse::<T>().with_context(|| format!("invalid value for {}", flag)))
                .transpose()
        }

        if let Some(v) = value(args, "--tickers")? {
            self.tickers = Some(v.to_string());
        }
        if let Some(v) = value(args, "--file")? {
            self.ticker_file = Some(PathBuf::from(v));
        }
        if let Some(v) = value(args, "--export-dir")? {
            self.export_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = parsed(args, "--years")? {
            self.years = v;
        }
        if let Some(v) = parsed(args, "--rate")? {
            self.target_return_pct = v;
        }
        if let Some(v) = parsed(args, "--max-pe")? {
            self.max_pe = v;
        }
        if let Some(v) = parsed(args, "--min-dy")? {
            self.min_dy = v;
        }
        if let Some(v) = parsed(args, "--min-margin")? {
            self.min_margin = v;
        }
        if args.iter().any(|a| a == "--json") {
            self.json = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tickers == 0 {
            bail!("VALUATION_MAX_TICKERS must be at least 1");
        }
        if self.max_workers == 0 {
            bail!("VALUATION_MAX_WORKERS must be at least 1");
        }
        if self.call_timeout_secs == 0 {
            bail!("VALUATION_CALL_TIMEOUT_SECS must be at least 1");
        }
        self.market_tz()?;
        Ok(())
    }

    pub fn market_tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid VALUATION_TIMEZONE '{}': {}", self.timezone, e))
    }

    /// Today's date on the market calendar.
    pub fn market_today(&self) -> Result<NaiveDate> {
        Ok(Utc::now().with_timezone(&self.market_tz()?).date_naive())
    }
}
