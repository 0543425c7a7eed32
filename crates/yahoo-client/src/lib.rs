pub mod parse;

use analysis_core::{
    AnalysisError, DividendObservation, FinancialStatements, MarketDataGateway, PriceBar, ProviderFundamentals,
    Ticker,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const TIMESERIES_URL: &str = "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const QUOTE_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Annual statements go back roughly this far on Yahoo.
const STATEMENT_LOOKBACK_YEARS: i64 = 10;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_SECS: u64 = 5;

/// Sleep before retry `attempt` (0-based) after a 429.
fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs(RETRY_BACKOFF_SECS * (u64::from(attempt) + 1))
}

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front() {
                Some(&oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Requests per minute.
    pub rate_limit: usize,
    pub request_timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            rate_limit: 60,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(config.rate_limit, Duration::from_secs(60)),
        }
    }

    /// Worst-case time a call spends outside HTTP: one limiter window and the
    /// 429 back-off per attempt.
    fn throttle_budget(&self) -> Duration {
        (0..MAX_ATTEMPTS)
            .map(|attempt| self.rate_limiter.window + retry_backoff(attempt))
            .sum()
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self.client.execute(req_clone).await.map_err(map_reqwest_error)?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let wait = retry_backoff(attempt);
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/{}",
                wait.as_secs(),
                attempt + 1,
                MAX_ATTEMPTS
            );
            tokio::time::sleep(wait).await;
        }

        Err(AnalysisError::RateLimited(format!(
            "Rate limited by Yahoo after {} retries",
            MAX_ATTEMPTS
        )))
    }

    async fn get_json(&self, builder: reqwest::RequestBuilder) -> Result<serde_json::Value, AnalysisError> {
        let response = self.send_request(builder).await?;
        let status = response.status();

        // chart and quoteSummary report unknown symbols as 404 with a JSON error body
        if status == StatusCode::NOT_FOUND {
            return Err(AnalysisError::DataUnavailable(format!(
                "HTTP 404: {}",
                response.text().await.unwrap_or_default()
            )));
        }
        if !status.is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        response.json().await.map_err(map_reqwest_error)
    }

    async fn chart(&self, ticker: &Ticker, range: &str, interval: &str) -> Result<serde_json::Value, AnalysisError> {
        let url = format!("{}/{}", CHART_URL, ticker);
        self.get_json(
            self.client
                .get(&url)
                .query(&[("range", range), ("interval", interval), ("events", "div")]),
        )
        .await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout(e.to_string())
    } else if e.is_decode() {
        AnalysisError::InvalidData(e.to_string())
    } else {
        AnalysisError::ApiError(e.to_string())
    }
}

#[async_trait]
impl MarketDataGateway for YahooClient {
    async fn price_history(&self, ticker: &Ticker, years: u32) -> Result<Vec<PriceBar>, AnalysisError> {
        let json = self.chart(ticker, &format!("{}y", years), "1d").await?;
        let bars = parse::parse_chart_bars(&json)?;
        tracing::debug!("Fetched {} daily bars for {}", bars.len(), ticker);
        Ok(bars)
    }

    async fn dividend_history(&self, ticker: &Ticker) -> Result<Vec<DividendObservation>, AnalysisError> {
        let json = self.chart(ticker, "max", "1mo").await?;
        let dividends = parse::parse_chart_dividends(&json)?;
        tracing::debug!("Fetched {} dividend events for {}", dividends.len(), ticker);
        Ok(dividends)
    }

    async fn fundamentals(&self, ticker: &Ticker) -> Result<ProviderFundamentals, AnalysisError> {
        let url = format!("{}/{}", QUOTE_SUMMARY_URL, ticker);
        let json = self.get_json(self.client.get(&url).query(&[("modules", QUOTE_MODULES)])).await?;
        parse::parse_quote_summary(&json)
    }

    async fn financial_statements(&self, ticker: &Ticker) -> Result<FinancialStatements, AnalysisError> {
        let url = format!("{}/{}", TIMESERIES_URL, ticker);
        let types: Vec<&str> = parse::TIMESERIES_TYPES.iter().map(|(t, _, _)| *t).collect();
        let now = Utc::now().timestamp();
        let period1 = now - STATEMENT_LOOKBACK_YEARS * 366 * 86_400;

        let json = self
            .get_json(self.client.get(&url).query(&[
                ("type", types.join(",")),
                ("period1", period1.to_string()),
                ("period2", now.to_string()),
            ]))
            .await?;
        parse::parse_timeseries(&json)
    }

    fn queue_allowance(&self) -> Duration {
        self.throttle_budget()
    }
}
