use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No valid tickers were supplied")]
    NoValidTickers,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("CSV error: {0}")]
    Csv(String),
}

impl AnalysisError {
    /// Network, throttling and timeout failures from the provider.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnalysisError::ApiError(_) | AnalysisError::RateLimited(_) | AnalysisError::Timeout(_)
        )
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(e: csv::Error) -> Self {
        AnalysisError::Csv(e.to_string())
    }
}
