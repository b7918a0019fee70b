use broker_feed_core::error::FeedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Terminal not connected: {0}")]
    NotInitialized(String),
}

impl From<ProviderError> for FeedError {
    fn from(err: ProviderError) -> Self {
        FeedError::DataSourceUnavailable(err.to_string())
    }
}
