use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The market data provider could not be reached, returned an error
    /// mid-fetch, or did not answer in time.
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl FeedError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        FeedError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
