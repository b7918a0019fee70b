use broker_feed_core::candle::Candle;
use broker_feed_core::tick::Tick;
use reqwest::Client;

use crate::bridge::check_status;
use crate::error::ProviderError;

/// Client for applications polling the feed service for new data.
pub struct FeedClient {
    client: Client,
    base_url: String,
}

impl FeedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Closed candles strictly after `since`, oldest first.
    pub async fn fetch_ohlc(
        &self,
        since: i64,
        batch_size: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/get_ohlc", self.base_url))
            .query(&[
                ("since", since.to_string()),
                ("batch_size", batch_size.to_string()),
            ])
            .send()
            .await?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse candles: {e}")))
    }

    /// Ticks around and after `since`, ascending by `time_msc`.
    pub async fn fetch_ticks(&self, since: i64) -> Result<Vec<Tick>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/get_ticks", self.base_url))
            .query(&[("since", since.to_string())])
            .send()
            .await?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse ticks: {e}")))
    }
}
