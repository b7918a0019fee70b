use async_trait::async_trait;
use broker_feed_core::timeframe::Timeframe;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::provider::{MarketDataProvider, RawBar, RawTick};

pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8228";

/// Market data from a trading terminal through its local JSON bridge.
///
/// The bridge runs next to the terminal and exposes `/health`, `/rates`
/// and `/ticks`. Timestamps are passed through on the broker clock.
pub struct BridgeProvider {
    client: Client,
    base_url: String,
}

impl BridgeProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    connected: bool,
    #[serde(default)]
    terminal: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Option<Vec<RawBar>>,
}

#[derive(Debug, Deserialize)]
struct TicksResponse {
    #[serde(default)]
    ticks: Vec<RawTick>,
}

/// Turn a non-2xx bridge response into an API error.
pub(crate) async fn check_status(response: Response) -> Result<Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status,
        message: body,
    })
}

#[async_trait]
impl MarketDataProvider for BridgeProvider {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let health: HealthResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse health response: {e}")))?;

        if !health.connected {
            return Err(ProviderError::NotInitialized(
                health
                    .error
                    .unwrap_or_else(|| "bridge reports no terminal connection".into()),
            ));
        }

        info!(
            "Connected to terminal {} via {}",
            health.terminal.as_deref().unwrap_or("(unnamed)"),
            self.base_url
        );
        Ok(())
    }

    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        offset: usize,
        count: usize,
    ) -> Result<Option<Vec<RawBar>>, ProviderError> {
        debug!("GET rates {symbol} {timeframe} offset={offset} count={count}");
        let response = self
            .client
            .get(format!("{}/rates", self.base_url))
            .query(&[
                ("symbol", symbol.to_string()),
                ("timeframe", timeframe.as_str().to_string()),
                ("offset", offset.to_string()),
                ("count", count.to_string()),
            ])
            .send()
            .await?;

        let body: RatesResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse rates response: {e}")))?;

        Ok(body.rates)
    }

    async fn get_ticks(
        &self,
        symbol: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<RawTick>, ProviderError> {
        debug!("GET ticks {symbol} [{from}, {to}]");
        let response = self
            .client
            .get(format!("{}/ticks", self.base_url))
            .query(&[
                ("symbol", symbol.to_string()),
                ("from", from.to_string()),
                ("to", to.to_string()),
            ])
            .send()
            .await?;

        let body: TicksResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse ticks response: {e}")))?;

        Ok(body.ticks)
    }
}
