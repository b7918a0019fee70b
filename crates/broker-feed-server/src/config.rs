use std::time::Duration;

use broker_feed_core::broker_time::ZoneDst;
use broker_feed_core::error::FeedError;
use broker_feed_core::timeframe::Timeframe;
use broker_feed_providers::bridge::DEFAULT_BRIDGE_URL;
use broker_feed_providers::history::DEFAULT_BATCH_SIZE;
use clap::Args;

/// Deployment settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct FeedArgs {
    /// Base URL of the terminal bridge
    #[arg(long, env = "BROKER_FEED_BRIDGE_URL", default_value = DEFAULT_BRIDGE_URL)]
    pub bridge_url: String,

    /// Symbol served by this deployment
    #[arg(long, env = "BROKER_FEED_SYMBOL", default_value = "USDJPY")]
    pub symbol: String,

    /// Bar timeframe: M1, M5, M15, M30, H1, H4, D1
    #[arg(long, env = "BROKER_FEED_TIMEFRAME", default_value = "M1")]
    pub timeframe: String,

    /// IANA zone whose DST state sets the broker clock offset
    #[arg(long, env = "BROKER_FEED_REFERENCE_ZONE", default_value = "Europe/Helsinki")]
    pub reference_zone: String,

    /// Upper bound on a single fetch, provider calls included
    #[arg(long, env = "BROKER_FEED_REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Batch size used when a request does not name one
    #[arg(long, env = "BROKER_FEED_DEFAULT_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub default_batch_size: usize,
}

/// Validated deployment settings.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub bridge_url: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub reference_zone: ZoneDst,
    pub request_timeout: Duration,
    pub default_batch_size: usize,
}

impl FeedArgs {
    pub fn into_config(self) -> Result<FeedConfig, FeedError> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(FeedError::invalid_parameter("symbol", "must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(FeedError::invalid_parameter(
                "request_timeout_secs",
                "must be at least 1",
            ));
        }
        if self.default_batch_size == 0 {
            return Err(FeedError::invalid_parameter(
                "default_batch_size",
                "must be at least 1",
            ));
        }

        Ok(FeedConfig {
            bridge_url: self.bridge_url,
            symbol,
            timeframe: self.timeframe.parse()?,
            reference_zone: self.reference_zone.parse()?,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            default_batch_size: self.default_batch_size,
        })
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            symbol: "USDJPY".to_string(),
            timeframe: Timeframe::M1,
            reference_zone: ZoneDst::default(),
            request_timeout: Duration::from_secs(120),
            default_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
