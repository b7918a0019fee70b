use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use broker_feed_core::broker_time::{BrokerClock, DstRule};
use broker_feed_core::candle::Candle;
use broker_feed_core::clock::{Clock, SystemClock};
use broker_feed_core::error::FeedError;
use broker_feed_core::tick::Tick;
use broker_feed_core::timeframe::Timeframe;
use broker_feed_providers::error::ProviderError;
use broker_feed_providers::history::fetch_history;
use broker_feed_providers::provider::MarketDataProvider;
use broker_feed_providers::ticks::fetch_ticks;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::FeedConfig;

/// Owns the single terminal session and runs fetches against it one at a
/// time, each bounded by the request timeout.
pub struct FeedService {
    provider: Mutex<Box<dyn MarketDataProvider>>,
    broker_clock: BrokerClock<Box<dyn DstRule>>,
    clock: Arc<dyn Clock>,
    symbol: String,
    timeframe: Timeframe,
    request_timeout: Duration,
    default_batch_size: usize,
}

impl FeedService {
    pub fn new(provider: Box<dyn MarketDataProvider>, config: &FeedConfig) -> Self {
        let rule: Box<dyn DstRule> = Box::new(config.reference_zone);
        Self {
            provider: Mutex::new(provider),
            broker_clock: BrokerClock::new(rule),
            clock: Arc::new(SystemClock),
            symbol: config.symbol.clone(),
            timeframe: config.timeframe,
            request_timeout: config.request_timeout,
            default_batch_size: config.default_batch_size,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dst_rule(mut self, rule: Box<dyn DstRule>) -> Self {
        self.broker_clock = BrokerClock::new(rule);
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn default_batch_size(&self) -> usize {
        self.default_batch_size
    }

    /// Verify the terminal connection. A failure here is fatal for the process.
    pub async fn initialize(&self) -> Result<(), ProviderError> {
        let provider = self.provider.lock().await;
        provider.initialize().await
    }

    /// Closed candles strictly after `since`, oldest first.
    pub async fn candles_since(
        &self,
        since: i64,
        batch_size: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        self.bounded("candle fetch", async {
            let provider = self.provider.lock().await;
            fetch_history(
                &**provider,
                &self.broker_clock,
                &self.symbol,
                self.timeframe,
                since,
                batch_size,
            )
            .await
        })
        .await
    }

    /// Deduplicated ticks from a day before `since` up to now, ascending.
    pub async fn ticks_since(&self, since: i64) -> Result<Vec<Tick>, FeedError> {
        self.bounded("tick fetch", async {
            let provider = self.provider.lock().await;
            fetch_ticks(
                &**provider,
                &self.broker_clock,
                self.clock.as_ref(),
                &self.symbol,
                since,
            )
            .await
        })
        .await
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fetch: impl Future<Output = Result<T, FeedError>>,
    ) -> Result<T, FeedError> {
        match tokio::time::timeout(self.request_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{what} timed out after {:?}", self.request_timeout);
                Err(FeedError::DataSourceUnavailable(format!(
                    "{what} timed out after {}s",
                    self.request_timeout.as_secs_f64()
                )))
            }
        }
    }
}
