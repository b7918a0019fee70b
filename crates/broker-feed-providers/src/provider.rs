use async_trait::async_trait;
use broker_feed_core::broker_time::{BrokerClock, DstRule};
use broker_feed_core::candle::Candle;
use broker_feed_core::tick::Tick;
use broker_feed_core::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ProviderError;

/// A bar as reported by the terminal, timestamped on the broker clock.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawBar {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub tick_volume: i64,
}

impl RawBar {
    /// Build the outgoing candle with an already normalized UTC time.
    pub fn to_candle(&self, utc_time: i64, pair: &str) -> Candle {
        Candle {
            time: utc_time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            pair: pair.to_string(),
            tick_volume: self.tick_volume,
            volume: 0,
            spread: 0,
        }
    }
}

/// A quote as reported by the terminal, timestamped on the broker clock.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTick {
    pub time: i64,
    pub time_msc: i64,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl RawTick {
    pub fn to_tick<R: DstRule>(&self, broker_clock: &BrokerClock<R>, pair: &str) -> Tick {
        Tick {
            time: broker_clock.normalize(self.time),
            time_msc: broker_clock.normalize_msc(self.time, self.time_msc),
            bid: self.bid,
            ask: self.ask,
            pair: pair.to_string(),
        }
    }
}

/// Access to the trading terminal's price history.
///
/// A single provider represents one terminal session; callers are expected
/// to use it from one fetch at a time.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Establish or verify the terminal connection. Called once at startup.
    async fn initialize(&self) -> Result<(), ProviderError>;

    /// Up to `count` bars starting `offset` positions back from the newest
    /// bar, newest first. Position 0 is the bar still forming.
    /// `None` means the terminal returned nothing for this range.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        offset: usize,
        count: usize,
    ) -> Result<Option<Vec<RawBar>>, ProviderError>;

    /// All ticks in `[from, to]`, bounds in broker-clock epoch seconds.
    async fn get_ticks(
        &self,
        symbol: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<RawTick>, ProviderError>;
}
