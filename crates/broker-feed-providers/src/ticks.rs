use std::collections::BTreeMap;

use broker_feed_core::broker_time::{BrokerClock, DstRule};
use broker_feed_core::clock::Clock;
use broker_feed_core::error::FeedError;
use broker_feed_core::tick::Tick;
use tracing::{debug, info};

use crate::provider::MarketDataProvider;

/// How far before the cutoff the first window starts.
pub const LOOKBACK_SECS: i64 = 24 * 60 * 60;
/// Width of each tick window and the step between windows.
pub const WINDOW_SECS: i64 = 10 * 60 * 60;
/// The walk ends with the first window reaching this far past "now".
pub const LOOKAHEAD_SECS: i64 = 24 * 60 * 60;

/// Collect ticks in 10-hour windows from a day before `since_utc` until a
/// window reaches a day past `clock`'s now.
///
/// Ticks are keyed by their UTC `time_msc`; a tick seen in two windows is
/// kept once (the later copy wins). The result is ascending by `time_msc`.
pub async fn fetch_ticks<R: DstRule>(
    provider: &dyn MarketDataProvider,
    broker_clock: &BrokerClock<R>,
    clock: &dyn Clock,
    symbol: &str,
    since_utc: i64,
) -> Result<Vec<Tick>, FeedError> {
    let stop_at = clock
        .now_utc()
        .checked_add(LOOKAHEAD_SECS)
        .ok_or_else(|| FeedError::DataSourceUnavailable("clock out of range".into()))?;
    let mut from = since_utc
        .checked_sub(LOOKBACK_SECS)
        .ok_or_else(|| FeedError::invalid_parameter("since", "out of range"))?;
    let mut to = from + WINDOW_SECS;

    let mut by_msc: BTreeMap<i64, Tick> = BTreeMap::new();
    let mut windows = 0usize;

    loop {
        let raw = provider.get_ticks(symbol, from, to).await?;
        windows += 1;
        debug!("{symbol}: window [{from}, {to}]: {} tick(s)", raw.len());

        for tick in &raw {
            let tick = tick.to_tick(broker_clock, symbol);
            by_msc.insert(tick.time_msc, tick);
        }

        if to >= stop_at {
            break;
        }
        from += WINDOW_SECS;
        to += WINDOW_SECS;
    }

    info!(
        "{symbol}: {} unique tick(s) from {windows} window(s) since {since_utc}",
        by_msc.len()
    );
    Ok(by_msc.into_values().collect())
}
