use broker_feed_core::broker_time::{BrokerClock, DstRule};
use broker_feed_core::candle::Candle;
use broker_feed_core::error::FeedError;
use broker_feed_core::timeframe::Timeframe;
use tracing::{debug, info};

use crate::provider::MarketDataProvider;

/// Position of the newest closed bar. Position 0 is still forming.
pub const FIRST_CLOSED_BAR_OFFSET: usize = 1;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Walk back through closed bars in batches of `batch_size` and return every
/// bar whose UTC time is strictly after `since_utc`, oldest first.
///
/// Bars come newest first, so the walk stops at the first batch holding no
/// bar newer than the cutoff. Any provider failure aborts the whole fetch.
pub async fn fetch_history<R: DstRule>(
    provider: &dyn MarketDataProvider,
    broker_clock: &BrokerClock<R>,
    symbol: &str,
    timeframe: Timeframe,
    since_utc: i64,
    batch_size: usize,
) -> Result<Vec<Candle>, FeedError> {
    if batch_size == 0 {
        return Err(FeedError::invalid_parameter(
            "batch_size",
            "must be at least 1",
        ));
    }

    // Kept with the broker time so the final ordering uses the terminal's clock.
    let mut collected: Vec<(i64, Candle)> = Vec::new();
    let mut offset = FIRST_CLOSED_BAR_OFFSET;

    loop {
        let Some(bars) = provider
            .get_bars(symbol, timeframe, offset, batch_size)
            .await?
        else {
            debug!("{symbol} {timeframe}: no bars at offset {offset}");
            break;
        };

        let received = bars.len();
        let before = collected.len();
        collected.extend(bars.iter().filter_map(|bar| {
            let utc = broker_clock.normalize(bar.time);
            (utc > since_utc).then(|| (bar.time, bar.to_candle(utc, symbol)))
        }));
        let fresh = collected.len() - before;

        debug!("{symbol} {timeframe}: offset {offset}: {fresh} of {received} bar(s) after {since_utc}");

        if fresh == 0 {
            break;
        }
        // No position exists past usize::MAX; history is exhausted.
        let Some(next) = offset.checked_add(batch_size) else {
            break;
        };
        offset = next;
    }

    collected.sort_by_key(|(broker_time, _)| *broker_time);
    info!(
        "{symbol} {timeframe}: {} bar(s) after {since_utc}",
        collected.len()
    );
    Ok(collected.into_iter().map(|(_, candle)| candle).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use broker_feed_core::broker_time::{FixedDst, ZoneDst};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{RawBar, RawTick};

    /// Serves a fixed newest-first bar series and records each request.
    struct SeriesProvider {
        bars: Vec<RawBar>,
        fail_at_offset: Option<usize>,
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl SeriesProvider {
        fn new(times_newest_first: &[i64]) -> Self {
            let broker_times: Vec<i64> = times_newest_first.iter().map(|&t| t + LEAD).collect();
            Self::with_broker_times(&broker_times)
        }

        fn with_broker_times(broker_times_newest_first: &[i64]) -> Self {
            Self {
                bars: broker_times_newest_first.iter().map(|&t| bar(t)).collect(),
                fail_at_offset: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(usize, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MarketDataProvider for SeriesProvider {
        fn name(&self) -> &str {
            "series"
        }

        async fn initialize(&self) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn get_bars(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            offset: usize,
            count: usize,
        ) -> Result<Option<Vec<RawBar>>, ProviderError> {
            self.calls.lock().unwrap().push((offset, count));
            if self.fail_at_offset == Some(offset) {
                return Err(ProviderError::Api {
                    status: 500,
                    message: "terminal disconnected".into(),
                });
            }
            if offset >= self.bars.len() {
                return Ok(None);
            }
            let end = offset.saturating_add(count).min(self.bars.len());
            Ok(Some(self.bars[offset..end].to_vec()))
        }

        async fn get_ticks(
            &self,
            _symbol: &str,
            _from: i64,
            _to: i64,
        ) -> Result<Vec<RawTick>, ProviderError> {
            Ok(Vec::new())
        }
    }

    // Broker clock two hours ahead of UTC.
    const LEAD: i64 = 7_200;

    fn bar(broker_time: i64) -> RawBar {
        RawBar {
            time: broker_time,
            open: dec!(150.00),
            high: dec!(150.10),
            low: dec!(149.90),
            close: dec!(150.05),
            tick_volume: 10,
        }
    }

    fn times(candles: &[Candle]) -> Vec<i64> {
        candles.iter().map(|c| c.time).collect()
    }

    fn clock() -> BrokerClock<FixedDst> {
        BrokerClock::new(FixedDst(false))
    }

    #[tokio::test]
    async fn returns_bars_after_cutoff_ascending() {
        // 600 is the forming bar at position 0.
        let provider = SeriesProvider::new(&[600, 500, 400, 300, 200, 100]);

        let candles = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 250, 2)
            .await
            .unwrap();

        assert_eq!(times(&candles), vec![300, 400, 500]);
        assert!(candles.iter().all(|c| c.pair == "USDJPY"));
    }

    #[tokio::test]
    async fn stops_after_first_batch_without_fresh_bars() {
        let provider = SeriesProvider::new(&[600, 500, 400, 300, 200, 100]);

        fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 250, 2)
            .await
            .unwrap();

        // [500,400], [300,200], then [100] holds nothing after 250.
        assert_eq!(provider.calls(), vec![(1, 2), (3, 2), (5, 2)]);
    }

    #[tokio::test]
    async fn never_includes_forming_bar() {
        let provider = SeriesProvider::new(&[600, 500]);

        let candles = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 0, 1000)
            .await
            .unwrap();

        assert_eq!(times(&candles), vec![500]);
        assert_eq!(provider.calls()[0].0, FIRST_CLOSED_BAR_OFFSET);
    }

    #[tokio::test]
    async fn empty_provider_yields_empty_result() {
        let provider = SeriesProvider::new(&[]);

        let candles = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 0, 1)
            .await
            .unwrap();

        assert!(candles.is_empty());
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn cutoff_is_exclusive() {
        let provider = SeriesProvider::new(&[400, 300, 200]);

        let candles = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 200, 10)
            .await
            .unwrap();

        assert_eq!(times(&candles), vec![300]);
    }

    #[tokio::test]
    async fn walks_until_history_runs_out() {
        let provider = SeriesProvider::new(&[700, 600, 500, 400, 300, 200, 100]);

        let candles = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 0, 2)
            .await
            .unwrap();

        assert_eq!(times(&candles), vec![100, 200, 300, 400, 500, 600]);
        // Offset 7 is past the end and comes back empty.
        assert_eq!(provider.calls().last(), Some(&(7, 2)));
    }

    #[tokio::test]
    async fn provider_error_aborts_without_partial_result() {
        let mut provider = SeriesProvider::new(&[600, 500, 400, 300, 200, 100]);
        provider.fail_at_offset = Some(3);

        let err = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 0, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::DataSourceUnavailable(_)));
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected_before_any_call() {
        let provider = SeriesProvider::new(&[600, 500]);

        let err = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 0, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::InvalidParameter { .. }));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn output_times_are_normalized() {
        let provider = SeriesProvider::new(&[600, 500]);
        let dst = BrokerClock::new(FixedDst(true));

        let candles = fetch_history(&provider, &dst, "USDJPY", Timeframe::M1, -10_000, 10)
            .await
            .unwrap();

        // Broker lead is 7200 but the DST rule subtracts 10800.
        assert_eq!(times(&candles), vec![500 + LEAD - 10_800]);
    }

    #[tokio::test]
    async fn maximum_batch_size_stops_instead_of_wrapping() {
        let provider = SeriesProvider::new(&[600, 500, 400, 300]);

        let candles = fetch_history(&provider, &clock(), "USDJPY", Timeframe::M1, 0, usize::MAX)
            .await
            .unwrap();

        assert_eq!(times(&candles), vec![300, 400, 500]);
        // The forming bar at offset 0 is never requested.
        assert_eq!(provider.calls(), vec![(1, usize::MAX)]);
    }

    // 2025-10-26 01:00:00 UTC, Helsinki leaves summer time.
    const FALL_BACK: i64 = 1_761_440_400;
    // 2025-03-30 01:00:00 UTC, Helsinki enters summer time.
    const SPRING_FORWARD: i64 = 1_743_296_400;

    #[tokio::test]
    async fn helsinki_fall_back_normalizes_each_side() {
        let provider = SeriesProvider::with_broker_times(&[
            FALL_BACK + 120,
            FALL_BACK + 60,
            FALL_BACK,
            FALL_BACK - 60,
            FALL_BACK - 120,
        ]);
        let helsinki = BrokerClock::new(ZoneDst::default());

        let candles = fetch_history(&provider, &helsinki, "USDJPY", Timeframe::M1, 0, 10)
            .await
            .unwrap();

        assert_eq!(
            times(&candles),
            vec![
                FALL_BACK - 120 - 10_800,
                FALL_BACK - 60 - 10_800,
                FALL_BACK - 7_200,
                FALL_BACK + 60 - 7_200,
            ]
        );
    }

    #[tokio::test]
    async fn order_follows_broker_clock_across_spring_forward() {
        let provider = SeriesProvider::with_broker_times(&[
            SPRING_FORWARD + 60,
            SPRING_FORWARD,
            SPRING_FORWARD - 60,
        ]);
        let helsinki = BrokerClock::new(ZoneDst::default());

        let candles = fetch_history(&provider, &helsinki, "USDJPY", Timeframe::M1, 0, 10)
            .await
            .unwrap();

        // Broker order is kept even though the UTC times step back an hour.
        assert_eq!(
            times(&candles),
            vec![SPRING_FORWARD - 60 - 7_200, SPRING_FORWARD - 10_800]
        );
    }
}
