use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single bid/ask quote, timestamped in true UTC.
///
/// `time_msc` is the identity of a tick: two ticks with the same
/// millisecond timestamp are the same quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Epoch seconds (UTC).
    pub time: i64,
    /// Epoch milliseconds (UTC), sub-second part as reported by the broker.
    pub time_msc: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub bid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub ask: Decimal,
    pub pair: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_through_json() {
        let tick = Tick {
            time: 1_700_000_000,
            time_msc: 1_700_000_000_250,
            bid: dec!(149.512),
            ask: dec!(149.515),
            pair: "USDJPY".to_string(),
        };

        let json = serde_json::to_string(&tick).unwrap();
        assert!(json.contains(r#""time_msc":1700000000250"#));

        let parsed: Tick = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.time_msc, tick.time_msc);
        assert_eq!(parsed.bid, dec!(149.512));
    }
}
