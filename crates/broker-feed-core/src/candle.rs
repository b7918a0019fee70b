use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single closed OHLC bar, timestamped in true UTC.
///
/// Field names on the wire follow what polling clients already deserialize
/// (`tickvol`, `vol`), and prices are emitted as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, epoch seconds (UTC).
    pub time: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub close: Decimal,
    pub pair: String,
    #[serde(rename = "tickvol")]
    pub tick_volume: i64,
    /// Real volume is not reported by the terminal; always 0.
    #[serde(rename = "vol")]
    pub volume: i64,
    /// Always 0.
    pub spread: i64,
}
