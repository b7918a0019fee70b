pub mod broker_time;
pub mod candle;
pub mod clock;
pub mod error;
pub mod tick;
pub mod timeframe;
