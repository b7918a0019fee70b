pub mod bridge;
pub mod client;
pub mod error;
pub mod history;
pub mod provider;
pub mod ticks;
