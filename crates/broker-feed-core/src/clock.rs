use chrono::Utc;

/// Source of "now" for fetch loops whose stopping point depends on the
/// current time.
pub trait Clock: Send + Sync {
    /// Current time as epoch seconds (UTC).
    fn now_utc(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_utc(&self) -> i64 {
        self.0
    }
}
