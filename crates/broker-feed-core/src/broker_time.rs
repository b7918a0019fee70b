//! Conversion of broker-clock timestamps to true UTC.
//!
//! The terminal's server clock runs at the reference zone's wall-clock
//! offset plus one hour, so it sits UTC+3 while that zone observes daylight
//! saving time and UTC+2 otherwise. The DST state is taken at the broker
//! timestamp itself read as a UTC instant.

use std::str::FromStr;

use chrono::{DateTime, TimeDelta};
use chrono_tz::{OffsetComponents, Tz};

use crate::error::FeedError;

/// Broker clock lead over UTC while the reference zone is on summer time.
pub const DST_OFFSET_SECS: i64 = 3 * 60 * 60;
/// Broker clock lead over UTC outside summer time.
pub const STANDARD_OFFSET_SECS: i64 = 2 * 60 * 60;

pub const DEFAULT_REFERENCE_ZONE: Tz = chrono_tz::Europe::Helsinki;

/// Answers whether the reference zone observes DST at an instant.
pub trait DstRule: Send + Sync {
    fn is_dst_at(&self, instant_utc: i64) -> bool;
}

/// DST state looked up in the IANA time zone database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneDst {
    zone: Tz,
}

impl ZoneDst {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }
}

impl Default for ZoneDst {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_ZONE)
    }
}

impl FromStr for ZoneDst {
    type Err = FeedError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let zone = name.trim().parse::<Tz>().map_err(|_| {
            FeedError::invalid_parameter("reference_zone", format!("unknown time zone '{name}'"))
        })?;
        Ok(Self::new(zone))
    }
}

impl DstRule for ZoneDst {
    fn is_dst_at(&self, instant_utc: i64) -> bool {
        // Out of chrono's representable range: no DST rule applies.
        let Some(utc) = DateTime::from_timestamp(instant_utc, 0) else {
            return false;
        };
        utc.with_timezone(&self.zone).offset().dst_offset() != TimeDelta::zero()
    }
}

impl<T: DstRule + ?Sized> DstRule for Box<T> {
    fn is_dst_at(&self, instant_utc: i64) -> bool {
        (**self).is_dst_at(instant_utc)
    }
}

/// A DST state pinned regardless of the instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDst(pub bool);

impl DstRule for FixedDst {
    fn is_dst_at(&self, _instant_utc: i64) -> bool {
        self.0
    }
}

/// Normalizes broker-clock timestamps to UTC under a [`DstRule`].
#[derive(Debug, Clone, Default)]
pub struct BrokerClock<R = ZoneDst> {
    rule: R,
}

impl<R: DstRule> BrokerClock<R> {
    pub fn new(rule: R) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    /// Seconds the broker clock leads UTC at `broker_ts`.
    pub fn offset_secs(&self, broker_ts: i64) -> i64 {
        if self.rule.is_dst_at(broker_ts) {
            DST_OFFSET_SECS
        } else {
            STANDARD_OFFSET_SECS
        }
    }

    /// Broker epoch seconds to UTC epoch seconds.
    pub fn normalize(&self, broker_ts: i64) -> i64 {
        broker_ts.saturating_sub(self.offset_secs(broker_ts))
    }

    /// Broker millisecond timestamp to UTC milliseconds.
    ///
    /// The offset is applied to the whole-second value and the broker's
    /// sub-second remainder is carried over untouched. Saturates at the
    /// bounds of `i64`.
    pub fn normalize_msc(&self, broker_ts: i64, broker_msc: i64) -> i64 {
        self.normalize(broker_ts)
            .saturating_mul(1000)
            .saturating_add(broker_msc.rem_euclid(1000))
    }
}
