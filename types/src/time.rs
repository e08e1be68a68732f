//! Second-granularity wall-clock time.
//!
//! Stores and services take time as an explicit [`Timestamp`] argument;
//! [`Timestamp::now`] is read only at the edges (the dispatcher entry point
//! and the node's loops). Scheduling, commit quota buckets and
//! stale-connection sweeps all work in whole seconds.

use std::fmt;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

/// Seconds in a UTC day, used for quota bucketing.
pub const SECS_PER_DAY: u64 = 86_400;

/// Unix time in whole seconds (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Time zero.
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Read the system clock.
    pub fn now() -> Self {
        let secs = UNIX_EPOCH
            .elapsed()
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward, saturating at the maximum.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// UTC day number (days since epoch). Two timestamps share a day number
    /// exactly when they fall on the same UTC calendar day.
    pub fn day_number(&self) -> u64 {
        self.0 / SECS_PER_DAY
    }

    /// True once `duration_secs` have fully passed since this timestamp, as
    /// judged against the supplied `now`.
    pub fn has_expired(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
