//! # Temporal Types — Ledger Epoch Timestamps
//!
//! Defines `Timestamp`, the unsigned 64-bit Unix time (seconds) that the
//! ledger reports as the latest committed round time, and that the escrow
//! contract stores for `lease_start` and `lease_end`.
//!
//! ## Security Invariant
//!
//! Deadline arithmetic never wraps. [`Timestamp::checked_add_secs`] returns
//! `None` on overflow so a deadline past the end of representable time is
//! treated as "never reached" instead of wrapping around to the past.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, UTC.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from Unix epoch seconds.
    pub fn from_epoch_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> u64 {
        self.0
    }

    /// Add a number of seconds, returning `None` on overflow.
    pub fn checked_add_secs(&self, secs: u64) -> Option<Self> {
        self.0.checked_add(secs).map(Self)
    }

    /// Add a number of seconds, clamping at the maximum representable time.
    pub fn saturating_add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Render as ISO8601 with Z suffix (e.g., `2024-10-18T16:00:00Z`).
    ///
    /// Instants beyond chrono's range fall back to the raw epoch seconds.
    pub fn to_iso8601(&self) -> String {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<u64> for Timestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}
