//! Time intervals and the overlap rule.
//!
//! Boundaries are closed: two intervals that touch at a single instant
//! (one finishes at 16:30, the other starts at 16:30) overlap, so
//! back-to-back bookings on the same resource are refused.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

/// A booked span of time. Always satisfies `starts_at < finishes_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    starts_at: DateTime<Utc>,
    finishes_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawInterval {
    starts_at: DateTime<Utc>,
    finishes_at: DateTime<Utc>,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = GuardError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        TimeInterval::new(raw.starts_at, raw.finishes_at)
    }
}

impl TimeInterval {
    /// Build an interval, rejecting zero-length and inverted spans.
    ///
    /// # Errors
    /// Returns `GuardError::InvalidInterval` when `starts_at >= finishes_at`.
    pub fn new(starts_at: DateTime<Utc>, finishes_at: DateTime<Utc>) -> Result<Self> {
        if starts_at >= finishes_at {
            return Err(GuardError::InvalidInterval {
                starts_at,
                finishes_at,
            });
        }
        Ok(Self {
            starts_at,
            finishes_at,
        })
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn finishes_at(&self) -> DateTime<Utc> {
        self.finishes_at
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.finishes_at - self.starts_at).num_minutes()
    }

    /// See [`overlaps`].
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        overlaps(self, other)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.starts_at.to_rfc3339(),
            self.finishes_at.to_rfc3339()
        )
    }
}

/// Whether two intervals share at least one instant.
///
/// `[s1, e1]` and `[s2, e2]` overlap iff `s1 <= e2 && s2 <= e1`. The rule is
/// symmetric and every interval overlaps itself.
pub fn overlaps(a: &TimeInterval, b: &TimeInterval) -> bool {
    a.starts_at <= b.finishes_at && b.starts_at <= a.finishes_at
}

/// Length in whole minutes of the span shared by `a` and `b`.
///
/// `None` when they do not overlap; `Some(0)` when they only touch.
pub fn overlap_minutes(a: &TimeInterval, b: &TimeInterval) -> Option<i64> {
    if !overlaps(a, b) {
        return None;
    }
    let shared_start = a.starts_at.max(b.starts_at);
    let shared_end = a.finishes_at.min(b.finishes_at);
    Some((shared_end - shared_start).num_minutes())
}
