//! # Change Filter and Refresh Gate
//!
//! Two small, independent gates in front of the forwarder:
//!
//! - `ChangeFilter` decides *what* goes downstream — a record identical to
//!   the last accepted reading is suppressed.
//! - `RefreshGate` decides *how often* a time-bounded side effect may fire
//!   (status logging, re-send pacing), no matter how fast updates arrive.
//!
//! Both hold their state as plain private fields; they are owned by the
//! single pipeline task and need no locking.

use std::time::{Duration, Instant};

use crate::record::PositionRecord;

/// Suppresses consecutive duplicate readings.
#[derive(Debug, Default)]
pub struct ChangeFilter {
    last_accepted: Option<PositionRecord>,
}

impl ChangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `candidate` differs from the last accepted reading in at
    /// least one field (receipt timestamps are not compared), or nothing
    /// has been accepted yet. On true, `candidate` becomes the new
    /// reference.
    pub fn accept(&mut self, candidate: &PositionRecord) -> bool {
        let changed = self
            .last_accepted
            .as_ref()
            .map_or(true, |last| !last.same_reading(candidate));

        if changed {
            self.last_accepted = Some(candidate.clone());
        }

        changed
    }

    /// The most recently accepted record, if any. Comparison state only;
    /// no history is kept.
    pub fn last_accepted(&self) -> Option<&PositionRecord> {
        self.last_accepted.as_ref()
    }
}

/// Minimum-interval gate for periodic side effects.
#[derive(Debug)]
pub struct RefreshGate {
    min_interval: Duration,
    last_fired: Option<Instant>,
}

impl RefreshGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fired: None,
        }
    }

    /// True only when at least `min_interval` has elapsed since the last
    /// true-returning call (the first call always fires). The internal
    /// clock advances only on true, so callers cannot starve the gate by
    /// polling it quickly.
    pub fn should_refresh(&mut self, now: Instant) -> bool {
        let due = self
            .last_fired
            .map_or(true, |last| now.duration_since(last) >= self.min_interval);

        if due {
            self.last_fired = Some(now);
        }

        due
    }
}
