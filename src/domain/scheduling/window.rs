//! Half-open time window value object.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

/// Half-open UTC interval `[start, end)`.
///
/// # Invariants
///
/// - `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
}

impl TimeWindow {
    /// Creates a window, rejecting empty or inverted intervals.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if `start >= end`
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::invalid_format(
                "time_window",
                format!("start {} must be before end {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// Returns the inclusive start instant.
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Returns the exclusive end instant.
    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Checks whether an instant falls inside the window.
    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Checks whether two half-open windows overlap.
    ///
    /// `[a,b)` and `[c,d)` conflict iff `a < d && c < b`; windows that
    /// merely touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersects two windows, returning `None` when they do not overlap.
    pub fn intersect(&self, other: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
