//! Out-of-order reading detection.
//!
//! Callers hand over reading sequences already sorted newest-first; this
//! module only verifies that invariant. A violation means the storage
//! layer returned rows in non-chronological order.

use chrono::{DateTime, Utc};

/// Anything carrying a recorded-at timestamp.
pub trait Recorded {
    fn recorded_at(&self) -> DateTime<Utc>;
}

impl Recorded for DateTime<Utc> {
    fn recorded_at(&self) -> DateTime<Utc> {
        *self
    }
}

/// Returns true at the first adjacent pair where a later timestamp
/// appears after an earlier one in a supposedly newest-first sequence.
///
/// Sequences of fewer than two readings are trivially in order.
/// Comparison is at full timestamp resolution.
pub fn detect_out_of_order<T: Recorded>(readings: &[T]) -> bool {
    readings
        .windows(2)
        .any(|pair| pair[1].recorded_at() > pair[0].recorded_at())
}
