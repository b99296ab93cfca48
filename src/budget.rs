//! Remaining-time bookkeeping threaded through every hop of an execution.
//!
//! A [`Budget`] is a plain value, not a shared clock. The plan hands each root the total
//! budget, and every node subtracts its own measured elapsed time before passing the
//! result on to its successors. The value can go negative and never grows back.

use std::time::Duration;

/// Signed remaining milliseconds of a graph execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Budget {
    remaining_ms: i64,
}

impl Budget {
    pub const fn from_millis(ms: i64) -> Self {
        Self { remaining_ms: ms }
    }

    pub fn remaining_ms(self) -> i64 {
        self.remaining_ms
    }

    /// A node entering with an exhausted budget must not start its action.
    pub fn is_exhausted(self) -> bool {
        self.remaining_ms <= 0
    }

    /// Budget left after `elapsed` was spent.
    ///
    /// Elapsed time is rounded up to whole milliseconds so the handed-on budget is never
    /// larger than the true remainder.
    pub fn after(self, elapsed: Duration) -> Self {
        let spent = elapsed.as_micros().div_ceil(1000);
        let spent = i64::try_from(spent).unwrap_or(i64::MAX);
        Self {
            remaining_ms: self.remaining_ms.saturating_sub(spent),
        }
    }

    /// Remaining time as a [`Duration`]; zero once exhausted.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.remaining_ms.max(0) as u64)
    }
}

impl From<Duration> for Budget {
    fn from(duration: Duration) -> Self {
        Self {
            remaining_ms: i64::try_from(duration.as_millis()).unwrap_or(i64::MAX),
        }
    }
}
