//! Wall-clock abstraction.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

/// Source of "now" for freshness checks and identifier minting.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock shared between the orchestrator and its container.
pub type SharedClock = Arc<dyn Clock>;

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(time)
    }

    /// Freeze at a Unix timestamp in seconds. Out-of-range values clamp to the epoch.
    pub fn from_timestamp(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Another clock offset by a fixed delta.
///
/// Saturates at the representable range instead of overflowing.
pub struct ShiftedClock {
    diff: TimeDelta,
    original: SharedClock,
}

impl ShiftedClock {
    pub fn new(diff: TimeDelta, original: SharedClock) -> Self {
        Self { diff, original }
    }

    /// Offset the system clock.
    pub fn from_system(diff: TimeDelta) -> Self {
        Self::new(diff, Arc::new(SystemClock))
    }

    pub fn original(&self) -> &SharedClock {
        &self.original
    }
}

impl Clock for ShiftedClock {
    fn now(&self) -> DateTime<Utc> {
        let base = self.original.now();
        let bound = if self.diff < TimeDelta::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        };
        base.checked_add_signed(self.diff).unwrap_or(bound)
    }
}
