//! Storage backend contract.
//!
//! [`crate::SessionStorage`] is decoupled from where records live through
//! [`SessionContainer`]. A backend keeps one record per identifier and a
//! freshness marker per record that moves forward on every read and write.

use std::time::Duration;

use chrono::TimeDelta;

use crate::error::Result;
use crate::value::Payload;

/// Trait for session storage backends.
///
/// All calls are synchronous and may block on I/O.
pub trait SessionContainer: Send + Sync {
    /// True iff a record for `id` exists and was touched within `max_age`.
    fn contains(&self, id: &str, max_age: Duration) -> bool;

    /// Decoded payload for `id`, refreshing its freshness marker.
    ///
    /// Returns an empty payload if there is no record or it cannot be
    /// decoded. Decode failures are logged, never returned.
    fn load(&self, id: &str) -> Payload;

    /// Encode `payload` and overwrite the record for `id`.
    ///
    /// Failures are logged and returned; the caller's payload is untouched,
    /// so the same save can be retried.
    fn save(&self, id: &str, payload: &Payload) -> Result<()>;

    /// Remove every record whose freshness marker plus `max_age` is in the
    /// past. Returns how many were removed.
    fn clean_expired_sessions(&self, max_age: Duration) -> usize;
}

/// `max_age` as a chrono delta, saturating at the maximum.
pub(crate) fn max_age_delta(max_age: Duration) -> TimeDelta {
    TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX)
}
