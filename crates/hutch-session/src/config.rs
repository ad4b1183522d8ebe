//! Configuration for the session storage.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default freshness window (30 minutes).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(1800);

/// Default chance that a lookup also sweeps expired records.
pub const DEFAULT_GC_PROBABILITY: f64 = 0.0;

/// Check a lookup key against `^[a-zA-Z0-9_.-]+$`.
pub fn validate_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

/// Validated settings for [`crate::SessionStorage`].
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Cookie / lookup key name; also mixed into minted identifiers.
    pub key: String,

    /// How long a record stays fresh after its last touch.
    pub max_age: Duration,

    /// Chance in `0.0..=1.0` that a lookup runs a sweep first.
    pub gc_probability: f64,
}

impl StorageConfig {
    /// Create a configuration with default max-age and GC probability.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            max_age: DEFAULT_MAX_AGE,
            gc_probability: DEFAULT_GC_PROBABILITY,
        }
    }

    /// Set the freshness window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the sweep probability.
    pub fn with_gc_probability(mut self, probability: f64) -> Self {
        self.gc_probability = probability;
        self
    }

    /// Reject an invalid key, a zero max-age, or a probability outside
    /// `0.0..=1.0` (NaN included).
    pub fn validate(&self) -> Result<()> {
        if !validate_key(&self.key) {
            return Err(Error::InvalidKey(self.key.clone()));
        }
        if self.max_age.is_zero() {
            return Err(Error::InvalidMaxAge(self.max_age.as_secs()));
        }
        if !(0.0..=1.0).contains(&self.gc_probability) {
            return Err(Error::InvalidGcProbability(self.gc_probability));
        }
        Ok(())
    }
}
