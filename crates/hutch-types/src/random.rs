//! Integer draws for GC sampling and identifier minting.
//!
//! None of these sources are cryptographically secure.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::error::{Error, Result};

/// Largest value a [`RandomSource`] may return (`2^31 - 1`).
pub const RANDOM_MAX: u32 = 2_147_483_647;

/// Produces integers uniformly in `0..=RANDOM_MAX`.
pub trait RandomSource: Send + Sync {
    fn next(&self) -> u32;
}

/// Random source shared between components.
pub type SharedRandom = Arc<dyn RandomSource>;

/// Thread-local RNG from the `rand` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next(&self) -> u32 {
        rand::rng().random_range(0..=RANDOM_MAX)
    }
}

/// Replays a fixed sequence, wrapping around at the end.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<u32>,
    index: AtomicUsize,
}

impl SequenceRandom {
    /// Fails if the sequence is empty or any value exceeds [`RANDOM_MAX`].
    pub fn new(values: impl IntoIterator<Item = u32>) -> Result<Self> {
        let values: Vec<u32> = values.into_iter().collect();
        if values.is_empty() {
            return Err(Error::EmptySequence);
        }
        if let Some(&bad) = values.iter().find(|&&v| v > RANDOM_MAX) {
            return Err(Error::OutOfRange(u64::from(bad)));
        }
        Ok(Self {
            values,
            index: AtomicUsize::new(0),
        })
    }
}

impl RandomSource for SequenceRandom {
    fn next(&self) -> u32 {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        self.values[i % self.values.len()]
    }
}
