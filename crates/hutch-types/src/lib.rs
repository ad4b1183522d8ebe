//! Shared time and randomness contracts for the Hutch session store.
//!
//! The session core never reads the system clock or a global RNG directly.
//! It is handed a [`Clock`] and a [`RandomSource`], so tests can pin both:
//!
//! ```rust
//! use hutch_types::{Clock, FixedClock, RandomSource, SequenceRandom};
//!
//! let clock = FixedClock::from_timestamp(1_555_555_555);
//! assert_eq!(clock.now().timestamp(), 1_555_555_555);
//!
//! let random = SequenceRandom::new([7, 11]).unwrap();
//! assert_eq!(random.next(), 7);
//! assert_eq!(random.next(), 11);
//! assert_eq!(random.next(), 7);
//! ```

pub mod clock;
pub mod error;
pub mod random;

pub use clock::{Clock, FixedClock, ShiftedClock, SharedClock, SystemClock};
pub use error::{Error, Result};
pub use random::{RANDOM_MAX, RandomSource, SequenceRandom, SharedRandom, ThreadRandom};
