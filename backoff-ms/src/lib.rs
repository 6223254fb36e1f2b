//! Exponential backoff delay calculator.
//!
//! ```
//! use backoff_ms::{compute_backoff_with, BackoffConfig, FixedRandom};
//!
//! let cfg = BackoffConfig::for_attempt(3).with_randomization_factor(0.0);
//! assert_eq!(compute_backoff_with(&cfg, &mut FixedRandom(0.5)), 4_000.0);
//! ```

pub mod backoff;
pub mod cli;
pub mod config;
pub mod output;
pub mod random;
pub mod util;

pub use backoff::{
    compute_backoff, compute_backoff_with, delay_duration, BackoffConfig, ConfigError, DelayError,
};
pub use random::{FixedRandom, RandomSource, RngSource, ThreadRandom};
