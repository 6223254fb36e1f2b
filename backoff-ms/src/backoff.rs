//! Exponential backoff with additive jitter.
//!
//! The delay for attempt `n` is `base_time_ms * 2^(n - 1)` plus a random
//! fraction (up to `randomization_factor`) of itself, capped at
//! `max_time_ms`. Attempt `0` needs no wait; attempts past `max_attempts`
//! saturate at the cap.

use crate::random::{RandomSource, ThreadRandom};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

pub const DEFAULT_ATTEMPT: f64 = 0.0;
pub const DEFAULT_BASE_TIME_MS: f64 = 1_000.0;
/// 24 hours.
pub const DEFAULT_MAX_TIME_MS: f64 = 86_400_000.0;
pub const DEFAULT_MAX_ATTEMPTS: f64 = 10.0;
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.25;

/// Inputs for one backoff computation. Every field is optional when
/// deserialized and falls back to its documented default.
///
/// Values are deliberately `f64` and unchecked: whatever the caller passes
/// goes through the formula as-is. Use [`BackoffConfig::validate`] to opt
/// into rejecting degenerate input.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// 0-based attempt index; `0` means no retry has happened yet.
    pub attempt: f64,
    #[serde(alias = "baseTimeMs")]
    pub base_time_ms: f64,
    #[serde(alias = "maxTimeMs")]
    pub max_time_ms: f64,
    #[serde(alias = "maxAttempts")]
    pub max_attempts: f64,
    #[serde(alias = "randomizationFactor")]
    pub randomization_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            attempt: DEFAULT_ATTEMPT,
            base_time_ms: DEFAULT_BASE_TIME_MS,
            max_time_ms: DEFAULT_MAX_TIME_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
        }
    }
}

impl BackoffConfig {
    pub fn for_attempt(attempt: impl Into<f64>) -> Self {
        Self { attempt: attempt.into(), ..Self::default() }
    }

    pub fn with_attempt(mut self, attempt: impl Into<f64>) -> Self {
        self.attempt = attempt.into();
        self
    }

    pub fn with_base_time_ms(mut self, ms: f64) -> Self {
        self.base_time_ms = ms;
        self
    }

    pub fn with_max_time_ms(mut self, ms: f64) -> Self {
        self.max_time_ms = ms;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: impl Into<f64>) -> Self {
        self.max_attempts = max_attempts.into();
        self
    }

    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor;
        self
    }

    /// Jitter-free delay `base_time_ms * 2^(attempt - 1)`, before any cap.
    pub fn raw_delay_ms(&self) -> f64 {
        self.base_time_ms * (self.attempt - 1.0).exp2()
    }

    /// Shorthand for [`compute_backoff`].
    pub fn delay_ms(&self) -> f64 {
        compute_backoff(self)
    }

    /// Computes the delay and converts it into a [`Duration`].
    pub fn next_delay(&self) -> Result<Duration, DelayError> {
        delay_duration(compute_backoff(self))
    }

    /// Strict check for callers that want to fail fast instead of letting
    /// degenerate values flow through the formula.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("attempt", self.attempt),
            ("base_time_ms", self.base_time_ms),
            ("max_time_ms", self.max_time_ms),
            ("max_attempts", self.max_attempts),
            ("randomization_factor", self.randomization_factor),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }
        for &(field, value) in &fields[1..4] {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(ConfigError::RandomizationOutOfRange(self.randomization_factor));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("randomization_factor must be within [0, 1] (got {0})")]
    RandomizationOutOfRange(f64),
}

#[derive(Debug, Error, PartialEq)]
pub enum DelayError {
    #[error("delay is not a finite number: {0}")]
    NonFinite(f64),
    #[error("delay is negative: {0}ms")]
    Negative(f64),
    #[error("delay does not fit in a Duration: {0}ms")]
    Overflow(f64),
}

/// Computes the delay in milliseconds using the thread-local generator.
pub fn compute_backoff(config: &BackoffConfig) -> f64 {
    compute_backoff_with(config, &mut ThreadRandom)
}

/// Computes the delay in milliseconds drawing jitter from `rng`.
///
/// Draws exactly once when the attempt is in range and never otherwise.
/// Never fails; NaN and infinities propagate arithmetically.
pub fn compute_backoff_with<R: RandomSource + ?Sized>(config: &BackoffConfig, rng: &mut R) -> f64 {
    if config.attempt <= 0.0 {
        return 0.0;
    }
    if config.attempt > config.max_attempts {
        trace!(attempt = config.attempt, max_attempts = config.max_attempts, "backoff saturated");
        return config.max_time_ms;
    }

    let raw = config.raw_delay_ms();
    let jitter = rng.next_unit() * config.randomization_factor * raw;
    let delay = ieee_min(raw + jitter, config.max_time_ms);
    trace!(attempt = config.attempt, raw, jitter, delay, "backoff computed");
    delay
}

/// Converts a millisecond delay into a [`Duration`].
pub fn delay_duration(ms: f64) -> Result<Duration, DelayError> {
    if !ms.is_finite() {
        return Err(DelayError::NonFinite(ms));
    }
    if ms < 0.0 {
        return Err(DelayError::Negative(ms));
    }
    Duration::try_from_secs_f64(ms / 1_000.0).map_err(|_| DelayError::Overflow(ms))
}

// `f64::min` returns the non-NaN operand; the formula must propagate NaN.
fn ieee_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a < b {
        a
    } else {
        b
    }
}
