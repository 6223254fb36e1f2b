use rand::Rng;

/// Source of uniform draws in `[0, 1)` used for jitter.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Thread-local generator; the default for [`crate::compute_backoff`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Adapts any `rand` generator, e.g. a seeded `StdRng`.
#[derive(Clone, Debug)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Always yields the same value. Not clamped, so `FixedRandom(1.0)` gives
/// the jitter ceiling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}
