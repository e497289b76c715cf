use rand::Rng;

/// Source of the small perturbation added to a computed prediction.
///
/// Implementations must return a value in `[-amplitude, amplitude]`.
pub trait JitterSource {
    fn jitter(&mut self, amplitude: f64) -> f64;
}

/// Uniform draw from an injected RNG.
#[derive(Debug)]
pub struct RandomJitter<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: Rng> JitterSource for RandomJitter<R> {
    fn jitter(&mut self, amplitude: f64) -> f64 {
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return 0.0;
        }
        self.rng.random_range(-amplitude..amplitude)
    }
}

/// Always zero: fully deterministic predictions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn jitter(&mut self, _amplitude: f64) -> f64 {
        0.0
    }
}

/// A fixed offset, clamped to the amplitude.
#[derive(Clone, Copy, Debug)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn jitter(&mut self, amplitude: f64) -> f64 {
        let bound = amplitude.max(0.0);
        if self.0.is_nan() {
            return 0.0;
        }
        self.0.clamp(-bound, bound)
    }
}

impl<J: JitterSource + ?Sized> JitterSource for &mut J {
    fn jitter(&mut self, amplitude: f64) -> f64 {
        (**self).jitter(amplitude)
    }
}
