//! Noise sources for the history synthesizer.
//!
//! Noise is injected through [`NoiseSource`] so tests can pin it down.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Supplier of zero-mean Gaussian perturbations.
pub trait NoiseSource {
    /// Draws one sample from N(0, `std_dev`).
    fn gaussian(&mut self, std_dev: f64) -> f64;
}

/// Gaussian noise backed by a `StdRng`.
pub struct GaussianNoise {
    rng: StdRng,
}

impl GaussianNoise {
    /// Fresh entropy from the OS.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible stream for a given seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Reproducible stream keyed by an arbitrary string (see [`seed_from_key`]).
    #[must_use]
    pub fn keyed(key: &str) -> Self {
        Self::seeded(seed_from_key(key))
    }
}

impl NoiseSource for GaussianNoise {
    /// Negative or non-finite deviations yield `0.0` without drawing.
    fn gaussian(&mut self, std_dev: f64) -> f64 {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return 0.0;
        }
        // Normal::new only rejects a non-finite deviation.
        match Normal::new(0.0, std_dev) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => 0.0,
        }
    }
}

/// Always returns zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroNoise;

impl NoiseSource for ZeroNoise {
    fn gaussian(&mut self, _std_dev: f64) -> f64 {
        0.0
    }
}

/// Derives a stable 64-bit seed from a string key.
///
/// Stable across platforms and releases (blake3, little-endian prefix).
#[must_use]
pub fn seed_from_key(key: &str) -> u64 {
    let hash = blake3::hash(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}
