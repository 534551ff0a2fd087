//! Deterministic RNG wrapper used for every stochastic step of the pipeline.
//!
//! All grain synthesis, kernel construction, and density noise MUST draw
//! from this module so that a fixed seed reproduces byte-identical output.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Wrapper around PCG32 for deterministic random number generation.
///
/// Box-Muller gaussian sampling produces two values per pair of uniform
/// draws; the second is cached so consecutive `gaussian` calls only
/// consume one fresh uniform pair every other call.
#[derive(Clone)]
pub struct DeterministicRng {
    seed: u64,
    inner: Pcg32,
    cached_gaussian: Option<f64>,
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg32::seed_from_u64(seed),
            cached_gaussian: None,
        }
    }

    /// Restore the RNG to its state immediately after construction.
    pub fn reset(&mut self) {
        self.inner = Pcg32::seed_from_u64(self.seed);
        self.cached_gaussian = None;
    }

    /// Derive a sub-seed for a specific grain using BLAKE3.
    ///
    /// Used by stages that need per-grain randomness independent of the
    /// sequential draw order (see the concurrency model): two grains'
    /// sub-seeds never depend on the order in which grains are visited,
    /// so per-grain work can be parallelized without changing output.
    pub fn derive_grain_seed(base_seed: u64, grain_id: u64) -> u64 {
        let mut input = [0u8; 16];
        input[0..8].copy_from_slice(&base_seed.to_le_bytes());
        input[8..16].copy_from_slice(&grain_id.to_le_bytes());
        let hash = blake3::hash(&input);
        let bytes: [u8; 8] = hash.as_bytes()[0..8].try_into().unwrap();
        u64::from_le_bytes(bytes)
    }

    /// Derive a sub-seed for a named stage (e.g. a cache-fill pass).
    pub fn derive_stage_seed(base_seed: u64, stage: &str) -> u64 {
        let mut input = Vec::with_capacity(8 + stage.len());
        input.extend_from_slice(&base_seed.to_le_bytes());
        input.extend_from_slice(stage.as_bytes());
        let hash = blake3::hash(&input);
        let bytes: [u8; 8] = hash.as_bytes()[0..8].try_into().unwrap();
        u64::from_le_bytes(bytes)
    }

    /// Generate a random u32.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.inner.gen::<u32>()
    }

    /// Generate a random f64 in the range [0.0, 1.0).
    #[inline]
    pub fn next_f64_unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Generate a random usize in [0, upper).
    ///
    /// Returns 0 when `upper` is 0.
    #[inline]
    pub fn gen_below(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_f64_unit() * upper as f64) as usize
    }

    /// Generate a random f64 in the half-open range [lo, hi).
    #[inline]
    pub fn uniform_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64_unit() * (hi - lo)
    }

    /// Draw from a normal distribution with the given mean and standard
    /// deviation using the Box-Muller transform. The second of each pair
    /// of generated values is cached and returned on the following call.
    pub fn gaussian(&mut self, mean: f64, std: f64) -> f64 {
        if let Some(z) = self.cached_gaussian.take() {
            return mean + std * z;
        }

        // Avoid ln(0.0) when the first uniform draw lands exactly on 0.
        let mut u1 = self.next_f64_unit();
        while u1 <= f64::EPSILON {
            u1 = self.next_f64_unit();
        }
        let u2 = self.next_f64_unit();

        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        let z0 = radius * angle.cos();
        let z1 = radius * angle.sin();

        self.cached_gaussian = Some(z1);
        mean + std * z0
    }

    /// Draw from an exponential distribution via inverse CDF sampling.
    pub fn exponential(&mut self, lambda: f64) -> f64 {
        debug_assert!(lambda > 0.0, "exponential lambda must be positive");
        let u = self.next_f64_unit();
        -(1.0 - u).ln() / lambda
    }
}
