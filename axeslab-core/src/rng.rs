//! Deterministic seed hierarchy.
//!
//! A master seed is expanded into sub-seeds for each `(scope, index, round)`
//! unit of randomized work: a k-means restart, a bootstrap tree, a holdout
//! split. Sub-seeds are derived via BLAKE3 hashing, independently of the order
//! in which units run, so parallel fitting yields identical results for any
//! thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for `(scope, index, round)`.
    pub fn sub_seed(&self, scope: &str, index: u64, round: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(scope.as_bytes());
        hasher.update(&index.to_le_bytes());
        hasher.update(&round.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, scope: &str, index: u64, round: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(scope, index, round))
    }
}

/// One N(0, 1) draw (Box-Muller).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
