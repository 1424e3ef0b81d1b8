//! Randomness for key generation and encryption
//!
//! One [`Sampler`] owns a ChaCha20 stream and draws every distribution the
//! scheme needs: uniform residues, fixed-weight ternary secrets, ternary
//! ephemeral keys and discrete Gaussian errors.

use rand::seq::index::sample as sample_indices;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::RnsPoly;

/// Seedable sampler over a ChaCha20 stream
#[derive(Clone)]
pub struct Sampler {
    /// Standard deviation σ of the error distribution
    sigma: f64,
    /// Reject Gaussian samples beyond this bound
    tailcut: i64,
    rng: ChaCha20Rng,
}

impl Sampler {
    /// Create a sampler, deterministic when a seed is given
    pub fn new(sigma: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Self {
            sigma,
            tailcut: (sigma * 6.0).ceil() as i64,
            rng,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Sample a single value from the discrete Gaussian D_σ by rejection
    pub fn gaussian(&mut self) -> i64 {
        let sigma_sq_2 = 2.0 * self.sigma * self.sigma;
        loop {
            let x = self.rng.gen_range(-self.tailcut..=self.tailcut);
            let prob = (-((x * x) as f64) / sigma_sq_2).exp();
            let u: f64 = self.rng.gen();
            if u < prob {
                return x;
            }
        }
    }

    /// Gaussian error polynomial reduced into every modulus
    pub fn gaussian_poly(&mut self, n: usize, moduli: &[u64]) -> RnsPoly {
        let coeffs: Vec<i64> = (0..n).map(|_| self.gaussian()).collect();
        RnsPoly::from_signed(&coeffs, moduli)
    }

    /// Uniform polynomial with independent residues per modulus
    pub fn uniform_poly(&mut self, n: usize, moduli: &[u64]) -> RnsPoly {
        let limbs = moduli
            .iter()
            .map(|&q| (0..n).map(|_| self.rng.gen_range(0..q)).collect())
            .collect();
        RnsPoly::from_limbs(limbs, moduli.to_vec(), false)
    }

    /// Ternary coefficients with exactly `weight` non-zero entries
    pub fn ternary_fixed_weight(&mut self, n: usize, weight: usize) -> Vec<i64> {
        let mut coeffs = vec![0i64; n];
        for idx in sample_indices(&mut self.rng, n, weight.min(n)).iter() {
            coeffs[idx] = if self.rng.gen::<bool>() { 1 } else { -1 };
        }
        coeffs
    }

    /// Ternary coefficients with P(0) = 1/2 and P(±1) = 1/4
    pub fn ternary(&mut self, n: usize) -> Vec<i64> {
        (0..n)
            .map(|_| match self.rng.gen_range(0..4u8) {
                0 => 1,
                1 => -1,
                _ => 0,
            })
            .collect()
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("sigma", &self.sigma)
            .field("tailcut", &self.tailcut)
            .finish()
    }
}
