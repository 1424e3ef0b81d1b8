//! Key generation

use std::sync::Arc;

use tracing::debug;

use super::types::{PublicKey, SecretKey};
use crate::error::{store_err, Result};
use crate::ks::{self, GaloisKey, RelinearizationKey};
use crate::math::{RingContext, RnsPoly, Sampler};

/// Generates secret, public, relinearization and Galois keys
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    ring: Arc<RingContext>,
    hamming_weight: usize,
}

impl KeyGenerator {
    pub fn new(ring: Arc<RingContext>, hamming_weight: usize) -> Self {
        Self {
            ring,
            hamming_weight,
        }
    }

    /// Ternary secret with exactly `hamming_weight` non-zero coefficients
    pub fn gen_secret_key(&self, sampler: &mut Sampler) -> SecretKey {
        let n = self.ring.dimension();
        let coeffs = sampler.ternary_fixed_weight(n, self.hamming_weight);
        let moduli = self.ring.qp_moduli(self.ring.max_level());
        let mut poly = RnsPoly::from_signed(&coeffs, &moduli);
        self.ring.to_ntt(&mut poly);
        SecretKey { poly }
    }

    /// Check that a secret key (e.g. one read from disk) belongs to this ring
    pub fn check_secret_key(&self, sk: &SecretKey) -> Result<()> {
        let expected = self.ring.qp_moduli(self.ring.max_level());
        if sk.poly.dimension() != self.ring.dimension() || sk.poly.moduli() != expected.as_slice() {
            return Err(store_err!("secret key was generated for different parameters"));
        }
        if !sk.poly.is_ntt() {
            return Err(store_err!("secret key is not in NTT form"));
        }
        Ok(())
    }

    /// Public key (-a·s + e, a) over the full Q chain
    pub fn gen_public_key(&self, sk: &SecretKey, sampler: &mut Sampler) -> PublicKey {
        let n = self.ring.dimension();
        let level = self.ring.max_level();
        let moduli = self.ring.q_moduli(level);

        let mut a = sampler.uniform_poly(n, moduli);
        a.force_ntt_domain();
        let s = sk.poly.select_limbs(&(0..=level).collect::<Vec<_>>());

        let mut b = self.ring.to_ntt_new(&sampler.gaussian_poly(n, moduli));
        b -= &self.ring.mul(&a, &s);
        PublicKey { b, a }
    }

    pub fn gen_relinearization_key(&self, sk: &SecretKey, sampler: &mut Sampler) -> RelinearizationKey {
        ks::generate_relinearization_key(&self.ring, sk, sampler)
    }

    pub fn gen_galois_key(&self, sk: &SecretKey, galois_element: u64, sampler: &mut Sampler) -> GaloisKey {
        debug!(galois_element, "generating galois key");
        ks::generate_galois_key(&self.ring, sk, galois_element, sampler)
    }
}
