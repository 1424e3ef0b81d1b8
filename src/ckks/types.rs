//! CKKS plaintext, ciphertext and key types.
//!
//! The level of an object is the index of its last Q prime, so an object at
//! level l carries l + 1 limbs and can be rescaled l more times.

use serde::{Deserialize, Serialize};

use crate::math::RnsPoly;

/// Secret key: ternary polynomial s over every Q and P prime, in NTT form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey {
    /// s reduced into q_0..q_L, p_0..p_k.
    pub poly: RnsPoly,
}

/// Public key (b, a) = (-a·s + e, a) over the full Q chain, in NTT form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub b: RnsPoly,
    pub a: RnsPoly,
}

/// Encoded message m with its scaling factor.
///
/// An empty placeholder holds no limbs; it marks a diagonal whose data lives
/// in the artifact store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plaintext {
    pub poly: RnsPoly,
    pub scale: f64,
}

impl Plaintext {
    /// Level of the plaintext (number of limbs minus one)
    pub fn level(&self) -> usize {
        self.poly.num_limbs().saturating_sub(1)
    }

    /// A placeholder without data
    pub fn placeholder(ring_dim: usize, scale: f64) -> Self {
        Self {
            poly: RnsPoly::zero(ring_dim, &[], true),
            scale,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.poly.num_limbs() == 0
    }
}

/// CKKS ciphertext (c0, c1) with c0 + c1·s ≈ m.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub c0: RnsPoly,
    pub c1: RnsPoly,
    pub scale: f64,
}

impl Ciphertext {
    /// Creates a ciphertext from component polynomials.
    pub fn from_parts(c0: RnsPoly, c1: RnsPoly, scale: f64) -> Self {
        debug_assert!(c0.is_compatible(&c1), "Ciphertext polynomials must share a layout");
        Self { c0, c1, scale }
    }

    pub fn level(&self) -> usize {
        self.c0.num_limbs().saturating_sub(1)
    }

    pub fn ring_dim(&self) -> usize {
        self.c0.dimension()
    }

    pub fn is_ntt(&self) -> bool {
        self.c0.is_ntt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_has_no_limbs() {
        let pt = Plaintext::placeholder(64, 1.0);
        assert!(pt.is_placeholder());
        assert_eq!(pt.level(), 0);
    }

    #[test]
    fn test_ciphertext_level() {
        let c0 = RnsPoly::zero(8, &[97, 193, 257], false);
        let ct = Ciphertext::from_parts(c0.clone(), c0, 2.0);
        assert_eq!(ct.level(), 2);
        assert_eq!(ct.ring_dim(), 8);
        assert!(!ct.is_ntt());
    }
}
