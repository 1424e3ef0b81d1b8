//! CKKS public-key encryption and decryption
//!
//! Encryption: (c0, c1) = (v·b + e0 + m, v·a + e1) with a ternary v.
//! Decryption: m ≈ c0 + c1·s.

use std::sync::Arc;

use super::types::{Ciphertext, Plaintext, PublicKey, SecretKey};
use crate::error::{crypto_err, Result};
use crate::math::{RingContext, RnsPoly, Sampler};

/// Encrypts plaintexts under a public key
#[derive(Debug, Clone)]
pub struct Encryptor {
    ring: Arc<RingContext>,
    pk: PublicKey,
}

impl Encryptor {
    pub fn new(ring: Arc<RingContext>, pk: PublicKey) -> Self {
        Self { ring, pk }
    }

    /// Encrypt at the plaintext's level; the ciphertext is in coefficient form
    pub fn encrypt(&self, pt: &Plaintext, sampler: &mut Sampler) -> Result<Ciphertext> {
        if pt.is_placeholder() {
            return Err(crypto_err!("cannot encrypt an empty plaintext"));
        }
        let level = pt.level();
        if level > self.ring.max_level() {
            return Err(crypto_err!("plaintext level {} exceeds the chain", level));
        }
        let n = self.ring.dimension();
        let moduli = self.ring.q_moduli(level);
        let limbs: Vec<usize> = (0..=level).collect();

        let v = self
            .ring
            .to_ntt_new(&RnsPoly::from_signed(&sampler.ternary(n), moduli));
        let m = self.ring.to_ntt_new(&pt.poly);

        let mut c0 = self.ring.to_ntt_new(&sampler.gaussian_poly(n, moduli));
        c0 += &self.ring.mul(&v, &self.pk.b.select_limbs(&limbs));
        c0 += &m;

        let mut c1 = self.ring.to_ntt_new(&sampler.gaussian_poly(n, moduli));
        c1 += &self.ring.mul(&v, &self.pk.a.select_limbs(&limbs));

        self.ring.from_ntt(&mut c0);
        self.ring.from_ntt(&mut c1);
        Ok(Ciphertext::from_parts(c0, c1, pt.scale))
    }
}

/// Decrypts ciphertexts with the secret key
#[derive(Debug, Clone)]
pub struct Decryptor {
    ring: Arc<RingContext>,
    sk: SecretKey,
}

impl Decryptor {
    pub fn new(ring: Arc<RingContext>, sk: SecretKey) -> Self {
        Self { ring, sk }
    }

    /// c0 + c1·s at the ciphertext's level, in coefficient form
    pub fn decrypt(&self, ct: &Ciphertext) -> Plaintext {
        let limbs: Vec<usize> = (0..=ct.level()).collect();
        let s = self.sk.poly.select_limbs(&limbs);

        let c1 = self.ring.to_ntt_new(&ct.c1);
        let mut m = self.ring.to_ntt_new(&ct.c0);
        self.ring.mul_acc(&mut m, &c1, &s);
        self.ring.from_ntt(&mut m);

        Plaintext {
            poly: m,
            scale: ct.scale,
        }
    }
}
