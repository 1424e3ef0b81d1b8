//! Homomorphic evaluation
//!
//! Every operation takes its keys from an explicit [`EvaluationKeySet`];
//! the evaluator itself holds no key material.

use std::sync::Arc;

use super::types::{Ciphertext, Plaintext};
use crate::error::{crypto_err, Result};
use crate::ks::{key_switch, EvaluationKeySet};
use crate::math::{RingContext, RnsPoly};
use crate::params::CkksParameters;

/// Relative tolerance when comparing scales of operands
const SCALE_TOLERANCE: f64 = 1e-9;

fn scales_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= SCALE_TOLERANCE * a.abs().max(b.abs())
}

/// Stateless CKKS evaluator bound to a ring
#[derive(Debug, Clone)]
pub struct Evaluator {
    ring: Arc<RingContext>,
    slots: usize,
    /// Order of the Galois group modulus (2N).
    two_n: u64,
}

impl Evaluator {
    pub fn new(params: &CkksParameters, ring: Arc<RingContext>) -> Self {
        Self {
            slots: params.slots(),
            two_n: 2 * params.ring_dim() as u64,
            ring,
        }
    }

    pub fn ring(&self) -> &RingContext {
        &self.ring
    }

    /// Galois element 5^k mod 2N for a left rotation by `k` slots
    pub fn galois_element(&self, k: i64) -> u64 {
        let k = k.rem_euclid(self.slots as i64) as u64;
        crate::math::ntt::mod_pow(5, k, self.two_n)
    }

    /// Copy of `poly` in the requested domain
    fn in_domain(&self, poly: &RnsPoly, ntt: bool) -> RnsPoly {
        if ntt {
            self.ring.to_ntt_new(poly)
        } else {
            self.ring.from_ntt_new(poly)
        }
    }

    fn check_same_shape(&self, a: &Ciphertext, b: &Ciphertext) -> Result<()> {
        if a.level() != b.level() {
            return Err(crypto_err!("level mismatch: {} vs {}", a.level(), b.level()));
        }
        if !scales_match(a.scale, b.scale) {
            return Err(crypto_err!("scale mismatch: {} vs {}", a.scale, b.scale));
        }
        Ok(())
    }

    /// acc += ct, in the domain of `acc`
    pub fn add_assign(&self, acc: &mut Ciphertext, ct: &Ciphertext) -> Result<()> {
        self.check_same_shape(acc, ct)?;
        if acc.is_ntt() == ct.is_ntt() {
            acc.c0 += &ct.c0;
            acc.c1 += &ct.c1;
        } else {
            acc.c0 += &self.in_domain(&ct.c0, acc.is_ntt());
            acc.c1 += &self.in_domain(&ct.c1, acc.is_ntt());
        }
        Ok(())
    }

    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        let mut out = a.clone();
        self.add_assign(&mut out, b)?;
        Ok(out)
    }

    /// ct + pt; the plaintext must share the ciphertext's level and scale
    pub fn add_plain(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        if pt.is_placeholder() {
            return Err(crypto_err!("plaintext holds no data"));
        }
        if pt.level() != ct.level() {
            return Err(crypto_err!("level mismatch: {} vs {}", ct.level(), pt.level()));
        }
        if !scales_match(ct.scale, pt.scale) {
            return Err(crypto_err!("scale mismatch: {} vs {}", ct.scale, pt.scale));
        }
        let mut out = ct.clone();
        out.c0 += &self.in_domain(&pt.poly, ct.is_ntt());
        Ok(out)
    }

    /// acc += ct ⊙ pt in the NTT domain, without rescaling.
    ///
    /// `ct` must already be in NTT form. When `acc` is `None` it is
    /// initialized with the product.
    pub fn mul_plain_acc(&self, acc: &mut Option<Ciphertext>, ct: &Ciphertext, pt: &Plaintext) -> Result<()> {
        if pt.is_placeholder() {
            return Err(crypto_err!("plaintext holds no data"));
        }
        if !ct.is_ntt() {
            return Err(crypto_err!("plaintext product needs an NTT-form ciphertext"));
        }
        if pt.level() != ct.level() {
            return Err(crypto_err!("level mismatch: {} vs {}", ct.level(), pt.level()));
        }
        let pt_poly = self.in_domain(&pt.poly, true);
        let scale = ct.scale * pt.scale;

        match acc {
            Some(acc) => {
                if acc.level() != ct.level() || !scales_match(acc.scale, scale) {
                    return Err(crypto_err!("accumulator does not match the product"));
                }
                self.ring.mul_acc(&mut acc.c0, &ct.c0, &pt_poly);
                self.ring.mul_acc(&mut acc.c1, &ct.c1, &pt_poly);
            }
            None => {
                *acc = Some(Ciphertext::from_parts(
                    self.ring.mul(&ct.c0, &pt_poly),
                    self.ring.mul(&ct.c1, &pt_poly),
                    scale,
                ));
            }
        }
        Ok(())
    }

    /// ct ⊙ pt, without rescaling; the result is in NTT form
    pub fn mul_plain(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        let ct = self.to_ntt(ct);
        let mut acc = None;
        self.mul_plain_acc(&mut acc, &ct, pt)?;
        acc.ok_or_else(|| crypto_err!("empty product"))
    }

    pub fn to_ntt(&self, ct: &Ciphertext) -> Ciphertext {
        Ciphertext::from_parts(
            self.ring.to_ntt_new(&ct.c0),
            self.ring.to_ntt_new(&ct.c1),
            ct.scale,
        )
    }

    pub fn from_ntt(&self, ct: &Ciphertext) -> Ciphertext {
        Ciphertext::from_parts(
            self.ring.from_ntt_new(&ct.c0),
            self.ring.from_ntt_new(&ct.c1),
            ct.scale,
        )
    }

    /// Divide by the last prime of the ciphertext's level, dropping one level
    pub fn rescale(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        let level = ct.level();
        if level == 0 {
            return Err(crypto_err!("cannot rescale a ciphertext at level 0"));
        }
        let q_last = ct.c0.moduli()[level];
        let mut out = self.from_ntt(ct);
        self.ring.divide_round_by_last(&mut out.c0)?;
        self.ring.divide_round_by_last(&mut out.c1)?;
        out.scale /= q_last as f64;
        Ok(out)
    }

    /// Discard limbs above `level`; the scale is unchanged
    pub fn drop_level(&self, ct: &Ciphertext, level: usize) -> Result<Ciphertext> {
        if level > ct.level() {
            return Err(crypto_err!(
                "cannot raise a ciphertext from level {} to {}",
                ct.level(),
                level
            ));
        }
        let mut out = ct.clone();
        out.c0.truncate(level + 1);
        out.c1.truncate(level + 1);
        Ok(out)
    }

    /// Apply X -> X^g and switch back to the secret key; coefficient form out
    pub fn apply_galois(&self, ct: &Ciphertext, galois_element: u64, keys: &EvaluationKeySet) -> Result<Ciphertext> {
        if galois_element == 1 {
            return Ok(self.from_ntt(ct));
        }
        let key = keys
            .galois_key(galois_element)
            .ok_or_else(|| crypto_err!("missing galois key for element {}", galois_element))?;

        let ct = self.from_ntt(ct);
        let c0 = self.ring.automorphism(&ct.c0, galois_element);
        let c1 = self.ring.automorphism(&ct.c1, galois_element);

        let (d0, d1) = key_switch(&self.ring, &c1, &key.key)?;
        let mut out0 = c0;
        out0 += &d0;
        Ok(Ciphertext::from_parts(out0, d1, ct.scale))
    }

    /// Rotate slots left by `k`
    pub fn rotate(&self, ct: &Ciphertext, k: i64, keys: &EvaluationKeySet) -> Result<Ciphertext> {
        self.apply_galois(ct, self.galois_element(k), keys)
    }

    /// Ciphertext product with relinearization, without rescaling
    pub fn mul_relin(&self, a: &Ciphertext, b: &Ciphertext, keys: &EvaluationKeySet) -> Result<Ciphertext> {
        if a.level() != b.level() {
            return Err(crypto_err!("level mismatch: {} vs {}", a.level(), b.level()));
        }
        let rlk = keys
            .relinearization_key()
            .ok_or_else(|| crypto_err!("missing relinearization key"))?;

        let a = self.to_ntt(a);
        let b = self.to_ntt(b);
        let mut d0 = self.ring.mul(&a.c0, &b.c0);
        let mut d1 = self.ring.mul(&a.c0, &b.c1);
        self.ring.mul_acc(&mut d1, &a.c1, &b.c0);
        let mut d2 = self.ring.mul(&a.c1, &b.c1);

        self.ring.from_ntt(&mut d0);
        self.ring.from_ntt(&mut d1);
        self.ring.from_ntt(&mut d2);
        let (k0, k1) = key_switch(&self.ring, &d2, &rlk.key)?;
        d0 += &k0;
        d1 += &k1;
        Ok(Ciphertext::from_parts(d0, d1, a.scale * b.scale))
    }
}
