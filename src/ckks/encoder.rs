//! CKKS encode/decode via the canonical embedding.
//!
//! Encode: z ∈ R^slots → m(X) = round(Δ · σ^{-1}(z))
//! Decode: m(X) → z = Re(σ(m)) / Δ
//!
//! Real inputs go into the real parts of the complex slots. The special FFT
//! packs N/2 complex values into N real coefficients as
//! u_j = m_j + i·m_(j + N/2).

use std::sync::Arc;

use num_complex::Complex64;

use super::types::Plaintext;
use crate::error::{validation_err, Result};
use crate::math::{ModQ, RingContext, RnsPoly, SpecialFft};

/// CKKS encoder/decoder for a fixed ring.
#[derive(Debug, Clone)]
pub struct Encoder {
    ring: Arc<RingContext>,
    fft: SpecialFft,
}

impl Encoder {
    pub fn new(ring: Arc<RingContext>) -> Self {
        let fft = SpecialFft::new(ring.dimension() / 2);
        Self { ring, fft }
    }

    pub fn slots(&self) -> usize {
        self.fft.slots()
    }

    /// Encode real values at `level` with the given scale.
    ///
    /// Shorter inputs are zero-padded. The plaintext is returned in NTT form,
    /// ready for multiplication.
    pub fn encode(&self, values: &[f64], level: usize, scale: f64) -> Result<Plaintext> {
        let slots = self.slots();
        if values.len() > slots {
            return Err(validation_err!(
                "{} values exceed the slot count {}",
                values.len(),
                slots
            ));
        }
        if level > self.ring.max_level() {
            return Err(validation_err!(
                "level {} exceeds the maximum level {}",
                level,
                self.ring.max_level()
            ));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(validation_err!("scale must be positive, got {}", scale));
        }

        let mut packed = vec![Complex64::new(0.0, 0.0); slots];
        for (slot, &v) in packed.iter_mut().zip(values) {
            *slot = Complex64::new(v, 0.0);
        }
        self.fft.inverse(&mut packed);

        let n = self.ring.dimension();
        let mut coeffs = vec![0i128; n];
        for (j, u) in packed.iter().enumerate() {
            coeffs[j] = (u.re * scale).round() as i128;
            coeffs[j + slots] = (u.im * scale).round() as i128;
        }

        let moduli = self.ring.q_moduli(level);
        let limbs = moduli
            .iter()
            .map(|&q| coeffs.iter().map(|&c| ModQ::from_i128(c, q)).collect())
            .collect();
        let mut poly = RnsPoly::from_limbs(limbs, moduli.to_vec(), false);
        self.ring.to_ntt(&mut poly);

        Ok(Plaintext { poly, scale })
    }

    /// Decode the slots of a plaintext from its first limb
    pub fn decode(&self, pt: &Plaintext) -> Vec<f64> {
        let poly = self.ring.from_ntt_new(&pt.poly);
        if poly.num_limbs() == 0 {
            return vec![0.0; self.slots()];
        }
        let q = poly.moduli()[0];
        let limb = poly.limb(0);
        let slots = self.slots();

        let mut packed: Vec<Complex64> = (0..slots)
            .map(|j| {
                Complex64::new(
                    ModQ::to_signed(limb[j], q) as f64 / pt.scale,
                    ModQ::to_signed(limb[j + slots], q) as f64 / pt.scale,
                )
            })
            .collect();
        self.fft.forward(&mut packed);
        packed.into_iter().map(|z| z.re).collect()
    }
}
