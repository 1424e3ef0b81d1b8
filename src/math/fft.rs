//! Special FFT for the CKKS canonical embedding.
//!
//! Slot j of a plaintext holds the evaluation m(ζ^(5^j)) with ζ = e^(2πi/2N).
//! Ordering slots along powers of 5 makes the automorphism X -> X^5 act as a
//! cyclic left shift by one slot, which is what rotations rely on.
//!
//! [`SpecialFft::forward`] maps packed coefficients to slot values and
//! [`SpecialFft::inverse`] maps slot values back to packed coefficients.

use std::f64::consts::PI;

use num_complex::Complex64;

/// Twiddle tables for a fixed slot count.
#[derive(Debug, Clone)]
pub struct SpecialFft {
    /// Number of slots (N/2).
    slots: usize,
    /// Order of the root of unity (2N).
    m: usize,
    /// 5^j mod 2N for j < slots.
    rot_group: Vec<usize>,
    /// e^(2πik/2N) for k in 0..=2N.
    roots: Vec<Complex64>,
}

impl SpecialFft {
    pub fn new(slots: usize) -> Self {
        let m = 4 * slots;
        let mut rot_group = Vec::with_capacity(slots);
        let mut g = 1usize;
        for _ in 0..slots {
            rot_group.push(g);
            g = g * 5 % m;
        }
        let roots = (0..=m)
            .map(|k| Complex64::from_polar(1.0, 2.0 * PI * k as f64 / m as f64))
            .collect();
        Self {
            slots,
            m,
            rot_group,
            roots,
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Packed coefficients to slot values, in place
    pub fn forward(&self, vals: &mut [Complex64]) {
        debug_assert_eq!(vals.len(), self.slots);
        bit_reverse(vals);
        let mut len = 2;
        while len <= self.slots {
            let lenh = len >> 1;
            let lenq = len << 2;
            let gap = self.m / lenq;
            for i in (0..self.slots).step_by(len) {
                for j in 0..lenh {
                    let idx = (self.rot_group[j] % lenq) * gap;
                    let u = vals[i + j];
                    let v = vals[i + j + lenh] * self.roots[idx];
                    vals[i + j] = u + v;
                    vals[i + j + lenh] = u - v;
                }
            }
            len <<= 1;
        }
    }

    /// Slot values to packed coefficients, in place
    pub fn inverse(&self, vals: &mut [Complex64]) {
        debug_assert_eq!(vals.len(), self.slots);
        let mut len = self.slots;
        while len >= 2 {
            let lenh = len >> 1;
            let lenq = len << 2;
            let gap = self.m / lenq;
            for i in (0..self.slots).step_by(len) {
                for j in 0..lenh {
                    let idx = (lenq - (self.rot_group[j] % lenq)) * gap;
                    let u = vals[i + j] + vals[i + j + lenh];
                    let v = (vals[i + j] - vals[i + j + lenh]) * self.roots[idx];
                    vals[i + j] = u;
                    vals[i + j + lenh] = v;
                }
            }
            len >>= 1;
        }
        bit_reverse(vals);
        let inv = 1.0 / self.slots as f64;
        for v in vals.iter_mut() {
            *v *= inv;
        }
    }
}

fn bit_reverse<T>(vals: &mut [T]) {
    let n = vals.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            vals.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_then_forward_is_identity() {
        let fft = SpecialFft::new(16);
        let original: Vec<Complex64> = (0..16)
            .map(|i| Complex64::new(i as f64 * 0.25 - 1.0, (i % 3) as f64))
            .collect();
        let mut vals = original.clone();
        fft.inverse(&mut vals);
        fft.forward(&mut vals);
        for (a, b) in vals.iter().zip(&original) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_forward_evaluates_at_rotation_group() {
        // Packed coefficients u_j = m_j + i m_(j + slots) for a real polynomial m
        let slots = 8;
        let n = 2 * slots;
        let coeffs: Vec<f64> = (0..n).map(|k| ((k * 7) % 5) as f64 - 2.0).collect();
        let mut packed: Vec<Complex64> = (0..slots)
            .map(|j| Complex64::new(coeffs[j], coeffs[j + slots]))
            .collect();
        let fft = SpecialFft::new(slots);
        fft.forward(&mut packed);

        let m = 2 * n;
        let mut g = 1usize;
        for slot in packed.iter() {
            let zeta = Complex64::from_polar(1.0, 2.0 * PI * g as f64 / m as f64);
            let direct: Complex64 = coeffs
                .iter()
                .enumerate()
                .map(|(k, &c)| zeta.powu(k as u32) * c)
                .sum();
            assert!((slot - direct).norm() < 1e-9, "{} vs {}", slot, direct);
            g = g * 5 % m;
        }
    }
}
