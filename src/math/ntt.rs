//! Number-Theoretic Transform (NTT) for negacyclic polynomial multiplication.
//!
//! One [`NttTable`] serves one prime of an RNS chain. It implements the
//! Cooley-Tukey forward and Gentleman-Sande inverse transforms over
//! Z_q[X]/(X^n + 1) using a primitive 2n-th root of unity ψ (ψ^n = -1).
//!
//! Values in the NTT domain are kept in Montgomery form. Addition and
//! subtraction are unaffected by that, and a pointwise Montgomery product of
//! two Montgomery values is again in Montgomery form, so the domain is closed
//! under every ring operation the scheme needs.

use crate::error::{crypto_err, Result};

/// Precomputed NTT tables for a single prime.
#[derive(Clone, Debug)]
pub struct NttTable {
    /// Ring dimension (power of two).
    n: usize,
    q: u64,
    /// -q^(-1) mod 2^64
    q_inv_neg: u64,
    /// 2^128 mod q
    r_squared: u64,
    /// Forward twiddle factors (powers of ψ) in bit-reversed order.
    psi_powers: Vec<u64>,
    /// Inverse twiddle factors (powers of ψ^(-1)).
    psi_inv_powers: Vec<u64>,
    /// n^(-1) mod q in Montgomery form.
    n_inv: u64,
}

impl NttTable {
    /// Creates tables for dimension `n` and prime `q`.
    ///
    /// `q` must be below 2^63 and satisfy q ≡ 1 (mod 2n).
    pub fn new(n: usize, q: u64) -> Result<Self> {
        if !n.is_power_of_two() || n < 2 {
            return Err(crypto_err!("ntt dimension {} is not a power of two", n));
        }
        if q >> 63 != 0 || q % (2 * n as u64) != 1 {
            return Err(crypto_err!("modulus {} does not support a negacyclic ntt of size {}", q, n));
        }

        let q_inv_neg = Self::compute_q_inv_neg(q);
        let r_squared = Self::compute_r_squared(q);

        let psi = Self::find_primitive_root(2 * n as u64, q)
            .ok_or_else(|| crypto_err!("no primitive {}-th root of unity modulo {}", 2 * n, q))?;
        let psi_mont = Self::to_montgomery(psi, q, r_squared, q_inv_neg);
        let psi_powers = Self::compute_twiddle_factors(n, psi_mont, q, q_inv_neg, r_squared);

        let psi_inv = mod_pow(psi, q - 2, q);
        let psi_inv_mont = Self::to_montgomery(psi_inv, q, r_squared, q_inv_neg);
        let psi_inv_powers = Self::compute_twiddle_factors(n, psi_inv_mont, q, q_inv_neg, r_squared);

        let n_inv = Self::to_montgomery(mod_pow(n as u64, q - 2, q), q, r_squared, q_inv_neg);

        Ok(Self {
            n,
            q,
            q_inv_neg,
            r_squared,
            psi_powers,
            psi_inv_powers,
            n_inv,
        })
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Forward NTT in place; the output is in Montgomery form.
    pub fn forward(&self, coeffs: &mut [u64]) {
        debug_assert_eq!(coeffs.len(), self.n);
        for c in coeffs.iter_mut() {
            *c = Self::to_montgomery(*c, self.q, self.r_squared, self.q_inv_neg);
        }

        let n = self.n;
        let q = self.q;
        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = self.psi_powers[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = self.montgomery_mul(coeffs[j + t], w);
                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    /// Inverse NTT in place; the output leaves Montgomery form.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        debug_assert_eq!(coeffs.len(), self.n);
        let q = self.q;
        let mut t = 1;
        let mut m = self.n;
        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j1 = i * 2 * t;
                let w = self.psi_inv_powers[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.montgomery_mul(diff, w);
                }
            }
            t <<= 1;
        }

        // n^(-1) scaling and the Montgomery exit collapse into one product each
        for c in coeffs.iter_mut() {
            let scaled = self.montgomery_mul(*c, self.n_inv);
            *c = self.montgomery_mul(scaled, 1);
        }
    }

    /// Pointwise product of two NTT-domain values.
    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.montgomery_mul(a, b)
    }

    /// Converts a standard residue into Montgomery form.
    #[inline]
    pub fn to_mont(&self, a: u64) -> u64 {
        Self::to_montgomery(a, self.q, self.r_squared, self.q_inv_neg)
    }

    #[inline]
    fn montgomery_mul(&self, a: u64, b: u64) -> u64 {
        let q = self.q;
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(self.q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (r_squared as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    /// Primitive `order`-th root of unity modulo q, for a power-of-two order
    fn find_primitive_root(order: u64, q: u64) -> Option<u64> {
        let exp = (q - 1) / order;
        (2..q.min(1 << 20))
            .map(|g| mod_pow(g, exp, q))
            .find(|&c| mod_pow(c, order / 2, q) == q - 1)
    }

    /// Twiddle factors in the bit-reversed order the butterflies consume
    fn compute_twiddle_factors(n: usize, psi: u64, q: u64, q_inv_neg: u64, r_squared: u64) -> Vec<u64> {
        let mont = |a: u64, b: u64| -> u64 {
            let ab = (a as u128) * (b as u128);
            let mm = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
            let t = ((ab + mm * (q as u128)) >> 64) as u64;
            if t >= q {
                t - q
            } else {
                t
            }
        };

        let mut factors = vec![0u64; n];
        let one = Self::to_montgomery(1, q, r_squared, q_inv_neg);
        if n > 1 {
            factors[1] = one;
        }
        for m in 1..n {
            if m.is_power_of_two() {
                // ψ^(n / 2m)
                let mut pow = one;
                for _ in 0..n / (2 * m) {
                    pow = mont(pow, psi);
                }
                factors[m] = pow;
            } else {
                let prev_idx = m & (m - 1);
                let step_idx = m & m.wrapping_neg();
                factors[m] = mont(factors[prev_idx], factors[step_idx]);
            }
        }
        factors
    }
}

/// Modular exponentiation by squaring
pub fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1u64 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = ((result as u128 * base as u128) % m as u128) as u64;
        }
        exp >>= 1;
        base = ((base as u128 * base as u128) % m as u128) as u64;
    }
    result
}
