//! Polynomials in residue number system form and the ring they live in.
//!
//! An [`RnsPoly`] holds one limb of N residues per prime. Limbs are ordered
//! q_0..q_l, optionally followed by the auxiliary primes p_0..p_k used during
//! key switching. The [`RingContext`] owns the NTT tables for every prime of
//! both chains and implements the operations that need them.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::modular::ModQ;
use super::ntt::NttTable;
use crate::error::{crypto_err, Result};

/// Polynomial in R_Q = Z_Q[X]/(X^N + 1) stored limb by limb.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RnsPoly {
    /// Ring dimension N.
    n: usize,
    /// Modulus of each limb.
    moduli: Vec<u64>,
    /// One vector of N residues per modulus.
    limbs: Vec<Vec<u64>>,
    /// Whether limbs hold NTT-domain (Montgomery) values.
    is_ntt: bool,
}

impl RnsPoly {
    /// Create zero polynomial over the given moduli
    pub fn zero(n: usize, moduli: &[u64], is_ntt: bool) -> Self {
        Self {
            n,
            moduli: moduli.to_vec(),
            limbs: vec![vec![0; n]; moduli.len()],
            is_ntt,
        }
    }

    /// Reduce signed integer coefficients into every modulus
    pub fn from_signed(coeffs: &[i64], moduli: &[u64]) -> Self {
        let limbs = moduli
            .iter()
            .map(|&q| coeffs.iter().map(|&c| ModQ::from_signed(c, q)).collect())
            .collect();
        Self {
            n: coeffs.len(),
            moduli: moduli.to_vec(),
            limbs,
            is_ntt: false,
        }
    }

    /// Build from raw limbs
    pub fn from_limbs(limbs: Vec<Vec<u64>>, moduli: Vec<u64>, is_ntt: bool) -> Self {
        let n = limbs.first().map_or(0, Vec::len);
        Self {
            n,
            moduli,
            limbs,
            is_ntt,
        }
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    pub fn num_limbs(&self) -> usize {
        self.limbs.len()
    }

    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Mark the limbs as NTT-domain values without transforming them
    pub fn force_ntt_domain(&mut self) {
        self.is_ntt = true;
    }

    pub fn limb(&self, i: usize) -> &[u64] {
        &self.limbs[i]
    }

    pub fn limb_mut(&mut self, i: usize) -> &mut [u64] {
        &mut self.limbs[i]
    }

    /// Keep only the first `count` limbs
    pub fn truncate(&mut self, count: usize) {
        self.limbs.truncate(count);
        self.moduli.truncate(count);
    }

    /// Copy of the limbs at the given indices, in order
    pub fn select_limbs(&self, indices: &[usize]) -> Self {
        Self {
            n: self.n,
            moduli: indices.iter().map(|&i| self.moduli[i]).collect(),
            limbs: indices.iter().map(|&i| self.limbs[i].clone()).collect(),
            is_ntt: self.is_ntt,
        }
    }

    /// True when both operands share dimension, moduli and domain
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.n == other.n && self.moduli == other.moduli && self.is_ntt == other.is_ntt
    }

    /// Multiply every limb by an integer constant given per modulus
    pub fn mul_scalar_assign(&mut self, scalars: &[u64]) {
        for ((limb, &q), &s) in self.limbs.iter_mut().zip(&self.moduli).zip(scalars) {
            for c in limb.iter_mut() {
                *c = ModQ::mul(*c, s, q);
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|limb| limb.iter().all(|&c| c == 0))
    }
}

impl AddAssign<&RnsPoly> for RnsPoly {
    fn add_assign(&mut self, rhs: &RnsPoly) {
        debug_assert!(self.is_compatible(rhs), "Polynomial layouts must match");
        for ((a, b), &q) in self.limbs.iter_mut().zip(&rhs.limbs).zip(&rhs.moduli) {
            for (x, &y) in a.iter_mut().zip(b) {
                *x = ModQ::add(*x, y, q);
            }
        }
    }
}

impl SubAssign<&RnsPoly> for RnsPoly {
    fn sub_assign(&mut self, rhs: &RnsPoly) {
        debug_assert!(self.is_compatible(rhs), "Polynomial layouts must match");
        for ((a, b), &q) in self.limbs.iter_mut().zip(&rhs.limbs).zip(&rhs.moduli) {
            for (x, &y) in a.iter_mut().zip(b) {
                *x = ModQ::sub(*x, y, q);
            }
        }
    }
}

impl Add for &RnsPoly {
    type Output = RnsPoly;

    fn add(self, rhs: Self) -> RnsPoly {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Sub for &RnsPoly {
    type Output = RnsPoly;

    fn sub(self, rhs: Self) -> RnsPoly {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl Neg for &RnsPoly {
    type Output = RnsPoly;

    fn neg(self) -> RnsPoly {
        let mut out = self.clone();
        for (limb, &q) in out.limbs.iter_mut().zip(&self.moduli) {
            for c in limb.iter_mut() {
                *c = ModQ::negate(*c, q);
            }
        }
        out
    }
}

/// NTT tables and constants for the Q and P chains
#[derive(Clone, Debug)]
pub struct RingContext {
    n: usize,
    q: Vec<u64>,
    p: Vec<u64>,
    tables: BTreeMap<u64, NttTable>,
}

impl RingContext {
    /// Builds tables for every prime of both chains
    pub fn new(n: usize, q: &[u64], p: &[u64]) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for &m in q.iter().chain(p) {
            if tables.insert(m, NttTable::new(n, m)?).is_some() {
                return Err(crypto_err!("modulus {} appears twice in the chains", m));
            }
        }
        Ok(Self {
            n,
            q: q.to_vec(),
            p: p.to_vec(),
            tables,
        })
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn max_level(&self) -> usize {
        self.q.len() - 1
    }

    /// Moduli q_0..q_level
    pub fn q_moduli(&self, level: usize) -> &[u64] {
        &self.q[..=level]
    }

    pub fn p_moduli(&self) -> &[u64] {
        &self.p
    }

    /// Moduli q_0..q_level followed by every auxiliary prime
    pub fn qp_moduli(&self, level: usize) -> Vec<u64> {
        self.q[..=level].iter().chain(&self.p).copied().collect()
    }

    /// Limb indices of a full Q∪P polynomial that make up level `level`
    pub fn qp_limb_indices(&self, level: usize) -> Vec<usize> {
        (0..=level).chain(self.q.len()..self.q.len() + self.p.len()).collect()
    }

    /// Product of the auxiliary primes reduced modulo `q`
    pub fn p_mod(&self, q: u64) -> u64 {
        self.p.iter().fold(1u64, |acc, &p| ModQ::mul(acc, p % q, q))
    }

    fn table(&self, q: u64) -> &NttTable {
        &self.tables[&q]
    }

    pub fn to_ntt(&self, poly: &mut RnsPoly) {
        if poly.is_ntt {
            return;
        }
        for (limb, &q) in poly.limbs.iter_mut().zip(&poly.moduli) {
            self.table(q).forward(limb);
        }
        poly.is_ntt = true;
    }

    pub fn from_ntt(&self, poly: &mut RnsPoly) {
        if !poly.is_ntt {
            return;
        }
        for (limb, &q) in poly.limbs.iter_mut().zip(&poly.moduli) {
            self.table(q).inverse(limb);
        }
        poly.is_ntt = false;
    }

    pub fn to_ntt_new(&self, poly: &RnsPoly) -> RnsPoly {
        let mut out = poly.clone();
        self.to_ntt(&mut out);
        out
    }

    pub fn from_ntt_new(&self, poly: &RnsPoly) -> RnsPoly {
        let mut out = poly.clone();
        self.from_ntt(&mut out);
        out
    }

    /// Pointwise product of two NTT-domain polynomials over the same moduli
    pub fn mul(&self, a: &RnsPoly, b: &RnsPoly) -> RnsPoly {
        let mut out = RnsPoly::zero(a.n, &a.moduli, true);
        self.mul_acc(&mut out, a, b);
        out
    }

    /// acc += a * b in the NTT domain.
    ///
    /// `b` may carry more limbs than `acc`; `b_limbs[i]` names the limb of `b`
    /// paired with limb `i` of `acc` when given.
    pub fn mul_acc_mapped(&self, acc: &mut RnsPoly, a: &RnsPoly, b: &RnsPoly, b_limbs: Option<&[usize]>) {
        debug_assert!(acc.is_ntt && a.is_ntt && b.is_ntt);
        for (i, (limb, &q)) in acc.limbs.iter_mut().zip(&acc.moduli).enumerate() {
            let table = self.table(q);
            let bi = b_limbs.map_or(i, |idx| idx[i]);
            for ((x, &y), &z) in limb.iter_mut().zip(&a.limbs[i]).zip(&b.limbs[bi]) {
                *x = ModQ::add(*x, table.mul(y, z), q);
            }
        }
    }

    /// acc += a * b in the NTT domain over identical moduli
    pub fn mul_acc(&self, acc: &mut RnsPoly, a: &RnsPoly, b: &RnsPoly) {
        self.mul_acc_mapped(acc, a, b, None);
    }

    /// Divide a coefficient-domain polynomial by its last modulus with rounding.
    ///
    /// c_i' = (c_i - [c_last]) * q_last^(-1) mod q_i, where [c_last] is the
    /// centered residue. The last limb is dropped.
    pub fn divide_round_by_last(&self, poly: &mut RnsPoly) -> Result<()> {
        if poly.is_ntt {
            return Err(crypto_err!("rounding division needs coefficient form"));
        }
        if poly.limbs.len() < 2 {
            return Err(crypto_err!("cannot divide a single-limb polynomial"));
        }
        let (last_q, last) = match (poly.moduli.pop(), poly.limbs.pop()) {
            (Some(q), Some(limb)) => (q, limb),
            _ => return Err(crypto_err!("polynomial has no limbs")),
        };
        for (limb, &q) in poly.limbs.iter_mut().zip(&poly.moduli) {
            let inv = ModQ::inverse(last_q % q, q)
                .ok_or_else(|| crypto_err!("{} is not invertible modulo {}", last_q, q))?;
            for (c, &r) in limb.iter_mut().zip(&last) {
                let centered = ModQ::from_signed(ModQ::to_signed(r, last_q), q);
                *c = ModQ::mul(ModQ::sub(*c, centered, q), inv, q);
            }
        }
        Ok(())
    }

    /// Divide a Q_l∪P polynomial by P with rounding, leaving it over Q_l
    pub fn mod_down(&self, poly: &mut RnsPoly) -> Result<()> {
        for _ in 0..self.p.len() {
            self.divide_round_by_last(poly)?;
        }
        Ok(())
    }

    /// Lift limb `i` of a coefficient-domain polynomial to its centered
    /// representative and reduce it into each of `moduli`
    pub fn lift_limb(&self, poly: &RnsPoly, i: usize, moduli: &[u64]) -> RnsPoly {
        let qi = poly.moduli[i];
        let centered: Vec<i64> = poly.limbs[i].iter().map(|&c| ModQ::to_signed(c, qi)).collect();
        RnsPoly::from_signed(&centered, moduli)
    }

    /// Apply X -> X^g to a coefficient-domain polynomial
    pub fn automorphism(&self, poly: &RnsPoly, g: u64) -> RnsPoly {
        let n = poly.n;
        let two_n = 2 * n as u64;
        let mut out = RnsPoly::zero(n, &poly.moduli, false);
        for ((src, dst), &q) in poly.limbs.iter().zip(out.limbs.iter_mut()).zip(&poly.moduli) {
            for (i, &c) in src.iter().enumerate() {
                let idx = ((g as u128 * i as u128) % two_n as u128) as usize;
                if idx < n {
                    dst[idx] = ModQ::add(dst[idx], c, q);
                } else {
                    dst[idx - n] = ModQ::sub(dst[idx - n], c, q);
                }
            }
        }
        out
    }
}
