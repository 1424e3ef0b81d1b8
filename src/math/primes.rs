//! NTT-friendly prime generation
//!
//! Primes for the RNS chains must satisfy p ≡ 1 (mod 2N) so that a primitive
//! 2N-th root of unity exists. Candidates are walked outward from 2^bits in
//! steps of 2N, alternating above and below, and never drift more than half
//! a bit away from the requested size.

use std::collections::BTreeMap;

use primality_test::is_prime;

use crate::error::{crypto_err, Result};

/// Walks NTT-friendly primes of one bit size, alternating upward and downward
pub struct NttPrimeGenerator {
    bits: f64,
    nth_root: u64,
    next_up: u64,
    next_down: u64,
    up_open: bool,
    down_open: bool,
}

impl NttPrimeGenerator {
    /// Creates a generator for primes near 2^bits congruent to 1 mod `nth_root`
    pub fn new(bits: u32, nth_root: u64) -> Self {
        let start = (1u64 << bits) + 1;
        // 2^bits + 1 is only congruent to 1 when the root order divides 2^bits
        let aligned = nth_root <= 1u64 << bits;
        Self {
            bits: bits as f64,
            nth_root,
            next_up: start,
            next_down: start.saturating_sub(nth_root),
            up_open: aligned,
            down_open: aligned && start > nth_root,
        }
    }

    /// Returns the next prime, or `None` once both directions are exhausted
    pub fn next_prime(&mut self) -> Option<u64> {
        while self.up_open || self.down_open {
            if self.up_open {
                let candidate = self.next_up;
                if (candidate as f64).log2() - self.bits >= 0.5
                    || candidate > u64::MAX - self.nth_root
                {
                    self.up_open = false;
                } else {
                    self.next_up += self.nth_root;
                    if is_prime(candidate) {
                        return Some(candidate);
                    }
                }
            }

            if self.down_open {
                let candidate = self.next_down;
                if candidate < self.nth_root || self.bits - (candidate as f64).log2() >= 0.5 {
                    self.down_open = false;
                } else {
                    self.next_down -= self.nth_root;
                    if is_prime(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }
}

/// Generates the Q and P chains for the given bit sizes.
///
/// Primes of equal size share one generator, so every prime across both
/// chains is distinct.
pub fn generate_chains(log_q: &[u32], log_p: &[u32], ring_dim: usize) -> Result<(Vec<u64>, Vec<u64>)> {
    let nth_root = 2 * ring_dim as u64;
    let mut generators: BTreeMap<u32, NttPrimeGenerator> = BTreeMap::new();

    let mut take = |bits: u32| -> Result<u64> {
        generators
            .entry(bits)
            .or_insert_with(|| NttPrimeGenerator::new(bits, nth_root))
            .next_prime()
            .ok_or_else(|| {
                crypto_err!(
                    "not enough {}-bit primes congruent to 1 mod {}",
                    bits,
                    nth_root
                )
            })
    };

    let q = log_q.iter().map(|&b| take(b)).collect::<Result<Vec<_>>>()?;
    let p = log_p.iter().map(|&b| take(b)).collect::<Result<Vec<_>>>()?;
    Ok((q, p))
}
