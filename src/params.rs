//! Parameter sets for the CKKS scheme
//!
//! [`SchemeParams`] is the literal form supplied by a host or a JSON config.
//! [`CkksParameters`] is the derived form with concrete prime chains, built
//! once per scheme context.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{validation_err, EngineError, Result};
use crate::math::ntt::mod_pow;
use crate::math::primes::generate_chains;

/// Default Gaussian standard deviation for error terms
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Smallest and largest prime sizes accepted in a modulus chain
const MIN_PRIME_BITS: u32 = 20;
const MAX_PRIME_BITS: u32 = 61;

/// Ring over which the scheme operates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RingType {
    /// Z[X]/(X^N + 1) with N/2 slots
    #[default]
    Standard,
    /// Real-slot variant with 2^log_n slots.
    ///
    /// Emulated on a standard ring of dimension 2^(log_n + 1) holding real
    /// inputs, which gives the same slot count and real-valued semantics.
    ConjugateInvariant,
}

impl FromStr for RingType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(RingType::Standard),
            "conjugate-invariant" | "conjugateinvariant" => Ok(RingType::ConjugateInvariant),
            other => Err(validation_err!("unknown ring type {:?}", other)),
        }
    }
}

impl fmt::Display for RingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingType::Standard => write!(f, "standard"),
            RingType::ConjugateInvariant => write!(f, "conjugate-invariant"),
        }
    }
}

/// Artifact handling policy, chosen per call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    /// Everything stays in memory, nothing is persisted
    #[default]
    None,
    /// Generate once, persist to disk, then free the in-memory copy
    Save,
    /// Never generate; stream artifacts from disk for each use
    Load,
}

impl IoMode {
    /// True when diagonals and keys live on disk rather than in memory
    pub fn is_persistent(self) -> bool {
        !matches!(self, IoMode::None)
    }
}

impl FromStr for IoMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(IoMode::None),
            "save" => Ok(IoMode::Save),
            "load" => Ok(IoMode::Load),
            other => Err(validation_err!("unknown io mode {:?}", other)),
        }
    }
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoMode::None => write!(f, "none"),
            IoMode::Save => write!(f, "save"),
            IoMode::Load => write!(f, "load"),
        }
    }
}

fn default_sigma() -> f64 {
    DEFAULT_SIGMA
}

/// Literal scheme parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeParams {
    /// log2 of the ring dimension
    pub log_n: u32,

    /// Bit sizes of the ciphertext modulus chain q_0..q_L
    pub log_q: Vec<u32>,

    /// Bit sizes of the auxiliary key-switching primes
    pub log_p: Vec<u32>,

    /// log2 of the default encoding scale
    pub log_scale: u32,

    /// Number of non-zero coefficients of the ternary secret
    pub hamming_weight: usize,

    #[serde(default)]
    pub ring_type: RingType,

    #[serde(default = "default_sigma")]
    pub sigma: f64,

    /// Deterministic seed for key and noise sampling; fresh entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SchemeParams {
    /// Small, insecure parameters for tests: N = 64, 32 slots, three levels
    pub fn insecure_test() -> Self {
        Self {
            log_n: 6,
            log_q: vec![55, 40, 40],
            log_p: vec![61],
            log_scale: 40,
            hamming_weight: 16,
            ring_type: RingType::Standard,
            sigma: DEFAULT_SIGMA,
            seed: Some(0x5eed),
        }
    }

    /// Internal ring dimension
    pub fn ring_dim(&self) -> usize {
        match self.ring_type {
            RingType::Standard => 1 << self.log_n,
            RingType::ConjugateInvariant => 1 << (self.log_n + 1),
        }
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        if !(3..=16).contains(&self.log_n) {
            return Err(validation_err!("log_n must lie in [3, 16], got {}", self.log_n));
        }
        if self.log_q.is_empty() {
            return Err(validation_err!("log_q must name at least one prime"));
        }
        if self.log_p.is_empty() {
            return Err(validation_err!("log_p must name at least one prime"));
        }
        for &bits in self.log_q.iter().chain(self.log_p.iter()) {
            if !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(&bits) {
                return Err(validation_err!(
                    "prime size {} outside [{}, {}]",
                    bits,
                    MIN_PRIME_BITS,
                    MAX_PRIME_BITS
                ));
            }
        }
        if self.log_scale == 0 || self.log_scale >= MAX_PRIME_BITS {
            return Err(validation_err!("log_scale must lie in [1, 60], got {}", self.log_scale));
        }
        if self.hamming_weight == 0 || self.hamming_weight > self.ring_dim() {
            return Err(validation_err!(
                "hamming weight {} outside [1, {}]",
                self.hamming_weight,
                self.ring_dim()
            ));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(validation_err!("sigma must be positive, got {}", self.sigma));
        }
        Ok(())
    }
}

/// Derived CKKS parameters with concrete prime chains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CkksParameters {
    ring_type: RingType,
    ring_dim: usize,
    q: Vec<u64>,
    p: Vec<u64>,
    log_scale: u32,
    hamming_weight: usize,
    sigma: f64,
}

impl CkksParameters {
    /// Validates a literal and generates its prime chains
    pub fn from_literal(literal: &SchemeParams) -> Result<Self> {
        literal.validate()?;
        let ring_dim = literal.ring_dim();
        let (q, p) = generate_chains(&literal.log_q, &literal.log_p, ring_dim)?;
        Ok(Self {
            ring_type: literal.ring_type,
            ring_dim,
            q,
            p,
            log_scale: literal.log_scale,
            hamming_weight: literal.hamming_weight,
            sigma: literal.sigma,
        })
    }

    pub fn ring_type(&self) -> RingType {
        self.ring_type
    }

    /// Internal ring dimension N
    pub fn ring_dim(&self) -> usize {
        self.ring_dim
    }

    /// Number of plaintext slots
    pub fn slots(&self) -> usize {
        self.ring_dim / 2
    }

    pub fn log_slots(&self) -> u32 {
        self.slots().trailing_zeros()
    }

    /// Highest ciphertext level
    pub fn max_level(&self) -> usize {
        self.q.len() - 1
    }

    /// Index of the last auxiliary prime
    pub fn max_level_p(&self) -> usize {
        self.p.len() - 1
    }

    pub fn q(&self) -> &[u64] {
        &self.q
    }

    pub fn p(&self) -> &[u64] {
        &self.p
    }

    /// Prime at the given level of the Q chain
    pub fn q_at(&self, level: usize) -> u64 {
        self.q[level]
    }

    /// Default encoding scale 2^log_scale
    pub fn default_scale(&self) -> f64 {
        (self.log_scale as f64).exp2()
    }

    pub fn hamming_weight(&self) -> usize {
        self.hamming_weight
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Galois element 5^k mod 2N for a left rotation by `k` slots
    pub fn galois_element(&self, k: i64) -> u64 {
        let slots = self.slots() as i64;
        let k = k.rem_euclid(slots) as u64;
        mod_pow(5, k, 2 * self.ring_dim as u64)
    }

    /// Galois elements for rotations 1, 2, 4, ... below the slot count
    pub fn power_of_two_galois_elements(&self) -> Vec<u64> {
        let mut elements = Vec::new();
        let mut k = 1usize;
        while k < self.slots() {
            elements.push(self.galois_element(k as i64));
            k <<= 1;
        }
        elements
    }
}
