//! Mathematical primitives for RNS-CKKS.
//!
//! - **Modular arithmetic** over word-sized primes
//! - **Prime generation** for NTT-friendly RNS chains
//! - **Number-Theoretic Transform (NTT)** for negacyclic multiplication
//! - **RNS polynomials** and the ring context holding their NTT tables
//! - **Special FFT** for the canonical embedding
//! - **Sampling** of secrets, ephemeral keys and errors

pub mod fft;
pub mod modular;
pub mod ntt;
pub mod primes;
pub mod rns;
pub mod sampling;

pub use fft::SpecialFft;
pub use modular::ModQ;
pub use ntt::NttTable;
pub use rns::{RingContext, RnsPoly};
pub use sampling::Sampler;
