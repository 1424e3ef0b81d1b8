//! ckks-lintrans: blocked linear transforms over RNS-CKKS ciphertexts
//!
//! This crate evaluates tiled matrix-vector products on encrypted vectors:
//!
//! Key components:
//! - Diagonal decomposition of matrix blocks with baby-step/giant-step rotations
//! - Rotation-key lifecycle with in-memory, save-to-disk and load-from-disk modes
//! - A keyed artifact store for encoded diagonals and key material
//! - Blocked evaluation with one deferred rescale per output row
//! - A compact RNS-CKKS layer (encoding, encryption, key switching, rescale)

pub mod ckks;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod keys;
pub mod ks;
pub mod lintrans;
pub mod math;
pub mod params;
pub mod polynomial;
pub mod scheme;
pub mod store;

pub use ckks::{Ciphertext, Plaintext};
pub use config::EngineConfig;
pub use engine::{
    ArtifactPaths, CiphertextHandle, Engine, PlaintextHandle, PolynomialHandle, TransformHandle,
};
pub use error::{EngineError, Result};
pub use handle::{Handle, HandleAllocator};
pub use lintrans::{diagonals::block_diagonals, BlockDiagonals, LinearTransform};
pub use params::{IoMode, RingType, SchemeParams};
pub use polynomial::Polynomial;
