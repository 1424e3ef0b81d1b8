//! RNS-CKKS over Z[X]/(X^N + 1)
//!
//! Plaintexts carry real vectors packed into N/2 slots. Ciphertexts are
//! pairs (c0, c1) over the first l + 1 primes of the Q chain, where l is the
//! level. Each rescale divides by the last prime and drops one level.

mod enc;
mod encoder;
mod eval;
mod keygen;
mod types;

pub use enc::{Decryptor, Encryptor};
pub use encoder::Encoder;
pub use eval::Evaluator;
pub use keygen::KeyGenerator;
pub use types::{Ciphertext, Plaintext, PublicKey, SecretKey};
