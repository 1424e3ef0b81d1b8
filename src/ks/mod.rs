//! Key-switching module
//!
//! Hybrid key switching with one digit per Q prime and a special modulus
//! P = Πp_j. A switching key from s' to s holds, for each digit i,
//! ```text
//! K[i] = (-a_i·s + e_i + P·[i == j]·s' mod q_j,  a_i)   over Q ∪ P
//! ```
//! Switching multiplies each lifted digit of the input into K[i], sums, and
//! divides by P. Galois keys (s' = τ_g(s)) drive rotations and the
//! relinearization key (s' = s²) drives ciphertext products.

mod keyset;
mod setup;
mod switch;

pub use keyset::EvaluationKeySet;
pub use setup::{
    generate_galois_key, generate_relinearization_key, generate_switching_key, GaloisKey,
    RelinearizationKey, SwitchingKey, SwitchingRow,
};
pub use switch::key_switch;
