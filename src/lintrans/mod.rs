//! Diagonal-decomposed linear transforms over CKKS slots
//!
//! A block of a tiled matrix is described by its generalized diagonals,
//! encoded once per block and evaluated with baby-step/giant-step rotations.

pub mod builder;
pub mod diagonals;
pub mod eval;
pub mod params;
mod transform;

pub use builder::{prepare, BlockDiagonals, PreparedTransform};
pub use eval::evaluate;
pub use params::{BsgsIndex, LinearTransformParams};
pub use transform::{BlockCoord, LinearTransform};
