//! Persistent artifact stores
//!
//! Diagonals and rotation keys that do not fit in memory are written to a
//! keyed blob store and brought back one block at a time.

mod artifacts;
mod blob;

pub use artifacts::{DiagonalStore, KeyStore};
pub use blob::BlobStore;
