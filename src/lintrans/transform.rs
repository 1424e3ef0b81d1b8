//! Diagonal-decomposed linear transforms

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::diagonals::rotate_right;
use super::params::LinearTransformParams;
use crate::ckks::{Encoder, Plaintext};
use crate::error::{crypto_err, validation_err, Result};
use crate::params::CkksParameters;

/// Position of a transform in the block grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockCoord {
    pub row: usize,
    pub col: usize,
}

impl BlockCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A plaintext linear transform over the slots of one ciphertext.
///
/// Each diagonal is either resident (encoded data) or an empty placeholder
/// whose data lives in the artifact store. Diagonal `k = j + i` is stored
/// pre-rotated right by its giant step `j`.
#[derive(Clone, Debug)]
pub struct LinearTransform {
    params: LinearTransformParams,
    block: BlockCoord,
    ring_dim: usize,
    diagonals: BTreeMap<usize, Plaintext>,
}

impl LinearTransform {
    /// A transform whose diagonals are all placeholders
    pub fn new(params: LinearTransformParams, block: BlockCoord, ring_dim: usize) -> Self {
        let diagonals = params
            .diagonal_indices
            .iter()
            .map(|&k| (k, Plaintext::placeholder(ring_dim, params.scale)))
            .collect();
        Self {
            params,
            block,
            ring_dim,
            diagonals,
        }
    }

    pub fn params(&self) -> &LinearTransformParams {
        &self.params
    }

    pub fn block(&self) -> BlockCoord {
        self.block
    }

    pub fn level(&self) -> usize {
        self.params.level
    }

    /// Galois elements evaluation needs, ascending
    pub fn galois_elements(&self, ckks: &CkksParameters) -> Vec<u64> {
        let mut elements: Vec<u64> = self
            .params
            .rotations()
            .into_iter()
            .map(|r| ckks.galois_element(r as i64))
            .collect();
        elements.sort_unstable();
        elements.dedup();
        elements
    }

    /// Encode every diagonal from its cleartext values
    pub fn encode(&mut self, encoder: &Encoder, values: &BTreeMap<usize, Vec<f64>>) -> Result<()> {
        let index = self.params.bsgs_index();
        for (&giant, babies) in &index.steps {
            for &baby in babies {
                let k = giant + baby;
                let diag = values
                    .get(&k)
                    .ok_or_else(|| validation_err!("no values for diagonal {}", k))?;
                let pt = encoder.encode(&rotate_right(diag, giant), self.params.level, self.params.scale)?;
                self.diagonals.insert(k, pt);
            }
        }
        Ok(())
    }

    pub fn diagonal(&self, k: usize) -> Option<&Plaintext> {
        self.diagonals.get(&k)
    }

    /// Replace the placeholder for diagonal `k` with stored data
    pub fn set_diagonal(&mut self, k: usize, pt: Plaintext) -> Result<()> {
        let slot = self
            .diagonals
            .get_mut(&k)
            .ok_or_else(|| crypto_err!("transform has no diagonal {}", k))?;
        if pt.level() != self.params.level || pt.is_placeholder() {
            return Err(crypto_err!(
                "diagonal {} is at level {}, transform expects {}",
                k,
                pt.level(),
                self.params.level
            ));
        }
        *slot = pt;
        Ok(())
    }

    /// Diagonal indices with their current plaintexts
    pub fn diagonals(&self) -> impl Iterator<Item = (usize, &Plaintext)> {
        self.diagonals.iter().map(|(&k, pt)| (k, pt))
    }

    /// True when every diagonal holds data
    pub fn is_resident(&self) -> bool {
        self.diagonals.values().all(|pt| !pt.is_placeholder())
    }

    /// Release the encoded data, leaving placeholders
    pub fn clear_diagonals(&mut self) {
        for pt in self.diagonals.values_mut() {
            *pt = Plaintext::placeholder(self.ring_dim, self.params.scale);
        }
    }
}
