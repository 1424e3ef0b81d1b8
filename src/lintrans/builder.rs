//! Validation of block diagonals into transform parameters

use std::collections::BTreeMap;

use super::diagonals::group_values;
use super::params::{log2_ratio, LinearTransformParams};
use super::transform::{BlockCoord, LinearTransform};
use crate::error::{validation_err, Result};
use crate::params::CkksParameters;

/// Cleartext description of one block of a tiled matrix
#[derive(Clone, Copy, Debug)]
pub struct BlockDiagonals<'a> {
    /// Diagonal indices; negative values are taken modulo the slot count
    pub indices: &'a [i64],
    /// `indices.len() * slots` values, one run of `slots` per index
    pub values: &'a [f64],
    pub level: usize,
    /// Maximum giant/baby ratio; a power of two, below 1 for naive evaluation
    pub bsgs_ratio: f64,
    pub block_row: usize,
    pub block_col: usize,
}

/// Output of [`prepare`]: the placeholder transform and its grouped values
#[derive(Debug)]
pub struct PreparedTransform {
    pub transform: LinearTransform,
    pub values: BTreeMap<usize, Vec<f64>>,
}

/// Check a block against the scheme and derive its transform.
///
/// Nothing is encoded and no keys or files are touched, so a failure
/// here leaves every store as it was.
pub fn prepare(ckks: &CkksParameters, block: &BlockDiagonals<'_>) -> Result<PreparedTransform> {
    let slots = ckks.slots();
    let values = group_values(block.indices, block.values, slots)?;

    if block.level == 0 || block.level > ckks.max_level() {
        return Err(validation_err!(
            "transform level {} outside 1..={}",
            block.level,
            ckks.max_level()
        ));
    }
    let log_bsgs_ratio = log2_ratio(block.bsgs_ratio)?;

    let params = LinearTransformParams {
        diagonal_indices: values.keys().copied().collect(),
        level: block.level,
        level_p: ckks.max_level_p(),
        scale: ckks.q_at(block.level) as f64,
        log_slots: ckks.log_slots(),
        log_bsgs_ratio,
    };
    let transform = LinearTransform::new(
        params,
        BlockCoord::new(block.block_row, block.block_col),
        ckks.ring_dim(),
    );
    Ok(PreparedTransform { transform, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SchemeParams;

    fn ckks() -> CkksParameters {
        CkksParameters::from_literal(&SchemeParams::insecure_test()).unwrap()
    }

    fn block<'a>(indices: &'a [i64], values: &'a [f64], level: usize, ratio: f64) -> BlockDiagonals<'a> {
        BlockDiagonals {
            indices,
            values,
            level,
            bsgs_ratio: ratio,
            block_row: 1,
            block_col: 2,
        }
    }

    #[test]
    fn test_prepare_derives_params() {
        let ckks = ckks();
        let values = vec![0.5; 2 * ckks.slots()];
        let prepared = prepare(&ckks, &block(&[3, -1], &values, 2, 2.0)).unwrap();
        let lt = &prepared.transform;
        assert_eq!(lt.params().diagonal_indices, vec![3, ckks.slots() - 1]);
        assert_eq!(lt.params().scale, ckks.q_at(2) as f64);
        assert_eq!(lt.params().log_bsgs_ratio, 1);
        assert_eq!(lt.block(), BlockCoord::new(1, 2));
        assert!(!lt.is_resident());
    }

    #[test]
    fn test_prepare_rejects_bad_input() {
        let ckks = ckks();
        let slots = ckks.slots();
        let one = vec![1.0; slots];
        let two = vec![1.0; 2 * slots];

        assert!(prepare(&ckks, &block(&[], &[], 1, 1.0)).is_err());
        assert!(prepare(&ckks, &block(&[0, 32], &two, 1, 1.0)).is_err());
        assert!(prepare(&ckks, &block(&[0], &two, 1, 1.0)).is_err());
        assert!(prepare(&ckks, &block(&[0], &one, 0, 1.0)).is_err());
        assert!(prepare(&ckks, &block(&[0], &one, 3, 1.0)).is_err());
        assert!(prepare(&ckks, &block(&[0], &one, 1, 3.0)).is_err());
        assert!(prepare(&ckks, &block(&[0], &one, 1, -2.0)).is_err());
        assert!(prepare(&ckks, &block(&[0], &one, 1, 0.5)).is_ok());

        let mut nan = one.clone();
        nan[3] = f64::NAN;
        assert!(prepare(&ckks, &block(&[0], &nan, 1, 1.0)).is_err());
    }
}
