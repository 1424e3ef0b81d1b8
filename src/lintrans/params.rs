//! Linear-transform parameters and the baby-step/giant-step split
//!
//! A transform over `slots` slots with non-zero diagonals K is evaluated as
//! ```text
//! Σ_j rot_j( Σ_i pt_{j+i} ⊙ rot_i(ct) )
//! ```
//! where every k ∈ K is split into a giant step j (a multiple of N1) and a
//! baby step i < N1. The split N1 trades the number of distinct rotations
//! (and so rotation keys) against the number of rotations performed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{validation_err, Result};

/// Parameters fixed when a transform is built
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearTransformParams {
    /// Non-zero diagonal indices in [0, slots), ascending
    pub diagonal_indices: Vec<usize>,
    /// Ciphertext level the transform is encoded for
    pub level: usize,
    /// Index of the last auxiliary prime used when switching keys
    pub level_p: usize,
    /// Scale of the encoded diagonals (q_level)
    pub scale: f64,
    pub log_slots: u32,
    /// log2 of the maximum giant/baby ratio; negative disables BSGS
    pub log_bsgs_ratio: i32,
}

impl LinearTransformParams {
    pub fn slots(&self) -> usize {
        1 << self.log_slots
    }

    /// Baby-step size N1 for these parameters
    pub fn n1(&self) -> usize {
        if self.log_bsgs_ratio < 0 {
            self.slots()
        } else {
            find_best_bsgs_split(&self.diagonal_indices, self.slots(), self.log_bsgs_ratio)
        }
    }

    /// Giant/baby decomposition of the diagonal set
    pub fn bsgs_index(&self) -> BsgsIndex {
        BsgsIndex::new(&self.diagonal_indices, self.slots(), self.n1())
    }

    /// Non-zero rotation amounts evaluation will perform, ascending
    pub fn rotations(&self) -> Vec<usize> {
        let index = self.bsgs_index();
        index
            .giant_steps()
            .chain(index.baby_steps())
            .filter(|&r| r != 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Decomposition of diagonal indices into giant steps and baby steps
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BsgsIndex {
    /// Giant step j -> sorted baby steps i with j + i a diagonal index
    pub steps: BTreeMap<usize, Vec<usize>>,
    babies: BTreeSet<usize>,
}

impl BsgsIndex {
    pub fn new(diagonals: &[usize], slots: usize, n1: usize) -> Self {
        let mask = slots - 1;
        let mut steps: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut babies = BTreeSet::new();
        for &k in diagonals {
            let k = k & mask;
            let giant = ((k / n1) * n1) & mask;
            let baby = k & (n1 - 1);
            steps.entry(giant).or_default().push(baby);
            babies.insert(baby);
        }
        for list in steps.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        Self { steps, babies }
    }

    pub fn giant_steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.keys().copied()
    }

    pub fn baby_steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.babies.iter().copied()
    }

    fn counts(&self) -> (usize, usize) {
        (self.steps.len(), self.babies.len())
    }
}

/// Largest N1 whose baby/giant rotation ratio stays within 2^log_max_ratio.
///
/// N1 doubles from 1; the first split whose ratio meets the bound exactly
/// wins, and the first one exceeding it falls back to the previous N1.
pub fn find_best_bsgs_split(diagonals: &[usize], slots: usize, log_max_ratio: i32) -> usize {
    let max_ratio = (log_max_ratio as f64).exp2();
    let mut n1 = 1;
    while n1 < slots {
        let (giants, babies) = BsgsIndex::new(diagonals, slots, n1).counts();
        let ratio = (babies as f64 - 1.0) / (giants as f64 - 1.0);
        if ratio == max_ratio {
            return n1;
        }
        if ratio > max_ratio {
            return n1 / 2;
        }
        n1 <<= 1;
    }
    1
}

/// log2 of a baby-step/giant-step ratio that must be an integer power of two
pub fn log2_ratio(ratio: f64) -> Result<i32> {
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(validation_err!("bsgs ratio must be positive and finite, got {}", ratio));
    }
    let log = ratio.log2();
    if log.fract() != 0.0 || log.abs() > 62.0 {
        return Err(validation_err!("bsgs ratio {} is not an integer power of two", ratio));
    }
    Ok(log as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(diagonals: Vec<usize>, log_ratio: i32) -> LinearTransformParams {
        LinearTransformParams {
            diagonal_indices: diagonals,
            level: 1,
            level_p: 0,
            scale: 1.0,
            log_slots: 5,
            log_bsgs_ratio: log_ratio,
        }
    }

    #[test]
    fn test_bsgs_index_reassembles_diagonals() {
        let diagonals: Vec<usize> = vec![0, 1, 2, 5, 9, 17, 30];
        let index = BsgsIndex::new(&diagonals, 32, 4);
        let mut rebuilt: Vec<usize> = index
            .steps
            .iter()
            .flat_map(|(&j, babies)| babies.iter().map(move |&i| j + i))
            .collect();
        rebuilt.sort_unstable();
        assert_eq!(rebuilt, diagonals);
        assert!(index.giant_steps().all(|j| j % 4 == 0));
        assert!(index.baby_steps().all(|i| i < 4));
    }

    #[test]
    fn test_split_for_dense_band() {
        // Band 0..8: n1 = 2 gives 4 giants, 2 babies; n1 = 4 gives 2 giants, 4 babies
        let diagonals: Vec<usize> = (0..8).collect();
        assert_eq!(find_best_bsgs_split(&diagonals, 32, 1), 2);
        assert_eq!(find_best_bsgs_split(&diagonals, 32, 0), 2);
    }

    #[test]
    fn test_single_diagonal_needs_no_rotation() {
        let p = params(vec![0], 1);
        assert_eq!(p.n1(), 1);
        assert!(p.rotations().is_empty());
    }

    #[test]
    fn test_negative_ratio_is_naive() {
        let p = params(vec![0, 3, 7], -1);
        assert_eq!(p.n1(), 32);
        assert_eq!(p.rotations(), vec![3, 7]);
    }

    #[test]
    fn test_rotations_are_deterministic() {
        let p = params((0..32).collect(), 1);
        assert_eq!(p.rotations(), p.clone().rotations());
        // every rotation is a proper shift
        assert!(p.rotations().iter().all(|&r| r > 0 && r < 32));
    }

    #[test]
    fn test_log2_ratio() {
        assert_eq!(log2_ratio(1.0).unwrap(), 0);
        assert_eq!(log2_ratio(4.0).unwrap(), 2);
        assert_eq!(log2_ratio(0.5).unwrap(), -1);
        assert!(log2_ratio(3.0).is_err());
        assert!(log2_ratio(0.0).is_err());
        assert!(log2_ratio(f64::NAN).is_err());
    }
}
