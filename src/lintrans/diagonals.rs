//! Generalized diagonals of dense matrix blocks
//!
//! Diagonal k of a block M over `slots` slots is
//! `diag_k[i] = M[i][(i + k) mod slots]`, so that
//! `M·x = Σ_k diag_k ⊙ rot_k(x)` for an input zero-padded to `slots`.

use std::collections::BTreeMap;

use crate::error::{validation_err, Result};

/// Normalizes signed diagonal indices into [0, slots), rejecting duplicates
pub fn normalize_indices(indices: &[i64], slots: usize) -> Result<Vec<usize>> {
    if indices.is_empty() {
        return Err(validation_err!("no diagonal indices given"));
    }
    let mut seen = vec![false; slots];
    let mut out = Vec::with_capacity(indices.len());
    for &k in indices {
        let norm = k.rem_euclid(slots as i64) as usize;
        if seen[norm] {
            return Err(validation_err!(
                "diagonal index {} repeats diagonal {} modulo {} slots",
                k,
                norm,
                slots
            ));
        }
        seen[norm] = true;
        out.push(norm);
    }
    Ok(out)
}

/// Splits flat values into one `slots`-long vector per diagonal
pub fn group_values(indices: &[i64], values: &[f64], slots: usize) -> Result<BTreeMap<usize, Vec<f64>>> {
    let normalized = normalize_indices(indices, slots)?;
    if values.len() != normalized.len() * slots {
        return Err(validation_err!(
            "expected {} values for {} diagonals of {} slots, got {}",
            normalized.len() * slots,
            normalized.len(),
            slots,
            values.len()
        ));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(validation_err!(
            "diagonal {} holds non-finite value {} at slot {}",
            indices[pos / slots],
            values[pos],
            pos % slots
        ));
    }
    Ok(normalized
        .into_iter()
        .zip(values.chunks_exact(slots))
        .map(|(k, chunk)| (k, chunk.to_vec()))
        .collect())
}

/// Cyclic right rotation by `by` positions
pub fn rotate_right(values: &[f64], by: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    if !out.is_empty() {
        let by = by % out.len();
        out.rotate_right(by);
    }
    out
}

/// Non-zero generalized diagonals of a dense block.
///
/// Returns the diagonal indices and their values flattened in index order.
/// Rows and columns beyond the block are treated as zero.
pub fn block_diagonals(matrix: &[Vec<f64>], slots: usize) -> Result<(Vec<i64>, Vec<f64>)> {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Err(validation_err!("matrix block is empty"));
    }
    if rows > slots || cols > slots {
        return Err(validation_err!(
            "{}x{} block does not fit in {} slots",
            rows,
            cols,
            slots
        ));
    }
    if matrix.iter().any(|row| row.len() != cols) {
        return Err(validation_err!("matrix rows have different lengths"));
    }

    let mut indices = Vec::new();
    let mut values = Vec::new();
    for k in 0..slots {
        let diag: Vec<f64> = (0..slots)
            .map(|i| {
                let j = (i + k) % slots;
                if i < rows && j < cols {
                    matrix[i][j]
                } else {
                    0.0
                }
            })
            .collect();
        if diag.iter().any(|&v| v != 0.0) {
            indices.push(k as i64);
            values.extend(diag);
        }
    }
    if indices.is_empty() {
        // an all-zero block still needs one diagonal
        indices.push(0);
        values.extend(std::iter::repeat(0.0).take(slots));
    }
    Ok((indices, values))
}
