//! Baby-step/giant-step evaluation of one transform on one ciphertext

use std::collections::BTreeMap;

use tracing::trace;

use super::transform::LinearTransform;
use crate::ckks::{Ciphertext, Evaluator};
use crate::error::{crypto_err, Result};
use crate::ks::EvaluationKeySet;

/// Computes `Σ_j rot_j( Σ_i pt_{j+i} ⊙ rot_i(ct) )` without rescaling.
///
/// The input is dropped to the transform's level first. The result is in
/// coefficient form at that level, with scale `ct.scale * q_level`.
pub fn evaluate(
    evaluator: &Evaluator,
    lt: &LinearTransform,
    ct: &Ciphertext,
    keys: &EvaluationKeySet,
) -> Result<Ciphertext> {
    if !lt.is_resident() {
        return Err(crypto_err!(
            "transform ({}, {}) has no resident diagonals",
            lt.block().row,
            lt.block().col
        ));
    }
    if ct.level() < lt.level() {
        return Err(crypto_err!(
            "input at level {} is below transform level {}",
            ct.level(),
            lt.level()
        ));
    }
    let ct = evaluator.drop_level(ct, lt.level())?;
    let index = lt.params().bsgs_index();

    // baby-step rotations are shared by every giant step
    let mut babies: BTreeMap<usize, Ciphertext> = BTreeMap::new();
    for baby in index.baby_steps() {
        let rotated = evaluator.rotate(&ct, baby as i64, keys)?;
        babies.insert(baby, evaluator.to_ntt(&rotated));
    }

    let mut out: Option<Ciphertext> = None;
    for (&giant, steps) in &index.steps {
        let mut inner = None;
        for baby in steps {
            let k = giant + baby;
            let pt = lt
                .diagonal(k)
                .ok_or_else(|| crypto_err!("transform has no diagonal {}", k))?;
            let rotated = babies
                .get(baby)
                .ok_or_else(|| crypto_err!("baby step {} was not computed", baby))?;
            evaluator.mul_plain_acc(&mut inner, rotated, pt)?;
        }
        let Some(inner) = inner else { continue };
        let term = evaluator.rotate(&inner, giant as i64, keys)?;
        trace!(giant, babies = steps.len(), "giant step done");
        match out.as_mut() {
            Some(acc) => evaluator.add_assign(acc, &term)?,
            None => out = Some(term),
        }
    }
    out.ok_or_else(|| crypto_err!("transform has no diagonals"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::ckks::{Decryptor, Encoder, Encryptor, KeyGenerator};
    use crate::lintrans::diagonals::{block_diagonals, group_values};
    use crate::lintrans::{BlockCoord, LinearTransformParams};
    use crate::math::{RingContext, Sampler};
    use crate::params::{CkksParameters, SchemeParams};

    fn check_matrix(log_bsgs_ratio: i32) {
        let ckks = CkksParameters::from_literal(&SchemeParams::insecure_test()).unwrap();
        let ring = Arc::new(RingContext::new(ckks.ring_dim(), ckks.q(), ckks.p()).unwrap());
        let mut sampler = Sampler::new(ckks.sigma(), Some(3));
        let keygen = KeyGenerator::new(ring.clone(), ckks.hamming_weight());
        let sk = keygen.gen_secret_key(&mut sampler);
        let pk = keygen.gen_public_key(&sk, &mut sampler);
        let encoder = Encoder::new(ring.clone());
        let encryptor = Encryptor::new(ring.clone(), pk);
        let decryptor = Decryptor::new(ring.clone(), sk.clone());
        let evaluator = Evaluator::new(&ckks, ring);

        let slots = ckks.slots();
        let matrix: Vec<Vec<f64>> = (0..slots)
            .map(|i| {
                (0..slots)
                    .map(|j| ((i * 7 + j * 3) % 11) as f64 / 11.0 - 0.5)
                    .collect()
            })
            .collect();
        let (indices, values) = block_diagonals(&matrix, slots).unwrap();
        let grouped = group_values(&indices, &values, slots).unwrap();

        let level = ckks.max_level();
        let params = LinearTransformParams {
            diagonal_indices: grouped.keys().copied().collect(),
            level,
            level_p: ckks.max_level_p(),
            scale: ckks.q_at(level) as f64,
            log_slots: ckks.log_slots(),
            log_bsgs_ratio,
        };
        let mut lt = LinearTransform::new(params, BlockCoord::default(), ckks.ring_dim());
        lt.encode(&encoder, &grouped).unwrap();

        let mut keys = EvaluationKeySet::new(None);
        for g in lt.galois_elements(&ckks) {
            keys.insert_galois(Arc::new(keygen.gen_galois_key(&sk, g, &mut sampler)));
        }

        let x: Vec<f64> = (0..slots).map(|i| ((i as f64) * 0.37).cos()).collect();
        let pt = encoder.encode(&x, level, ckks.default_scale()).unwrap();
        let ct = encryptor.encrypt(&pt, &mut sampler).unwrap();

        let out = evaluate(&evaluator, &lt, &ct, &keys).unwrap();
        assert_eq!(out.level(), level);
        let out = evaluator.rescale(&out).unwrap();
        assert_eq!(out.scale, ckks.default_scale());

        let y = encoder.decode(&decryptor.decrypt(&out));
        for i in 0..slots {
            let expected: f64 = (0..slots).map(|j| matrix[i][j] * x[j]).sum();
            assert!((y[i] - expected).abs() < 1e-3, "slot {}: {} vs {}", i, y[i], expected);
        }
    }

    #[test]
    fn test_bsgs_matches_cleartext_product() {
        check_matrix(1);
    }

    #[test]
    fn test_naive_matches_cleartext_product() {
        check_matrix(-1);
    }

    #[test]
    fn test_missing_key_is_crypto_error() {
        let ckks = CkksParameters::from_literal(&SchemeParams::insecure_test()).unwrap();
        let ring = Arc::new(RingContext::new(ckks.ring_dim(), ckks.q(), ckks.p()).unwrap());
        let mut sampler = Sampler::new(ckks.sigma(), Some(4));
        let keygen = KeyGenerator::new(ring.clone(), ckks.hamming_weight());
        let sk = keygen.gen_secret_key(&mut sampler);
        let pk = keygen.gen_public_key(&sk, &mut sampler);
        let encoder = Encoder::new(ring.clone());
        let encryptor = Encryptor::new(ring.clone(), pk);
        let evaluator = Evaluator::new(&ckks, ring);

        let slots = ckks.slots();
        let params = LinearTransformParams {
            diagonal_indices: vec![0, 1],
            level: 1,
            level_p: 0,
            scale: ckks.q_at(1) as f64,
            log_slots: ckks.log_slots(),
            log_bsgs_ratio: 0,
        };
        let mut lt = LinearTransform::new(params, BlockCoord::default(), ckks.ring_dim());
        let values: BTreeMap<usize, Vec<f64>> = [(0, vec![1.0; slots]), (1, vec![1.0; slots])].into();
        lt.encode(&encoder, &values).unwrap();

        let ct = encryptor
            .encrypt(&encoder.encode(&[1.0], 1, ckks.default_scale()).unwrap(), &mut sampler)
            .unwrap();
        let err = evaluate(&evaluator, &lt, &ct, &EvaluationKeySet::default()).unwrap_err();
        assert!(matches!(err, crate::EngineError::Crypto(_)));

        lt.clear_diagonals();
        assert!(evaluate(&evaluator, &lt, &ct, &EvaluationKeySet::default()).is_err());
    }
}
