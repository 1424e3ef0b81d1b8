//! End-to-end linear-transform tests with in-memory artifacts
//!
//! Encrypt → Build transforms → Evaluate grid → Decrypt ≈ M·x

use std::path::Path;

use ckks_lintrans::{
    block_diagonals, ArtifactPaths, BlockDiagonals, CiphertextHandle, Engine, IoMode, SchemeParams,
};

const LEVEL: usize = 2;

fn engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .create_scheme(&SchemeParams::insecure_test(), Path::new("keys-unused"), IoMode::None)
        .unwrap();
    engine
}

fn test_matrix(rows: usize, cols: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|i| {
            (0..cols)
                .map(|j| (((i * 13 + j * 5) % 17) as f64 / 17.0 - 0.5) * 0.5)
                .collect()
        })
        .collect()
}

fn test_vector(len: usize) -> Vec<f64> {
    (0..len).map(|i| ((i as f64) * 0.61).sin()).collect()
}

fn mat_vec(matrix: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(x).map(|(m, v)| m * v).sum())
        .collect()
}

fn sub_block(matrix: &[Vec<f64>], row: usize, col: usize, size: usize) -> Vec<Vec<f64>> {
    matrix[row * size..(row + 1) * size]
        .iter()
        .map(|r| r[col * size..(col + 1) * size].to_vec())
        .collect()
}

fn encrypt(engine: &mut Engine, values: &[f64]) -> CiphertextHandle {
    let pt = engine.encode(values, LEVEL).unwrap();
    engine.encrypt(pt).unwrap()
}

fn decrypt(engine: &mut Engine, ct: CiphertextHandle) -> Vec<f64> {
    let pt = engine.decrypt(ct).unwrap();
    engine.decode(pt).unwrap()
}

fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < tol, "slot {}: {} vs {}", i, a, e);
    }
}

#[test]
fn test_identity_transform() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let values = vec![1.0; slots];
    let block = BlockDiagonals {
        indices: &[0],
        values: &values,
        level: LEVEL,
        bsgs_ratio: 2.0,
        block_row: 0,
        block_col: 0,
    };
    let paths = ArtifactPaths::default();
    let lt = engine.build_linear_transform(&block, "identity", &paths, IoMode::None).unwrap();

    let x = test_vector(slots);
    let ct = encrypt(&mut engine, &x);
    let out = engine
        .evaluate_linear_transforms(&[lt], &[ct], "identity", &paths, IoMode::None)
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_close(&decrypt(&mut engine, out[0]), &x, 1e-4);
}

#[test]
fn test_dense_matrix_single_block() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let matrix = test_matrix(slots, slots);
    let (indices, values) = block_diagonals(&matrix, slots).unwrap();

    let paths = ArtifactPaths::default();
    for ratio in [0.5, 1.0, 4.0] {
        let block = BlockDiagonals {
            indices: &indices,
            values: &values,
            level: LEVEL,
            bsgs_ratio: ratio,
            block_row: 0,
            block_col: 0,
        };
        let lt = engine.build_linear_transform(&block, "dense", &paths, IoMode::None).unwrap();
        let x = test_vector(slots);
        let ct = encrypt(&mut engine, &x);
        let out = engine
            .evaluate_linear_transforms(&[lt], &[ct], "dense", &paths, IoMode::None)
            .unwrap();
        assert_close(&decrypt(&mut engine, out[0]), &mat_vec(&matrix, &x), 1e-3);
    }
}

#[test]
fn test_blocked_matches_unblocked() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let half = slots / 2;
    let matrix = test_matrix(slots, slots);
    let x = test_vector(slots);
    let expected = mat_vec(&matrix, &x);
    let paths = ArtifactPaths::default();

    // 2x2 grid of half-size blocks, inputs zero-padded to the slot count
    let mut transforms = Vec::new();
    for row in 0..2 {
        for col in 0..2 {
            let (indices, values) = block_diagonals(&sub_block(&matrix, row, col, half), slots).unwrap();
            let block = BlockDiagonals {
                indices: &indices,
                values: &values,
                level: LEVEL,
                bsgs_ratio: 2.0,
                block_row: row,
                block_col: col,
            };
            transforms.push(engine.build_linear_transform(&block, "tiled", &paths, IoMode::None).unwrap());
        }
    }
    let inputs: Vec<CiphertextHandle> = (0..2)
        .map(|col| encrypt(&mut engine, &x[col * half..(col + 1) * half]))
        .collect();

    let out = engine
        .evaluate_linear_transforms(&transforms, &inputs, "tiled", &paths, IoMode::None)
        .unwrap();
    assert_eq!(out.len(), 2);
    for (row, &ct) in out.iter().enumerate() {
        let y = decrypt(&mut engine, ct);
        assert_close(&y[..half], &expected[row * half..(row + 1) * half], 1e-3);
        assert_close(&y[half..], &vec![0.0; half], 1e-3);
    }
}

#[test]
fn test_one_rescale_per_row() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let scale = engine.scheme().unwrap().params().default_scale();
    let paths = ArtifactPaths::default();
    let values = vec![0.5; 2 * slots];

    for cols in [1usize, 2, 3] {
        let mut transforms = Vec::new();
        for col in 0..cols {
            let block = BlockDiagonals {
                indices: &[0, 1],
                values: &values,
                level: LEVEL,
                bsgs_ratio: 1.0,
                block_row: 0,
                block_col: col,
            };
            transforms.push(engine.build_linear_transform(&block, "rows", &paths, IoMode::None).unwrap());
        }
        let inputs: Vec<CiphertextHandle> = (0..cols).map(|_| encrypt(&mut engine, &[1.0])).collect();
        let out = engine
            .evaluate_linear_transforms(&transforms, &inputs, "rows", &paths, IoMode::None)
            .unwrap();
        let ct = engine.ciphertext(out[0]).unwrap();
        assert_eq!(ct.level(), LEVEL - 1, "{} columns", cols);
        assert_eq!(ct.scale, scale);
    }
}

#[test]
fn test_input_above_transform_level_is_dropped() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let values = vec![2.0; slots];
    let block = BlockDiagonals {
        indices: &[0],
        values: &values,
        level: 1,
        bsgs_ratio: 1.0,
        block_row: 0,
        block_col: 0,
    };
    let paths = ArtifactPaths::default();
    let lt = engine.build_linear_transform(&block, "m", &paths, IoMode::None).unwrap();

    let high = encrypt(&mut engine, &[0.25]);
    let out = engine
        .evaluate_linear_transforms(&[lt], &[high], "m", &paths, IoMode::None)
        .unwrap();
    assert_eq!(engine.ciphertext(out[0]).unwrap().level(), 0);
    assert!((decrypt(&mut engine, out[0])[0] - 0.5).abs() < 1e-4);

    // an input below the transform level cannot be raised
    let pt = engine.encode(&[0.25], 0).unwrap();
    let low = engine.encrypt(pt).unwrap();
    let live_before = engine.live_ciphertexts();
    assert!(engine
        .evaluate_linear_transforms(&[lt], &[low], "m", &paths, IoMode::None)
        .is_err());
    assert_eq!(engine.live_ciphertexts(), live_before);
}

#[test]
fn test_keys_generated_once() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let matrix = test_matrix(slots, slots);
    let (indices, values) = block_diagonals(&matrix, slots).unwrap();
    let block = BlockDiagonals {
        indices: &indices,
        values: &values,
        level: LEVEL,
        bsgs_ratio: 2.0,
        block_row: 0,
        block_col: 0,
    };
    let paths = ArtifactPaths::default();

    let before = engine.live_galois_elements();
    let first = engine.build_linear_transform(&block, "m", &paths, IoMode::None).unwrap();
    let after_first = engine.live_galois_elements();
    assert!(after_first.len() >= before.len());
    assert!(before.iter().all(|g| after_first.contains(g)));

    engine.build_linear_transform(&block, "m", &paths, IoMode::None).unwrap();
    assert_eq!(engine.live_galois_elements(), after_first);

    let required = engine
        .linear_transform(first)
        .unwrap()
        .galois_elements(engine.scheme().unwrap().params());
    assert!(required.iter().all(|g| after_first.contains(g)));
}

#[test]
fn test_destroy_invalidates_handles() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let values = vec![1.0; slots];
    let block = BlockDiagonals {
        indices: &[0],
        values: &values,
        level: 1,
        bsgs_ratio: 1.0,
        block_row: 0,
        block_col: 0,
    };
    let paths = ArtifactPaths::default();
    let lt = engine.build_linear_transform(&block, "m", &paths, IoMode::None).unwrap();
    let ct = encrypt(&mut engine, &[1.0]);
    let poly = engine.create_polynomial(&[0.0, 1.0]).unwrap();

    engine.destroy_scheme();
    assert!(!engine.has_scheme());
    assert!(engine.live_galois_elements().is_empty());
    assert!(engine.ciphertext(ct).unwrap_err().is_not_found());
    assert!(engine.linear_transform(lt).unwrap_err().is_not_found());
    assert!(engine.live_polynomials().is_empty());

    // a fresh scheme reuses index 0, but the old handles stay dead
    engine
        .create_scheme(&SchemeParams::insecure_test(), Path::new("keys-unused"), IoMode::None)
        .unwrap();
    let fresh = encrypt(&mut engine, &[1.0]);
    assert_eq!(fresh.index(), ct.index());
    assert!(engine.ciphertext(ct).unwrap_err().is_not_found());
    assert!(engine.ciphertext(fresh).is_ok());
    assert!(engine.evaluate_polynomial(poly, fresh).unwrap_err().is_not_found());
}

#[test]
fn test_polynomial_evaluation() {
    let mut engine = engine();
    let slots = engine.scheme().unwrap().slots();
    let coeffs = [0.1, 0.5, -0.25];
    let poly = engine.create_polynomial(&coeffs).unwrap();

    let x: Vec<f64> = (0..slots).map(|i| i as f64 / slots as f64 - 0.5).collect();
    let ct = encrypt(&mut engine, &x);
    let out = engine.evaluate_polynomial(poly, ct).unwrap();
    assert_eq!(engine.ciphertext(out).unwrap().level(), LEVEL - 2);

    let expected: Vec<f64> = x.iter().map(|v| coeffs[0] + coeffs[1] * v + coeffs[2] * v * v).collect();
    assert_close(&decrypt(&mut engine, out), &expected, 1e-3);

    engine.delete_polynomial(poly);
    assert!(engine.evaluate_polynomial(poly, ct).unwrap_err().is_not_found());
}
