//! Polynomials in the power basis, evaluated on ciphertexts with Horner's rule

use serde::{Deserialize, Serialize};

use crate::ckks::{Ciphertext, Encoder, Evaluator};
use crate::error::{crypto_err, validation_err, Result};
use crate::ks::EvaluationKeySet;

/// p(x) = Σ coeffs[i]·x^i
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn new(coeffs: Vec<f64>) -> Result<Self> {
        if coeffs.len() < 2 {
            return Err(validation_err!("polynomial needs degree at least 1"));
        }
        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(validation_err!("polynomial coefficients must be finite"));
        }
        Ok(Self { coeffs })
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Cleartext evaluation
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    /// Evaluate slot-wise on `ct`, consuming `degree` levels.
    pub fn evaluate(
        &self,
        evaluator: &Evaluator,
        encoder: &Encoder,
        ct: &Ciphertext,
        keys: &EvaluationKeySet,
    ) -> Result<Ciphertext> {
        let degree = self.degree();
        if ct.level() < degree {
            return Err(crypto_err!(
                "degree {} polynomial needs level {}, input is at {}",
                degree,
                degree,
                ct.level()
            ));
        }
        let slots = encoder.slots();
        let constant = |c: f64, level: usize, scale: f64| encoder.encode(&vec![c; slots], level, scale);

        // leading coefficient: plaintext product at scale q_level keeps the input scale
        let level = ct.level();
        let q_level = ct.c0.moduli()[level] as f64;
        let lead = constant(self.coeffs[degree], level, q_level)?;
        let mut acc = evaluator.rescale(&evaluator.mul_plain(ct, &lead)?)?;
        acc = evaluator.add_plain(&acc, &constant(self.coeffs[degree - 1], acc.level(), acc.scale)?)?;

        for &c in self.coeffs[..degree - 1].iter().rev() {
            let x = evaluator.drop_level(ct, acc.level())?;
            acc = evaluator.rescale(&evaluator.mul_relin(&acc, &x, keys)?)?;
            acc = evaluator.add_plain(&acc, &constant(c, acc.level(), acc.scale)?)?;
        }
        Ok(acc)
    }
}
