//! Scheme context: parameters, keys and the CKKS workers built from them

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::ckks::{Ciphertext, Decryptor, Encoder, Encryptor, Evaluator, KeyGenerator, Plaintext, PublicKey, SecretKey};
use crate::error::Result;
use crate::ks::{EvaluationKeySet, GaloisKey, RelinearizationKey};
use crate::math::{RingContext, Sampler};
use crate::params::{CkksParameters, IoMode, SchemeParams};
use crate::store::KeyStore;

/// Everything derived from one set of scheme parameters and one secret key
#[derive(Debug)]
pub struct Scheme {
    params: CkksParameters,
    ring: Arc<RingContext>,
    sampler: Sampler,
    keygen: KeyGenerator,
    sk: SecretKey,
    pk: PublicKey,
    relin: Arc<RelinearizationKey>,
    encoder: Encoder,
    encryptor: Encryptor,
    decryptor: Decryptor,
    evaluator: Evaluator,
}

impl Scheme {
    /// Build a scheme, obtaining the secret key according to `io_mode`.
    ///
    /// `none` generates a key, `save` generates one and writes it to a fresh
    /// key store at `keys_path`, `load` reads it from that store.
    pub fn new(literal: &SchemeParams, keys_path: &Path, io_mode: IoMode) -> Result<Self> {
        let params = CkksParameters::from_literal(literal)?;
        let ring = Arc::new(RingContext::new(params.ring_dim(), params.q(), params.p())?);
        let mut sampler = Sampler::new(params.sigma(), literal.seed);
        let keygen = KeyGenerator::new(ring.clone(), params.hamming_weight());

        let sk = match io_mode {
            IoMode::None => keygen.gen_secret_key(&mut sampler),
            IoMode::Save => {
                let sk = keygen.gen_secret_key(&mut sampler);
                KeyStore::create(keys_path)?.save_secret_key(&sk)?;
                sk
            }
            IoMode::Load => {
                let sk = KeyStore::open(keys_path)?.load_secret_key()?;
                keygen.check_secret_key(&sk)?;
                sk
            }
        };
        let pk = keygen.gen_public_key(&sk, &mut sampler);
        let relin = Arc::new(keygen.gen_relinearization_key(&sk, &mut sampler));

        info!(
            ring_dim = params.ring_dim(),
            slots = params.slots(),
            max_level = params.max_level(),
            %io_mode,
            "scheme created"
        );
        Ok(Self {
            encoder: Encoder::new(ring.clone()),
            encryptor: Encryptor::new(ring.clone(), pk.clone()),
            decryptor: Decryptor::new(ring.clone(), sk.clone()),
            evaluator: Evaluator::new(&params, ring.clone()),
            params,
            ring,
            sampler,
            keygen,
            sk,
            pk,
            relin,
        })
    }

    pub fn params(&self) -> &CkksParameters {
        &self.params
    }

    pub fn ring(&self) -> &Arc<RingContext> {
        &self.ring
    }

    pub fn slots(&self) -> usize {
        self.params.slots()
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.sk
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.pk
    }

    pub fn relinearization_key(&self) -> &Arc<RelinearizationKey> {
        &self.relin
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Galois elements for rotations by 1, 2, 4, ... slots
    pub fn power_of_two_galois_elements(&self) -> Vec<u64> {
        self.params.power_of_two_galois_elements()
    }

    pub fn gen_galois_key(&mut self, galois_element: u64) -> GaloisKey {
        self.keygen.gen_galois_key(&self.sk, galois_element, &mut self.sampler)
    }

    /// Key set holding only the relinearization key
    pub fn base_key_set(&self) -> EvaluationKeySet {
        EvaluationKeySet::new(Some(self.relin.clone()))
    }

    pub fn encode(&self, values: &[f64], level: usize) -> Result<Plaintext> {
        self.encoder.encode(values, level, self.params.default_scale())
    }

    pub fn decode(&self, pt: &Plaintext) -> Vec<f64> {
        self.encoder.decode(pt)
    }

    pub fn encrypt(&mut self, pt: &Plaintext) -> Result<Ciphertext> {
        self.encryptor.encrypt(pt, &mut self.sampler)
    }

    pub fn decrypt(&self, ct: &Ciphertext) -> Plaintext {
        self.decryptor.decrypt(ct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load_shares_secret() {
        let dir = tempdir().unwrap();
        let keys = dir.path().join("keys");
        let params = SchemeParams::insecure_test();

        let saved = Scheme::new(&params, &keys, IoMode::Save).unwrap();
        let loaded = Scheme::new(&params, &keys, IoMode::Load).unwrap();
        assert_eq!(saved.secret_key(), loaded.secret_key());

        let mut saved = saved;
        let pt = saved.encode(&[0.25, -0.5], 1).unwrap();
        let ct = saved.encrypt(&pt).unwrap();
        let decoded = loaded.decode(&loaded.decrypt(&ct));
        assert!((decoded[0] - 0.25).abs() < 1e-6);
        assert!((decoded[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_without_store_fails() {
        let dir = tempdir().unwrap();
        let keys = dir.path().join("keys");
        let err = Scheme::new(&SchemeParams::insecure_test(), &keys, IoMode::Load).unwrap_err();
        assert!(matches!(err, crate::EngineError::Store(_)));
        assert!(!keys.exists());
    }

    #[test]
    fn test_none_mode_touches_nothing() {
        let dir = tempdir().unwrap();
        let keys = dir.path().join("keys");
        let scheme = Scheme::new(&SchemeParams::insecure_test(), &keys, IoMode::None).unwrap();
        assert!(!keys.exists());
        assert_eq!(scheme.power_of_two_galois_elements().len(), 5);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let dir = tempdir().unwrap();
        let mut params = SchemeParams::insecure_test();
        params.log_q.clear();
        let err = Scheme::new(&params, &dir.path().join("keys"), IoMode::Save).unwrap_err();
        assert!(matches!(err, crate::EngineError::Validation(_)));
        assert!(!dir.path().join("keys").exists());
    }
}
