//! Typed views over blob stores: transform diagonals and key material

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::blob::BlobStore;
use crate::ckks::{Plaintext, SecretKey};
use crate::error::{store_err, Result};
use crate::ks::GaloisKey;
use crate::lintrans::{LinearTransform, LinearTransformParams};

const SECRET_KEY: &str = "sk";
const PLAINTEXTS: &str = "plaintexts";
const BLOCK_PARAMS: &str = "params";

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encoded diagonals of a module's transforms, grouped by block.
///
/// Each block directory also holds the parameters its diagonals were encoded
/// under; loading into a transform with other parameters is refused.
#[derive(Debug, Clone)]
pub struct DiagonalStore {
    blob: BlobStore,
    module: String,
}

impl DiagonalStore {
    /// Store for saving; the directory is created when missing
    pub fn for_saving(path: &Path, module: &str) -> Result<Self> {
        Ok(Self {
            blob: BlobStore::open_or_create(path)?,
            module: module.to_string(),
        })
    }

    /// Store for loading; the directory must exist
    pub fn for_loading(path: &Path, module: &str) -> Result<Self> {
        Ok(Self {
            blob: BlobStore::open(path)?,
            module: module.to_string(),
        })
    }

    fn block_dir(lt: &LinearTransform) -> String {
        format!("{}_{}", lt.block().row, lt.block().col)
    }

    /// Write every resident diagonal of `lt`; returns how many were written
    pub fn save(&self, lt: &LinearTransform) -> Result<usize> {
        let block = Self::block_dir(lt);
        self.blob
            .replace(&[&self.module, PLAINTEXTS, &block, BLOCK_PARAMS], &to_bytes(lt.params())?)?;
        let mut written = 0;
        for (k, pt) in lt.diagonals() {
            if pt.is_placeholder() {
                continue;
            }
            let name = k.to_string();
            self.blob
                .replace(&[&self.module, PLAINTEXTS, &block, &name], &to_bytes(pt)?)?;
            written += 1;
        }
        debug!(module = %self.module, block = %block, written, "saved diagonals");
        Ok(written)
    }

    /// Fill every placeholder of `lt` from the store
    pub fn load(&self, lt: &mut LinearTransform) -> Result<()> {
        let block = Self::block_dir(lt);
        let saved: LinearTransformParams = self
            .blob
            .read_with(&[&self.module, PLAINTEXTS, &block, BLOCK_PARAMS], from_bytes)?;
        if &saved != lt.params() {
            return Err(store_err!(
                "block {} of module {} was saved with different parameters: {:?} vs {:?}",
                block,
                self.module,
                saved,
                lt.params()
            ));
        }
        let indices = saved.diagonal_indices;
        for k in indices {
            let name = k.to_string();
            let pt: Plaintext = self
                .blob
                .read_with(&[&self.module, PLAINTEXTS, &block, &name], from_bytes)?;
            lt.set_diagonal(k, pt)?;
        }
        debug!(module = %self.module, block = %block, "loaded diagonals");
        Ok(())
    }
}

/// Secret key and rotation keys of one scheme.
///
/// Rotation keys sit at the top level, named by their decimal Galois element.
#[derive(Debug, Clone)]
pub struct KeyStore {
    blob: BlobStore,
}

impl KeyStore {
    /// Fresh, empty key store; any previous content at `path` is discarded
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            blob: BlobStore::create(path)?,
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            blob: BlobStore::open(path)?,
        })
    }

    pub fn open_or_create(path: &Path) -> Result<Self> {
        Ok(Self {
            blob: BlobStore::open_or_create(path)?,
        })
    }

    pub fn save_secret_key(&self, sk: &SecretKey) -> Result<()> {
        self.blob.replace(&[SECRET_KEY], &to_bytes(sk)?)
    }

    pub fn load_secret_key(&self) -> Result<SecretKey> {
        self.blob.read_with(&[SECRET_KEY], from_bytes)
    }

    pub fn contains_galois_key(&self, galois_element: u64) -> bool {
        self.blob.contains(&[&galois_element.to_string()])
    }

    /// Write keys not yet present; returns the elements actually written
    pub fn save_galois_keys<'a, I>(&self, keys: I) -> Result<Vec<u64>>
    where
        I: IntoIterator<Item = &'a GaloisKey>,
    {
        let mut written = Vec::new();
        for key in keys {
            let name = key.galois_element.to_string();
            if self.blob.put(&[&name], &to_bytes(key)?)? {
                written.push(key.galois_element);
            }
        }
        Ok(written)
    }

    /// Read exactly the requested keys; any absent key is an error
    pub fn load_galois_keys(&self, elements: &[u64]) -> Result<Vec<GaloisKey>> {
        elements
            .iter()
            .map(|g| self.blob.read_with(&[&g.to_string()], from_bytes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;
    use crate::ckks::{Encoder, KeyGenerator};
    use crate::error::EngineError;
    use crate::lintrans::{BlockCoord, LinearTransformParams};
    use crate::math::{RingContext, Sampler};
    use crate::params::{CkksParameters, SchemeParams};

    fn setup() -> (CkksParameters, Arc<RingContext>) {
        let ckks = CkksParameters::from_literal(&SchemeParams::insecure_test()).unwrap();
        let ring = Arc::new(RingContext::new(ckks.ring_dim(), ckks.q(), ckks.p()).unwrap());
        (ckks, ring)
    }

    fn transform(ckks: &CkksParameters, block: BlockCoord) -> LinearTransform {
        let params = LinearTransformParams {
            diagonal_indices: vec![0, 2, 7],
            level: 1,
            level_p: ckks.max_level_p(),
            scale: ckks.q_at(1) as f64,
            log_slots: ckks.log_slots(),
            log_bsgs_ratio: 1,
        };
        LinearTransform::new(params, block, ckks.ring_dim())
    }

    #[test]
    fn test_diagonals_roundtrip() {
        let (ckks, ring) = setup();
        let encoder = Encoder::new(ring);
        let dir = tempdir().unwrap();
        let store = DiagonalStore::for_saving(&dir.path().join("diags"), "net.fc1").unwrap();

        let mut lt = transform(&ckks, BlockCoord::new(1, 0));
        let values: BTreeMap<usize, Vec<f64>> = [0, 2, 7]
            .iter()
            .map(|&k| (k, vec![k as f64 * 0.25; ckks.slots()]))
            .collect();
        lt.encode(&encoder, &values).unwrap();
        let original: Vec<Vec<u8>> = lt.diagonals().map(|(_, pt)| to_bytes(pt).unwrap()).collect();

        assert_eq!(store.save(&lt).unwrap(), 3);
        lt.clear_diagonals();

        let store = DiagonalStore::for_loading(&dir.path().join("diags"), "net.fc1").unwrap();
        store.load(&mut lt).unwrap();
        let reloaded: Vec<Vec<u8>> = lt.diagonals().map(|(_, pt)| to_bytes(pt).unwrap()).collect();
        assert_eq!(original, reloaded);

        // another block of the same module was never saved
        let mut other = transform(&ckks, BlockCoord::new(0, 1));
        assert!(store.load(&mut other).is_err());
    }

    #[test]
    fn test_load_rejects_block_saved_with_other_params() {
        let (ckks, ring) = setup();
        let encoder = Encoder::new(ring);
        let dir = tempdir().unwrap();
        let path = dir.path().join("diags");

        let mut lt = transform(&ckks, BlockCoord::new(0, 0));
        let values: BTreeMap<usize, Vec<f64>> =
            [0, 2, 7].iter().map(|&k| (k, vec![0.5; ckks.slots()])).collect();
        lt.encode(&encoder, &values).unwrap();
        DiagonalStore::for_saving(&path, "m").unwrap().save(&lt).unwrap();
        let store = DiagonalStore::for_loading(&path, "m").unwrap();

        let mut params = lt.params().clone();
        params.log_bsgs_ratio = 3;
        let mut other_ratio = LinearTransform::new(params, BlockCoord::new(0, 0), ckks.ring_dim());
        let err = store.load(&mut other_ratio).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)), "{}", err);
        assert!(!other_ratio.is_resident());

        let mut params = lt.params().clone();
        params.diagonal_indices = vec![0, 2];
        let mut other_indices = LinearTransform::new(params, BlockCoord::new(0, 0), ckks.ring_dim());
        assert!(store.load(&mut other_indices).is_err());

        let mut same = transform(&ckks, BlockCoord::new(0, 0));
        store.load(&mut same).unwrap();
        assert!(same.is_resident());
    }

    #[test]
    fn test_keys_roundtrip_and_skip_existing() {
        let (ckks, ring) = setup();
        let mut sampler = Sampler::new(ckks.sigma(), Some(21));
        let keygen = KeyGenerator::new(ring, ckks.hamming_weight());
        let sk = keygen.gen_secret_key(&mut sampler);
        let g = ckks.galois_element(1);
        let key = keygen.gen_galois_key(&sk, g, &mut sampler);

        let dir = tempdir().unwrap();
        let store = KeyStore::create(&dir.path().join("keys")).unwrap();
        store.save_secret_key(&sk).unwrap();
        assert_eq!(store.save_galois_keys([&key]).unwrap(), vec![g]);
        assert!(store.save_galois_keys([&key]).unwrap().is_empty());
        assert!(store.contains_galois_key(g));

        let store = KeyStore::open(&dir.path().join("keys")).unwrap();
        assert_eq!(store.load_secret_key().unwrap(), sk);
        let loaded = store.load_galois_keys(&[g]).unwrap();
        assert_eq!(to_bytes(&loaded[0]).unwrap(), to_bytes(&key).unwrap());
        assert!(store.load_galois_keys(&[g, ckks.galois_element(2)]).is_err());
    }

    #[test]
    fn test_open_missing_store_fails() {
        let dir = tempdir().unwrap();
        assert!(KeyStore::open(&dir.path().join("absent")).is_err());
        assert!(DiagonalStore::for_loading(&dir.path().join("absent"), "m").is_err());
    }
}
