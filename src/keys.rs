//! Rotation-key lifecycle across the three io modes
//!
//! - `none`: keys live in memory for the lifetime of the scheme.
//! - `save`: missing keys are generated, written to the key store and
//!   dropped; only their Galois elements are remembered.
//! - `load`: each block reads exactly the keys it needs and drops them
//!   when the block is done.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::ks::{EvaluationKeySet, GaloisKey};
use crate::scheme::Scheme;
use crate::store::KeyStore;

/// Tracks which rotation keys are resident and which are persisted
#[derive(Debug, Default)]
pub struct KeyLifecycle {
    live: BTreeMap<u64, Arc<GaloisKey>>,
    saved: BTreeSet<u64>,
}

impl KeyLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the required keys that are not live yet; returns the new elements
    pub fn ensure_live(&mut self, scheme: &mut Scheme, required: &[u64]) -> Vec<u64> {
        let missing: Vec<u64> = required
            .iter()
            .copied()
            .filter(|g| !self.live.contains_key(g))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        for &g in &missing {
            self.live.insert(g, Arc::new(scheme.gen_galois_key(g)));
        }
        if !missing.is_empty() {
            debug!(generated = missing.len(), live = self.live.len(), "rotation keys made live");
        }
        missing
    }

    /// Relinearization key plus every live rotation key
    pub fn live_key_set(&self, scheme: &Scheme) -> EvaluationKeySet {
        let mut keys = scheme.base_key_set();
        keys.extend(self.live.values().cloned());
        keys
    }

    /// Generate and persist the required keys not saved before.
    ///
    /// Returns the elements that were generated in this call.
    pub fn persist_missing(&mut self, scheme: &mut Scheme, required: &[u64], keys_path: &Path) -> Result<Vec<u64>> {
        let missing: BTreeSet<u64> = required
            .iter()
            .copied()
            .filter(|g| !self.saved.contains(g))
            .collect();
        if missing.is_empty() {
            return Ok(Vec::new());
        }
        let store = KeyStore::open_or_create(keys_path)?;
        let generated: Vec<GaloisKey> = missing.iter().map(|&g| scheme.gen_galois_key(g)).collect();
        let written = store.save_galois_keys(&generated)?;
        self.saved.extend(missing.iter().copied());
        debug!(
            generated = generated.len(),
            written = written.len(),
            saved = self.saved.len(),
            "rotation keys persisted"
        );
        Ok(missing.into_iter().collect())
    }

    /// Scoped key set with exactly the required keys read from the store
    pub fn load_key_set(&self, scheme: &Scheme, required: &[u64], keys_path: &Path) -> Result<EvaluationKeySet> {
        let mut keys = scheme.base_key_set();
        if required.is_empty() {
            return Ok(keys);
        }
        let store = KeyStore::open(keys_path)?;
        keys.extend(store.load_galois_keys(required)?.into_iter().map(Arc::new));
        debug!(loaded = required.len(), "rotation keys loaded");
        Ok(keys)
    }

    pub fn live_elements(&self) -> Vec<u64> {
        self.live.keys().copied().collect()
    }

    pub fn saved_elements(&self) -> Vec<u64> {
        self.saved.iter().copied().collect()
    }

    /// Forget every live and saved key
    pub fn clear(&mut self) {
        self.live.clear();
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{IoMode, SchemeParams};
    use tempfile::tempdir;

    #[test]
    fn test_ensure_live_generates_only_missing() {
        let dir = tempdir().unwrap();
        let mut scheme = Scheme::new(&SchemeParams::insecure_test(), &dir.path().join("k"), IoMode::None).unwrap();
        let mut keys = KeyLifecycle::new();
        let g1 = scheme.params().galois_element(1);
        let g3 = scheme.params().galois_element(3);

        assert_eq!(keys.ensure_live(&mut scheme, &[g1, g1]), vec![g1]);
        assert_eq!(keys.ensure_live(&mut scheme, &[g1, g3]), vec![g3]);
        assert!(keys.ensure_live(&mut scheme, &[g3]).is_empty());

        let set = keys.live_key_set(&scheme);
        assert!(set.relinearization_key().is_some());
        let mut expected = vec![g1, g3];
        expected.sort_unstable();
        assert_eq!(set.galois_elements(), expected);
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempdir().unwrap();
        let keys_path = dir.path().join("keys");
        let mut scheme = Scheme::new(&SchemeParams::insecure_test(), &keys_path, IoMode::Save).unwrap();
        let mut keys = KeyLifecycle::new();
        let g = scheme.params().galois_element(2);

        assert_eq!(keys.persist_missing(&mut scheme, &[g], &keys_path).unwrap(), vec![g]);
        assert!(keys.persist_missing(&mut scheme, &[g], &keys_path).unwrap().is_empty());
        assert_eq!(keys.saved_elements(), vec![g]);
        assert!(keys.live_elements().is_empty());

        let set = keys.load_key_set(&scheme, &[g], &keys_path).unwrap();
        assert_eq!(set.galois_elements(), vec![g]);
        let missing = scheme.params().galois_element(5);
        assert!(keys.load_key_set(&scheme, &[missing], &keys_path).is_err());

        keys.clear();
        assert!(keys.saved_elements().is_empty());
    }
}
