//! Evaluation key sets passed explicitly into each evaluation

use std::collections::BTreeMap;
use std::sync::Arc;

use super::setup::{GaloisKey, RelinearizationKey};

/// Relinearization key plus the Galois keys an evaluation may use.
///
/// Keys are shared behind `Arc`, so building a scoped set from a resident
/// cache does not copy key material.
#[derive(Clone, Debug, Default)]
pub struct EvaluationKeySet {
    relin: Option<Arc<RelinearizationKey>>,
    galois: BTreeMap<u64, Arc<GaloisKey>>,
}

impl EvaluationKeySet {
    pub fn new(relin: Option<Arc<RelinearizationKey>>) -> Self {
        Self {
            relin,
            galois: BTreeMap::new(),
        }
    }

    pub fn insert_galois(&mut self, key: Arc<GaloisKey>) {
        self.galois.insert(key.galois_element, key);
    }

    pub fn relinearization_key(&self) -> Option<&RelinearizationKey> {
        self.relin.as_deref()
    }

    pub fn galois_key(&self, galois_element: u64) -> Option<&GaloisKey> {
        self.galois.get(&galois_element).map(Arc::as_ref)
    }

    /// Galois elements covered by this set, ascending
    pub fn galois_elements(&self) -> Vec<u64> {
        self.galois.keys().copied().collect()
    }

    /// Drop every Galois key, keeping only the relinearization key
    pub fn clear_galois(&mut self) {
        self.galois.clear();
    }
}

impl Extend<Arc<GaloisKey>> for EvaluationKeySet {
    fn extend<I: IntoIterator<Item = Arc<GaloisKey>>>(&mut self, iter: I) {
        for key in iter {
            self.insert_galois(key);
        }
    }
}
