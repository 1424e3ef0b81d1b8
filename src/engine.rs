//! The engine: a caller-owned context holding the scheme, the rotation-key
//! lifecycle and every object a host refers to by handle.
//!
//! Every method takes `&mut self` or `&self`, so one engine serves one
//! writer at a time. Create separate engines for independent contexts.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::ckks::{Ciphertext, Plaintext};
use crate::config::EngineConfig;
use crate::error::{crypto_err, validation_err, EngineError, Result};
use crate::handle::{Handle, HandleAllocator};
use crate::keys::KeyLifecycle;
use crate::ks::EvaluationKeySet;
use crate::lintrans::{self, BlockDiagonals, LinearTransform, PreparedTransform};
use crate::params::{IoMode, SchemeParams};
use crate::polynomial::Polynomial;
use crate::scheme::Scheme;
use crate::store::DiagonalStore;

pub type CiphertextHandle = Handle<Ciphertext>;
pub type PlaintextHandle = Handle<Plaintext>;
pub type PolynomialHandle = Handle<Polynomial>;
pub type TransformHandle = Handle<LinearTransform>;

/// Locations of the persisted diagonals and keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub diags_path: PathBuf,
    pub keys_path: PathBuf,
}

impl ArtifactPaths {
    pub fn new(diags_path: impl Into<PathBuf>, keys_path: impl Into<PathBuf>) -> Self {
        Self {
            diags_path: diags_path.into(),
            keys_path: keys_path.into(),
        }
    }
}

/// Linear-transform execution engine
#[derive(Debug)]
pub struct Engine {
    scheme: Option<Scheme>,
    keys: KeyLifecycle,
    ciphertexts: HandleAllocator<Ciphertext>,
    plaintexts: HandleAllocator<Plaintext>,
    polynomials: HandleAllocator<Polynomial>,
    transforms: HandleAllocator<LinearTransform>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            scheme: None,
            keys: KeyLifecycle::new(),
            ciphertexts: HandleAllocator::new("ciphertext"),
            plaintexts: HandleAllocator::new("plaintext"),
            polynomials: HandleAllocator::new("polynomial"),
            transforms: HandleAllocator::new("linear transform"),
        }
    }

    /// Engine with a scheme created from a configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut engine = Self::new();
        engine.create_scheme(&config.scheme, &config.keys_path, config.io_mode)?;
        Ok(engine)
    }

    pub fn has_scheme(&self) -> bool {
        self.scheme.is_some()
    }

    pub fn scheme(&self) -> Result<&Scheme> {
        self.scheme.as_ref().ok_or(EngineError::NoScheme)
    }

    /// Build the scheme context and its power-of-two rotation keys.
    ///
    /// Any previous context is destroyed only once the new one is complete,
    /// so a failure leaves the engine as it was.
    pub fn create_scheme(&mut self, params: &SchemeParams, keys_path: &Path, io_mode: IoMode) -> Result<()> {
        let mut scheme = Scheme::new(params, keys_path, io_mode)?;
        let mut keys = KeyLifecycle::new();
        let pow2 = scheme.power_of_two_galois_elements();
        keys.ensure_live(&mut scheme, &pow2);

        if self.scheme.is_some() {
            self.destroy_scheme();
        }
        info!(resident_keys = pow2.len(), "scheme installed");
        self.scheme = Some(scheme);
        self.keys = keys;
        Ok(())
    }

    /// Drop the scheme, every cached key and every handle-owned object
    pub fn destroy_scheme(&mut self) {
        self.scheme = None;
        self.keys.clear();
        self.ciphertexts.reset();
        self.plaintexts.reset();
        self.polynomials.reset();
        self.transforms.reset();
        info!("scheme destroyed");
    }

    /// Galois elements of the keys resident in memory
    pub fn live_galois_elements(&self) -> Vec<u64> {
        self.keys.live_elements()
    }

    /// Galois elements written to the key store by this context
    pub fn saved_galois_elements(&self) -> Vec<u64> {
        self.keys.saved_elements()
    }

    // ----- linear transforms -----

    /// Build one block's transform and register it.
    ///
    /// - `none`: diagonals are encoded and kept; missing keys are made live.
    /// - `save`: diagonals are encoded, written under `module` and released;
    ///   keys not saved before are generated and written.
    /// - `load`: only placeholders are created; nothing is read or generated.
    pub fn build_linear_transform(
        &mut self,
        block: &BlockDiagonals<'_>,
        module: &str,
        paths: &ArtifactPaths,
        io_mode: IoMode,
    ) -> Result<TransformHandle> {
        let scheme = self.scheme.as_mut().ok_or(EngineError::NoScheme)?;
        if io_mode.is_persistent() && module.is_empty() {
            return Err(validation_err!("module name must not be empty"));
        }
        let PreparedTransform { mut transform, values } = lintrans::prepare(scheme.params(), block)?;
        let required = transform.galois_elements(scheme.params());

        match io_mode {
            IoMode::None => {
                transform.encode(scheme.encoder(), &values)?;
                self.keys.ensure_live(scheme, &required);
            }
            IoMode::Save => {
                transform.encode(scheme.encoder(), &values)?;
                DiagonalStore::for_saving(&paths.diags_path, module)?.save(&transform)?;
                transform.clear_diagonals();
                self.keys.persist_missing(scheme, &required, &paths.keys_path)?;
            }
            IoMode::Load => {}
        }

        debug!(
            row = block.block_row,
            col = block.block_col,
            diagonals = transform.params().diagonal_indices.len(),
            rotations = required.len(),
            %io_mode,
            "linear transform built"
        );
        Ok(self.transforms.allocate(transform))
    }

    pub fn delete_linear_transform(&mut self, handle: TransformHandle) {
        self.transforms.release(handle);
    }

    pub fn linear_transform(&self, handle: TransformHandle) -> Result<&LinearTransform> {
        self.transforms.get(handle)
    }

    pub fn live_linear_transforms(&self) -> Vec<TransformHandle> {
        self.transforms.live_handles()
    }

    /// Evaluate a grid of transforms on a vector of ciphertexts.
    ///
    /// With C inputs and R·C transforms in row-major order, output row i is
    /// `rescale(Σ_j T[i·C + j](inputs[j]))`: one rescale per row. Outputs are
    /// registered only when every row succeeds.
    pub fn evaluate_linear_transforms(
        &mut self,
        transforms: &[TransformHandle],
        inputs: &[CiphertextHandle],
        module: &str,
        paths: &ArtifactPaths,
        io_mode: IoMode,
    ) -> Result<Vec<CiphertextHandle>> {
        let scheme = self.scheme.as_mut().ok_or(EngineError::NoScheme)?;
        if inputs.is_empty() {
            return Err(validation_err!("no input ciphertexts"));
        }
        if transforms.is_empty() {
            return Err(validation_err!("no linear transforms"));
        }
        if transforms.len() % inputs.len() != 0 {
            return Err(validation_err!(
                "{} transforms do not tile {} inputs",
                transforms.len(),
                inputs.len()
            ));
        }
        for &h in transforms {
            self.transforms.get(h)?;
        }
        for &h in inputs {
            self.ciphertexts.get(h)?;
        }

        let cols = inputs.len();
        let rows = transforms.len() / cols;

        let resident_keys = if io_mode.is_persistent() {
            None
        } else {
            let mut required = BTreeSet::new();
            for &h in transforms {
                required.extend(self.transforms.get(h)?.galois_elements(scheme.params()));
            }
            let required: Vec<u64> = required.into_iter().collect();
            self.keys.ensure_live(scheme, &required);
            Some(self.keys.live_key_set(scheme))
        };
        let store = if io_mode.is_persistent() {
            Some(DiagonalStore::for_loading(&paths.diags_path, module)?)
        } else {
            None
        };

        let mut outputs = Vec::with_capacity(rows);
        for i in 0..rows {
            let mut row_acc: Option<Ciphertext> = None;
            for j in 0..cols {
                let ct = self.ciphertexts.get(inputs[j])?;
                let lt = self.transforms.get_mut(transforms[i * cols + j])?;
                let partial = match (&resident_keys, &store) {
                    (Some(keys), _) => lintrans::evaluate(scheme.evaluator(), lt, ct, keys)?,
                    (None, Some(store)) => {
                        let result = evaluate_streamed(scheme, &self.keys, store, lt, ct, &paths.keys_path);
                        lt.clear_diagonals();
                        result?
                    }
                    (None, None) => return Err(crypto_err!("no key source for evaluation")),
                };
                debug!(row = i, col = j, level = partial.level(), "block evaluated");

                match row_acc.as_mut() {
                    Some(acc) => scheme.evaluator().add_assign(acc, &partial)?,
                    None => row_acc = Some(partial),
                }
            }
            let row = row_acc.ok_or_else(|| crypto_err!("row {} has no blocks", i))?;
            outputs.push(scheme.evaluator().rescale(&row)?);
        }

        info!(rows, cols, %io_mode, "linear transforms evaluated");
        Ok(outputs.into_iter().map(|ct| self.ciphertexts.allocate(ct)).collect())
    }

    // ----- host-side objects -----

    pub fn encode(&mut self, values: &[f64], level: usize) -> Result<PlaintextHandle> {
        let pt = self.scheme()?.encode(values, level)?;
        Ok(self.plaintexts.allocate(pt))
    }

    pub fn decode(&self, handle: PlaintextHandle) -> Result<Vec<f64>> {
        let scheme = self.scheme()?;
        Ok(scheme.decode(self.plaintexts.get(handle)?))
    }

    pub fn encrypt(&mut self, handle: PlaintextHandle) -> Result<CiphertextHandle> {
        let scheme = self.scheme.as_mut().ok_or(EngineError::NoScheme)?;
        let ct = scheme.encrypt(self.plaintexts.get(handle)?)?;
        Ok(self.ciphertexts.allocate(ct))
    }

    pub fn decrypt(&mut self, handle: CiphertextHandle) -> Result<PlaintextHandle> {
        let pt = self.scheme()?.decrypt(self.ciphertexts.get(handle)?);
        Ok(self.plaintexts.allocate(pt))
    }

    pub fn rescale(&mut self, handle: CiphertextHandle) -> Result<CiphertextHandle> {
        let ct = self.scheme()?.evaluator().rescale(self.ciphertexts.get(handle)?)?;
        Ok(self.ciphertexts.allocate(ct))
    }

    pub fn add(&mut self, a: CiphertextHandle, b: CiphertextHandle) -> Result<CiphertextHandle> {
        let evaluator = self.scheme()?.evaluator();
        let ct = evaluator.add(self.ciphertexts.get(a)?, self.ciphertexts.get(b)?)?;
        Ok(self.ciphertexts.allocate(ct))
    }

    pub fn ciphertext(&self, handle: CiphertextHandle) -> Result<&Ciphertext> {
        self.ciphertexts.get(handle)
    }

    pub fn plaintext(&self, handle: PlaintextHandle) -> Result<&Plaintext> {
        self.plaintexts.get(handle)
    }

    pub fn delete_ciphertext(&mut self, handle: CiphertextHandle) {
        self.ciphertexts.release(handle);
    }

    pub fn delete_plaintext(&mut self, handle: PlaintextHandle) {
        self.plaintexts.release(handle);
    }

    pub fn live_ciphertexts(&self) -> Vec<CiphertextHandle> {
        self.ciphertexts.live_handles()
    }

    pub fn live_plaintexts(&self) -> Vec<PlaintextHandle> {
        self.plaintexts.live_handles()
    }

    // ----- polynomials -----

    pub fn create_polynomial(&mut self, coeffs: &[f64]) -> Result<PolynomialHandle> {
        self.scheme()?;
        let poly = Polynomial::new(coeffs.to_vec())?;
        Ok(self.polynomials.allocate(poly))
    }

    /// Evaluate a polynomial slot-wise; consumes `degree` levels
    pub fn evaluate_polynomial(&mut self, poly: PolynomialHandle, input: CiphertextHandle) -> Result<CiphertextHandle> {
        let scheme = self.scheme()?;
        let keys = scheme.base_key_set();
        let ct = self.polynomials.get(poly)?.evaluate(
            scheme.evaluator(),
            scheme.encoder(),
            self.ciphertexts.get(input)?,
            &keys,
        )?;
        Ok(self.ciphertexts.allocate(ct))
    }

    pub fn delete_polynomial(&mut self, handle: PolynomialHandle) {
        self.polynomials.release(handle);
    }

    pub fn live_polynomials(&self) -> Vec<PolynomialHandle> {
        self.polynomials.live_handles()
    }
}

/// Load one block's diagonals and keys, then evaluate it.
///
/// The key set lives only for this call; the caller clears the diagonals.
fn evaluate_streamed(
    scheme: &Scheme,
    keys: &KeyLifecycle,
    store: &DiagonalStore,
    lt: &mut LinearTransform,
    ct: &Ciphertext,
    keys_path: &Path,
) -> Result<Ciphertext> {
    store.load(lt)?;
    let required = lt.galois_elements(scheme.params());
    let block_keys: EvaluationKeySet = keys.load_key_set(scheme, &required, keys_path)?;
    lintrans::evaluate(scheme.evaluator(), lt, ct, &block_keys)
}
