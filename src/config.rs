//! JSON-loadable engine configuration

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::ArtifactPaths;
use crate::error::{store_err, validation_err, Result};
use crate::params::{IoMode, SchemeParams};

/// Scheme parameters plus where and how artifacts are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scheme: SchemeParams,

    /// Directory holding the secret and rotation keys
    pub keys_path: PathBuf,

    /// Directory holding encoded diagonals
    pub diags_path: PathBuf,

    /// Module name the transforms are stored under
    pub module: String,

    #[serde(default)]
    pub io_mode: IoMode,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| store_err!("failed to open config {}: {}", path.display(), e))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.module.is_empty() {
            return Err(validation_err!("module name must not be empty"));
        }
        self.scheme.validate()
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            diags_path: self.diags_path.clone(),
            keys_path: self.keys_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RingType;

    const SAMPLE: &str = r#"{
        "scheme": {
            "log_n": 6,
            "log_q": [55, 40, 40],
            "log_p": [61],
            "log_scale": 40,
            "hamming_weight": 16,
            "ring_type": "conjugate-invariant"
        },
        "keys_path": "/tmp/keys",
        "diags_path": "/tmp/diags",
        "module": "net",
        "io_mode": "save"
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.io_mode, IoMode::Save);
        assert_eq!(config.scheme.ring_type, RingType::ConjugateInvariant);
        assert_eq!(config.scheme.seed, None);
        assert_eq!(config.artifact_paths().keys_path, PathBuf::from("/tmp/keys"));
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(EngineConfig::from_json_str("{").is_err());
        let bad = SAMPLE.replace("\"save\"", "\"sometimes\"");
        assert!(EngineConfig::from_json_str(&bad).is_err());
        let empty_module = SAMPLE.replace("\"net\"", "\"\"");
        assert!(EngineConfig::from_json_str(&empty_module).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(EngineConfig::from_json_file(&path).unwrap().module, "net");
        assert!(EngineConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
