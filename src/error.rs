//! Error handling for the linear-transform engine
//!
//! Every fallible operation returns [`EngineError`]. Variants separate the
//! failure classes a host needs to tell apart: bad input, a failed
//! homomorphic operation, a broken artifact store and an unknown handle.

use std::fmt;

/// Engine operation error
#[derive(Debug)]
pub enum EngineError {
    /// Malformed parameters or arguments, reported before any state change or I/O
    Validation(String),
    /// Failure inside a cryptographic operation (key generation, evaluation, rescale)
    Crypto(String),
    /// Artifact store failure: missing file, missing entry or malformed bytes
    Store(String),
    /// The handle does not name a live object of this kind
    NotFound {
        /// Object kind the handle was resolved against
        kind: &'static str,
        /// Index carried by the handle
        index: u32,
    },
    /// The operation needs a scheme context and none is live
    NoScheme,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "invalid argument: {}", msg),
            EngineError::Crypto(msg) => write!(f, "cryptographic operation failed: {}", msg),
            EngineError::Store(msg) => write!(f, "artifact store error: {}", msg),
            EngineError::NotFound { kind, index } => {
                write!(f, "{} handle {} not found", kind, index)
            }
            EngineError::NoScheme => write!(f, "no scheme context is live"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// True for unknown-handle errors, the only class callers usually recover from
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Create a validation error with format string support
macro_rules! validation_err {
    ($($arg:tt)*) => {
        $crate::error::EngineError::Validation(format!($($arg)*))
    };
}

/// Create a cryptographic-operation error with format string support
macro_rules! crypto_err {
    ($($arg:tt)*) => {
        $crate::error::EngineError::Crypto(format!($($arg)*))
    };
}

/// Create a store error with format string support
macro_rules! store_err {
    ($($arg:tt)*) => {
        $crate::error::EngineError::Store(format!($($arg)*))
    };
}

pub(crate) use crypto_err;
pub(crate) use store_err;
pub(crate) use validation_err;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_store() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Store(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = EngineError::NotFound {
            kind: "ciphertext",
            index: 7,
        };
        assert_eq!(err.to_string(), "ciphertext handle 7 not found");
        assert!(err.is_not_found());
        assert!(!validation_err!("bad {}", 1).is_not_found());
    }
}
