//! Error types for perp-registry

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or persisting registry state
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry file could not be read or written
    #[error("registry io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry file is not valid JSON for the expected layout
    #[error("registry file is malformed: {0}")]
    Json(#[from] serde_json::Error),

    /// A top-level key is not a decimal chain id
    #[error("invalid chain id key in registry: {key}")]
    InvalidChainKey { key: String },

    /// Atomic replace of the registry file failed
    #[error("failed to persist registry to {path}: {reason}")]
    Persist { path: PathBuf, reason: String },

    /// Another thread panicked while holding the registry lock
    #[error("registry lock poisoned")]
    LockPoisoned,
}
