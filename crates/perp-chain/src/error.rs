//! Error types for perp-chain

use std::path::PathBuf;

use perp_deploy_core::ChainError;
use thiserror::Error;

/// Errors raised while setting up a chain connection or loading artifacts
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("unknown network '{name}' (known: {known})")]
    UnknownNetwork { name: String, known: String },

    /// A network profile needs an environment value that is not set
    #[error("network '{network}' requires {variable} to be set")]
    MissingEnv { network: String, variable: String },

    #[error("artifact directory not found: {0}")]
    ArtifactDirNotFound(PathBuf),

    #[error("no artifact named '{0}'")]
    ArtifactNotFound(String),

    /// Artifact present but unusable (bad hex, empty bytecode, ABI mismatch)
    #[error("artifact '{name}' is invalid: {reason}")]
    InvalidArtifact { name: String, reason: String },

    #[error("signer error: {0}")]
    Signer(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ethers::signers::WalletError> for SetupError {
    fn from(err: ethers::signers::WalletError) -> Self {
        SetupError::Signer(err.to_string())
    }
}

impl From<SetupError> for ChainError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::Signer(msg) => ChainError::Signer(msg),
            SetupError::Provider(msg) => ChainError::Transport(msg),
            other => ChainError::Artifact(other.to_string()),
        }
    }
}

/// Result type for setup operations
pub type Result<T> = std::result::Result<T, SetupError>;
