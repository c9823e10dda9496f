//! Error taxonomy for deployment runs.

use ethers::types::Address;
use perp_registry::RegistryError;

use crate::chain::ChainError;
use crate::domain::run::RunState;
use crate::encoder::EncodingRangeError;

/// Deployment errors. Every variant is fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Malformed or inconsistent parameters; raised before any on-chain action.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("encoding range error: {0}")]
    EncodingRange(#[from] EncodingRangeError),

    /// A contract creation did not confirm.
    #[error("deployment of {component} failed: {source}")]
    DeploymentFailure {
        component: String,
        #[source]
        source: ChainError,
    },

    /// The one-shot initializer refused the call. Never retried.
    #[error("initializer of {address:?} rejected the call: {reason}")]
    InitializationRejected { address: Address, reason: String },

    /// `main` was initialized on an earlier run with supporting components
    /// other than the ones this run resolved.
    #[error(
        "main component {address:?} is already initialized with other components ({detail}); \
         clear `perpetual` from the registry to deploy a new one"
    )]
    InitializedWithOtherComponents { address: Address, detail: String },

    #[error("call {method} on {address:?} failed: {source}")]
    CallFailed {
        method: String,
        address: Address,
        #[source]
        source: ChainError,
    },

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid run state transition: {from} -> {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;

/// A fatal error together with the run state in which it happened.
#[derive(Debug, thiserror::Error)]
#[error("deployment failed at stage {stage}: {error}")]
pub struct StageFailure {
    pub stage: RunState,
    #[source]
    pub error: DeployError,
}
