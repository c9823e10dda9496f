//! Perpetual deployment core
//!
//! Decides which supporting contracts (Poseidon libraries, verifiers) can be
//! reused and which must be deployed, packs the verifier parameters, and
//! drives the create-then-initialize sequence of the upgradeable `Perpetual`
//! component. The chain is reached only through the [`chain::ChainClient`]
//! trait.

pub mod chain;
pub mod deployer;
pub mod domain;
pub mod encoder;
pub mod fakes;
pub mod main_component;
pub mod obs;
pub mod orchestrator;
pub mod plan;
pub mod telemetry;

pub use chain::{CallReceipt, ChainClient, ChainError, ChainResult, ContractRef, MethodCall};
pub use deployer::ComponentDeployer;
pub use domain::{
    ChainParameters, ComponentKind, ComponentSpec, DeployError, DeployParameters,
    DeployedComponent, DeploymentOutputRecord, NetworkContext, ParametersFile, Provenance,
    Result, RunState, StageFailure, VerifierVariant,
};
pub use encoder::{encode_max_tx_levels, EncodingRangeError, PackedParameter, DEPTH_SHIFT};
pub use orchestrator::{DeploymentOrchestrator, DeploymentReport};
pub use plan::RunPlan;
