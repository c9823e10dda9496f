pub mod component;
pub mod error;
pub mod network;
pub mod output;
pub mod parameters;
pub mod run;

pub use component::{
    ComponentKind, ComponentSpec, DeployedComponent, VerifierVariant, HASH_LIBRARY_ARITIES,
    MAIN_ARTIFACT, MAIN_COMPONENT_NAME, MOCK_VERIFIER_ARTIFACT,
};
pub use error::{DeployError, Result, StageFailure};
pub use network::NetworkContext;
pub use output::{DeploymentOutputRecord, Provenance};
pub use parameters::{ChainParameters, DeployParameters, ParametersFile};
pub use run::RunState;
