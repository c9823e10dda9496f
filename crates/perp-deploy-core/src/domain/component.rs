//! Deployable components and their registry identities.

use ethers::types::{Address, U256};
use perp_registry::ComponentGroup;
use serde::{Deserialize, Serialize};

use crate::chain::ContractRef;

/// Poseidon arities deployed as one atomic group, in initializer order.
pub const HASH_LIBRARY_ARITIES: [u8; 4] = [2, 3, 4, 5];

/// Artifact of the main upgradeable component.
pub const MAIN_ARTIFACT: &str = "Perpetual";

/// Artifact of the inert verifier used for `mock` slots.
pub const MOCK_VERIFIER_ARTIFACT: &str = "VerifierRollupHelper";

/// Registry name of the main component.
pub const MAIN_COMPONENT_NAME: &str = "perpetual";

/// Verifier flavour for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierVariant {
    /// Production verifier sized for the slot's capacity class.
    Real,
    /// Verifier that accepts every proof.
    Mock,
}

impl VerifierVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifierVariant::Real => "real",
            VerifierVariant::Mock => "mock",
        }
    }
}

impl std::fmt::Display for VerifierVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a component is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentKind {
    HashLibrary {
        arity: u8,
    },
    Verifier {
        slot: usize,
        capacity: U256,
        variant: VerifierVariant,
    },
    Main,
}

/// One component the run must resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Stable registry key.
    pub name: String,
    pub kind: ComponentKind,
    pub required: bool,
}

impl ComponentSpec {
    /// Poseidon library for `arity` inputs (2..=5).
    pub fn hash_library(arity: u8) -> Self {
        Self {
            name: format!("{}{arity}", ComponentGroup::HashLibraries.prefix()),
            kind: ComponentKind::HashLibrary { arity },
            required: true,
        }
    }

    /// Verifier for `slot`. Capacity and variant are part of the name, so a
    /// slot whose configuration changed does not match a stale registry entry.
    pub fn verifier(slot: usize, capacity: impl Into<U256>, variant: VerifierVariant) -> Self {
        let capacity = capacity.into();
        Self {
            name: format!(
                "{}{slot}:{capacity}:{variant}",
                ComponentGroup::Verifiers.prefix()
            ),
            kind: ComponentKind::Verifier {
                slot,
                capacity,
                variant,
            },
            required: true,
        }
    }

    pub fn main() -> Self {
        Self {
            name: MAIN_COMPONENT_NAME.to_string(),
            kind: ComponentKind::Main,
            required: true,
        }
    }

    pub fn group(&self) -> ComponentGroup {
        match self.kind {
            ComponentKind::HashLibrary { .. } => ComponentGroup::HashLibraries,
            ComponentKind::Verifier { .. } => ComponentGroup::Verifiers,
            ComponentKind::Main => ComponentGroup::Main,
        }
    }

    /// Bytecode to deploy for this component.
    pub fn contract_ref(&self) -> ContractRef {
        match &self.kind {
            ComponentKind::HashLibrary { arity } => ContractRef::PoseidonLibrary { arity: *arity },
            ComponentKind::Verifier {
                capacity,
                variant: VerifierVariant::Real,
                ..
            } => ContractRef::artifact(format!("Verifier{capacity}")),
            ComponentKind::Verifier {
                variant: VerifierVariant::Mock,
                ..
            } => ContractRef::artifact(MOCK_VERIFIER_ARTIFACT),
            ComponentKind::Main => ContractRef::artifact(MAIN_ARTIFACT),
        }
    }

    pub fn is_upgradeable(&self) -> bool {
        matches!(self.kind, ComponentKind::Main)
    }
}

/// A resolved component. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedComponent {
    pub spec: ComponentSpec,
    pub address: Address,
    /// `false` when the address came from the registry.
    pub freshly_deployed: bool,
}

impl DeployedComponent {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}
