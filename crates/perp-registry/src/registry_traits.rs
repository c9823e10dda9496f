//! Registry trait definitions
//!
//! `AddressRegistry` maps `(chain id, component name)` to the address of a
//! previously deployed contract. The orchestrator consults it before every
//! deployment and records every confirmed creation, which is what makes a
//! rerun (or a resumed, interrupted run) idempotent.
//!
//! Component names are flat strings grouped by prefix:
//! - `poseidon:<arity>` for the hash-library group
//! - `verifier:<slot>:<capacity>:<variant>` for verifier slots
//! - `perpetual` for the main component, plus `perpetual#…` progress markers
//!   and the `perpetual#init:…` addresses its initializer received

use std::collections::BTreeMap;

use async_trait::async_trait;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Numeric chain identifier (EIP-155).
pub type ChainId = u64;

// ---------------------------------------------------------------------------
// ComponentGroup
// ---------------------------------------------------------------------------

/// Logical group of registry entries sharing a name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentGroup {
    /// Poseidon hash libraries, arities 2..=5.
    HashLibraries,
    /// Rollup verifier slots.
    Verifiers,
    /// The upgradeable main component and its progress markers.
    Main,
}

impl ComponentGroup {
    /// Name prefix shared by every entry of this group.
    pub fn prefix(&self) -> &'static str {
        match self {
            ComponentGroup::HashLibraries => "poseidon:",
            ComponentGroup::Verifiers => "verifier:",
            ComponentGroup::Main => "perpetual",
        }
    }

    /// Whether `name` belongs to this group.
    pub fn contains(&self, name: &str) -> bool {
        name.starts_with(self.prefix())
    }
}

impl std::fmt::Display for ComponentGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComponentGroup::HashLibraries => "hash_libraries",
            ComponentGroup::Verifiers => "verifiers",
            ComponentGroup::Main => "main",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// AddressRegistry
// ---------------------------------------------------------------------------

/// Per-chain component address registry.
///
/// Guarantees:
/// - `resolve` returns exactly what the last `record` for the same
///   `(chain_id, name)` stored, until `clear` removes it.
/// - Entries of different chains never interact.
/// - `is_complete` is true only when the group holds exactly `expected`
///   entries for the chain; fewer or more entries mean the group is
///   inconsistent and must be re-resolved.
#[async_trait]
pub trait AddressRegistry: Send + Sync {
    /// Look up a recorded address.
    async fn resolve(&self, chain_id: ChainId, name: &str) -> RegistryResult<Option<Address>>;

    /// Record (or overwrite) an address.
    async fn record(&self, chain_id: ChainId, name: &str, address: Address)
        -> RegistryResult<()>;

    /// Remove a recorded address. No-op if absent.
    async fn clear(&self, chain_id: ChainId, name: &str) -> RegistryResult<()>;

    /// All entries recorded for a chain, ordered by name.
    async fn entries(&self, chain_id: ChainId) -> RegistryResult<BTreeMap<String, Address>>;

    /// Whether `group` holds exactly `expected` entries on `chain_id`.
    async fn is_complete(
        &self,
        chain_id: ChainId,
        group: ComponentGroup,
        expected: usize,
    ) -> RegistryResult<bool> {
        let count = self
            .entries(chain_id)
            .await?
            .keys()
            .filter(|name| group.contains(name))
            .count();
        Ok(count == expected)
    }
}
