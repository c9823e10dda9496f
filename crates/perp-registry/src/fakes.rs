//! In-memory registry
//!
//! `MemoryAddressRegistry` satisfies the `AddressRegistry` contract without
//! touching disk. The deploy command uses it when no registry file is given,
//! seeded from the addresses listed in the parameters file; tests use it
//! directly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::types::Address;

use crate::error::RegistryError;
use crate::registry_traits::*;

/// In-memory registry backed by a `HashMap<chain id, BTreeMap<name, address>>`.
#[derive(Debug, Default)]
pub struct MemoryAddressRegistry {
    chains: Mutex<HashMap<ChainId, BTreeMap<String, Address>>>,
}

impl MemoryAddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-populated with `entries` for one chain.
    pub fn with_entries<I, S>(chain_id: ChainId, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Address)>,
        S: Into<String>,
    {
        let registry = Self::new();
        {
            let mut chains = registry.chains.lock().unwrap();
            let chain = chains.entry(chain_id).or_default();
            for (name, address) in entries {
                chain.insert(name.into(), address);
            }
        }
        registry
    }

    /// Total number of entries across all chains.
    pub fn len(&self) -> usize {
        let chains = self.chains.lock().unwrap();
        chains.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AddressRegistry for MemoryAddressRegistry {
    async fn resolve(&self, chain_id: ChainId, name: &str) -> RegistryResult<Option<Address>> {
        let chains = self.chains.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(chains
            .get(&chain_id)
            .and_then(|chain| chain.get(name))
            .copied())
    }

    async fn record(
        &self,
        chain_id: ChainId,
        name: &str,
        address: Address,
    ) -> RegistryResult<()> {
        let mut chains = self.chains.lock().map_err(|_| RegistryError::LockPoisoned)?;
        chains
            .entry(chain_id)
            .or_default()
            .insert(name.to_string(), address);
        Ok(())
    }

    async fn clear(&self, chain_id: ChainId, name: &str) -> RegistryResult<()> {
        let mut chains = self.chains.lock().map_err(|_| RegistryError::LockPoisoned)?;
        if let Some(chain) = chains.get_mut(&chain_id) {
            chain.remove(name);
        }
        Ok(())
    }

    async fn entries(&self, chain_id: ChainId) -> RegistryResult<BTreeMap<String, Address>> {
        let chains = self.chains.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(chains.get(&chain_id).cloned().unwrap_or_default())
    }
}
