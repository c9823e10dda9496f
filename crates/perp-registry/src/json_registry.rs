//! File-backed address registry.
//!
//! Layout on disk (chain ids are decimal strings, names sorted):
//!
//! ```json
//! {
//!   "85": {
//!     "poseidon:2": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
//!     "perpetual": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"
//!   }
//! }
//! ```
//!
//! Every `record`/`clear` rewrites the whole file atomically (temp file in the
//! same directory, then rename), so an interrupted run never leaves a torn
//! registry behind and the next run can resume from it.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::types::Address;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::RegistryError;
use crate::registry_traits::*;

type ChainMap = BTreeMap<ChainId, BTreeMap<String, Address>>;

/// Registry persisted as a JSON document, written back on every mutation.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
    chains: Mutex<ChainMap>,
}

impl JsonFileRegistry {
    /// Open the registry at `path`. A missing file is an empty registry; it
    /// is created on the first `record`.
    pub fn open(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let chains = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            parse_chains(&raw)?
        } else {
            ChainMap::new()
        };
        debug!(path = %path.display(), chains = chains.len(), "registry loaded");
        Ok(Self {
            path,
            chains: Mutex::new(chains),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, chains: &ChainMap) -> RegistryResult<()> {
        let on_disk: BTreeMap<String, &BTreeMap<String, Address>> = chains
            .iter()
            .map(|(chain_id, entries)| (chain_id.to_string(), entries))
            .collect();
        let json = serde_json::to_string_pretty(&on_disk)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source| RegistryError::Io {
            path: self.path.clone(),
            source,
        };
        fs::create_dir_all(&dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.persist(&self.path)
            .map_err(|e| RegistryError::Persist {
                path: self.path.clone(),
                reason: e.error.to_string(),
            })?;
        Ok(())
    }
}

fn parse_chains(raw: &str) -> RegistryResult<ChainMap> {
    let on_disk: BTreeMap<String, BTreeMap<String, Address>> = serde_json::from_str(raw)?;
    on_disk
        .into_iter()
        .map(|(key, entries)| {
            key.parse::<ChainId>()
                .map(|chain_id| (chain_id, entries))
                .map_err(|_| RegistryError::InvalidChainKey { key })
        })
        .collect()
}

#[async_trait]
impl AddressRegistry for JsonFileRegistry {
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
        self.persist(&chains)?;
        debug!(chain_id, name, address = ?address, "registry entry recorded");
        Ok(())
    }

    async fn clear(&self, chain_id: ChainId, name: &str) -> RegistryResult<()> {
        let mut chains = self.chains.lock().map_err(|_| RegistryError::LockPoisoned)?;
        let removed = chains
            .get_mut(&chain_id)
            .and_then(|chain| chain.remove(name))
            .is_some();
        if removed {
            self.persist(&chains)?;
        }
        Ok(())
    }

    async fn entries(&self, chain_id: ChainId) -> RegistryResult<BTreeMap<String, Address>> {
        let chains = self.chains.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(chains.get(&chain_id).cloned().unwrap_or_default())
    }
}
