//! Deployment output record.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::error::{DeployError, Result};

/// Tool name recorded in provenance.
pub const TOOL_NAME: &str = concat!("perp-deploy/", env!("CARGO_PKG_VERSION"));

/// Where and by whom the record was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub deployer: Address,
    /// SHA-256 of the parameters file the run was driven by.
    pub parameters_digest: String,
}

impl Provenance {
    pub fn new(deployer: Address, parameters_digest: impl Into<String>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated_at: Utc::now(),
            deployer,
            parameters_digest: parameters_digest.into(),
        }
    }
}

/// Result of a successful run, written once as the last step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutputRecord {
    #[serde(alias = "perpAddress")]
    pub main_component_address: Address,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardhat_network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<serde_json::Value>,

    pub chain_id: u64,

    /// Poseidon libraries, arities 2..=5 in order.
    pub lib_poseidons_address: Vec<Address>,

    /// Verifiers in slot order.
    pub lib_verifiers_address: Vec<Address>,

    pub provenance: Provenance,
}

impl DeploymentOutputRecord {
    /// Write the record as pretty JSON. The file appears complete or not at all.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|e| DeployError::Io(e.error))?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
