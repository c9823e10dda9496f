//! Deploy parameters file.
//!
//! Same layout as the Hardhat-era `deploy_parameters.json`: a few top-level
//! settings plus one section per chain id.
//!
//! ```json
//! {
//!   "hardhatNetwork": "localhost",
//!   "test": true,
//!   "85": {
//!     "depositTokenAddress": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
//!     "maxTxVerifier": [8],
//!     "nLevelsVerifer": [32],
//!     "verifierType": ["mock"]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::component::VerifierVariant;
use crate::domain::error::{DeployError, Result};

/// Output file name used when `pathOutputJson` is not set.
pub const DEFAULT_OUTPUT_FILE: &str = "deploy_output.json";

/// Per-chain section of the parameters file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParameters {
    #[serde(default)]
    pub deposit_token_address: Option<Address>,

    /// Capacity class of each verifier slot. Numbers, or decimal / `0x`
    /// strings for values beyond 64 bits; the range check happens at encoding.
    #[serde(default, with = "capacity_list")]
    pub max_tx_verifier: Option<Vec<U256>>,

    /// Tree depth of each verifier slot (key spelling is historical).
    #[serde(default, rename = "nLevelsVerifer")]
    pub n_levels_verifier: Option<Vec<u64>>,

    #[serde(default)]
    pub verifier_type: Option<Vec<VerifierVariant>>,

    /// Previously deployed Poseidon libraries, arities 2..=5 in order.
    #[serde(default)]
    pub lib_poseidons_address: Option<Vec<Address>>,

    /// Previously deployed verifiers, in slot order.
    #[serde(default)]
    pub lib_verifiers_address: Option<Vec<Address>>,

    #[serde(default)]
    pub ins_acc_id: Option<u64>,

    #[serde(default)]
    pub fee_acc_id: Option<u64>,
}

mod capacity_list {
    use ethers::types::U256;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCapacity {
        Number(u64),
        Text(String),
        /// JSON numbers outside `u64` (too large, negative or fractional).
        Float(f64),
    }

    fn parse(raw: RawCapacity) -> Result<U256, String> {
        match raw {
            RawCapacity::Number(n) => Ok(U256::from(n)),
            RawCapacity::Text(text) => {
                let text = text.trim();
                let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| e.to_string()),
                    None => U256::from_dec_str(text).map_err(|e| e.to_string()),
                };
                parsed.map_err(|e| format!("invalid maxTxVerifier entry \"{text}\": {e}"))
            }
            RawCapacity::Float(value) => Err(format!(
                "invalid maxTxVerifier entry {value}: capacities are non-negative integers; \
                 write values above 2^64 as decimal strings"
            )),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<U256>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Vec<RawCapacity>> = Option::deserialize(deserializer)?;
        raw.map(|items| items.into_iter().map(parse).collect::<Result<Vec<_>, _>>())
            .transpose()
            .map_err(de::Error::custom)
    }

    /// Numbers while they fit `u64`, decimal strings above.
    struct Written<'a>(&'a U256);

    impl Serialize for Written<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if self.0.bits() <= 64 {
                serializer.serialize_u64(self.0.as_u64())
            } else {
                serializer.serialize_str(&self.0.to_string())
            }
        }
    }

    pub fn serialize<S>(value: &Option<Vec<U256>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(list) => serializer.collect_seq(list.iter().map(Written)),
            None => serializer.serialize_none(),
        }
    }
}

/// Whole parameters document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployParameters {
    #[serde(default)]
    pub hardhat_network: Option<String>,

    #[serde(default)]
    pub path_output_json: Option<PathBuf>,

    /// Passed through to the output record.
    #[serde(default)]
    pub mnemonic: Option<serde_json::Value>,

    /// Passed through to the output record.
    #[serde(default)]
    pub test: Option<serde_json::Value>,

    /// Sections keyed by decimal chain id.
    #[serde(flatten)]
    pub chains: BTreeMap<String, ChainParameters>,
}

impl DeployParameters {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| DeployError::Configuration(format!("invalid parameters file: {e}")))
    }

    /// Section for `chain_id`, or a configuration error if there is none.
    pub fn chain(&self, chain_id: u64) -> Result<&ChainParameters> {
        self.chains.get(&chain_id.to_string()).ok_or_else(|| {
            DeployError::Configuration(format!(
                "no parameters for chain id {chain_id} (sections present: {})",
                self.chains.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Mnemonic phrase, when the `mnemonic` field is a string.
    pub fn mnemonic_phrase(&self) -> Option<&str> {
        self.mnemonic.as_ref().and_then(|value| value.as_str())
    }
}

/// A parameters document together with where it came from.
#[derive(Debug, Clone)]
pub struct ParametersFile {
    pub path: PathBuf,
    /// SHA-256 of the raw file contents, recorded as provenance.
    pub digest: String,
    pub parameters: DeployParameters,
}

impl ParametersFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|e| {
            DeployError::Configuration(format!(
                "cannot read parameters file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_str(path, &raw)
    }

    pub fn from_str(path: impl Into<PathBuf>, raw: &str) -> Result<Self> {
        let parameters = DeployParameters::from_json(raw)?;
        Ok(Self {
            path: path.into(),
            digest: hex::encode(Sha256::digest(raw.as_bytes())),
            parameters,
        })
    }

    /// `pathOutputJson` when set, otherwise `deploy_output.json` next to the
    /// parameters file.
    pub fn output_path(&self) -> PathBuf {
        if let Some(path) = &self.parameters.path_output_json {
            return path.clone();
        }
        self.path
            .parent()
            .map(|dir| dir.join(DEFAULT_OUTPUT_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE))
    }
}
