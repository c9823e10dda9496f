//! Compiled contract artifacts
//!
//! Reads Hardhat-style artifact files (`<Name>.json` with `abi` and a hex
//! `bytecode` string) from a directory tree. Foundry's `{"bytecode":
//! {"object": "0x…"}}` layout is accepted too. Hardhat's `*.dbg.json`
//! companions are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ethers::abi::{Abi, Token};
use ethers::types::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SetupError};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

impl BytecodeField {
    fn as_hex(&self) -> &str {
        match self {
            BytecodeField::Hex(hex) => hex,
            BytecodeField::Object { object } => object,
        }
    }
}

/// One compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    #[serde(default)]
    pub contract_name: Option<String>,
    pub abi: Abi,
    bytecode: BytecodeField,
}

impl ContractArtifact {
    /// Creation bytecode. Interfaces and abstract contracts have none.
    pub fn bytecode(&self, name: &str) -> Result<Bytes> {
        let raw = self.bytecode.as_hex();
        let raw = raw.strip_prefix("0x").unwrap_or(raw);
        if raw.contains("__") {
            return Err(SetupError::InvalidArtifact {
                name: name.to_string(),
                reason: "bytecode has unlinked library placeholders".to_string(),
            });
        }
        let code = hex::decode(raw).map_err(|e| SetupError::InvalidArtifact {
            name: name.to_string(),
            reason: format!("bytecode is not valid hex: {e}"),
        })?;
        if code.is_empty() {
            return Err(SetupError::InvalidArtifact {
                name: name.to_string(),
                reason: "bytecode is empty (interface or abstract contract?)".to_string(),
            });
        }
        Ok(code.into())
    }

    /// Bytecode followed by the ABI-encoded constructor arguments.
    pub fn deploy_data(&self, name: &str, constructor_args: &[Token]) -> Result<Bytes> {
        let code = self.bytecode(name)?;
        match self.abi.constructor() {
            Some(constructor) => constructor
                .encode_input(code.to_vec(), constructor_args)
                .map(Bytes::from)
                .map_err(|e| SetupError::InvalidArtifact {
                    name: name.to_string(),
                    reason: format!("constructor arguments rejected: {e}"),
                }),
            None if constructor_args.is_empty() => Ok(code),
            None => Err(SetupError::InvalidArtifact {
                name: name.to_string(),
                reason: format!(
                    "no constructor in ABI but {} arguments given",
                    constructor_args.len()
                ),
            }),
        }
    }
}

/// Index of artifact files under a root directory, keyed by file stem.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    index: BTreeMap<String, PathBuf>,
}

impl ArtifactStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SetupError::ArtifactDirNotFound(root));
        }
        let mut index = BTreeMap::new();
        scan(&root, &mut index)?;
        debug!(root = %root.display(), artifacts = index.len(), "artifact store indexed");
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn load(&self, name: &str) -> Result<ContractArtifact> {
        let path = self
            .index
            .get(name)
            .ok_or_else(|| SetupError::ArtifactNotFound(name.to_string()))?;
        let raw = fs::read_to_string(path).map_err(|source| SetupError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SetupError::Json {
            path: path.clone(),
            source,
        })
    }
}

fn scan(dir: &Path, index: &mut BTreeMap<String, PathBuf>) -> Result<()> {
    let io_err = |source| SetupError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::result::Result<_, _>>()
        .map_err(io_err)?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            scan(&path, index)?;
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.ends_with(".dbg.json") {
            continue;
        }
        if let Some(stem) = file_name.strip_suffix(".json") {
            // first match wins; sorted walk keeps it deterministic
            index.entry(stem.to_string()).or_insert_with(|| path.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    fn write(dir: &Path, rel: &str, body: serde_json::Value) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body.to_string()).unwrap();
    }

    fn proxy_artifact() -> serde_json::Value {
        serde_json::json!({
            "contractName": "ERC1967Proxy",
            "abi": [{
                "type": "constructor",
                "stateMutability": "payable",
                "inputs": [
                    { "name": "_logic", "type": "address", "internalType": "address" },
                    { "name": "_data", "type": "bytes", "internalType": "bytes" }
                ]
            }],
            "bytecode": "0x6080"
        })
    }

    #[test]
    fn indexes_nested_artifacts_and_skips_debug_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "contracts/Perpetual.sol/Perpetual.json",
            serde_json::json!({ "abi": [], "bytecode": "0x6001" }),
        );
        write(
            dir.path(),
            "contracts/Perpetual.sol/Perpetual.dbg.json",
            serde_json::json!({ "buildInfo": "x" }),
        );

        let store = ArtifactStore::open(dir.path()).unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["Perpetual"]);
        let artifact = store.load("Perpetual").unwrap();
        assert_eq!(artifact.bytecode("Perpetual").unwrap().to_vec(), vec![0x60, 0x01]);
    }

    #[test]
    fn missing_directory_and_artifact_are_errors() {
        assert!(matches!(
            ArtifactStore::open("/definitely/not/here"),
            Err(SetupError::ArtifactDirNotFound(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load("Verifier400"),
            Err(SetupError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn empty_bytecode_is_rejected() {
        let artifact: ContractArtifact =
            serde_json::from_value(serde_json::json!({ "abi": [], "bytecode": "0x" })).unwrap();
        assert!(matches!(
            artifact.bytecode("IVerifier"),
            Err(SetupError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn foundry_bytecode_object_is_accepted() {
        let artifact: ContractArtifact = serde_json::from_value(serde_json::json!({
            "abi": [],
            "bytecode": { "object": "0x60ff" }
        }))
        .unwrap();
        assert_eq!(artifact.bytecode("X").unwrap().to_vec(), vec![0x60, 0xff]);
    }

    #[test]
    fn constructor_arguments_are_appended() {
        let artifact: ContractArtifact = serde_json::from_value(proxy_artifact()).unwrap();
        let implementation = Address::from_low_u64_be(0x1234);

        let data = artifact
            .deploy_data(
                "ERC1967Proxy",
                &[Token::Address(implementation), Token::Bytes(vec![])],
            )
            .unwrap();

        assert_eq!(&data[..2], &[0x60, 0x80]);
        // address word, bytes offset word, bytes length word
        assert_eq!(data.len(), 2 + 3 * 32);
        assert_eq!(&data[2 + 12..2 + 32], implementation.as_bytes());
    }

    #[test]
    fn arguments_without_constructor_are_rejected() {
        let artifact: ContractArtifact =
            serde_json::from_value(serde_json::json!({ "abi": [], "bytecode": "0x6001" })).unwrap();
        assert!(artifact.deploy_data("Lib", &[Token::Bool(true)]).is_err());
        assert!(artifact.deploy_data("Lib", &[]).is_ok());
    }
}
