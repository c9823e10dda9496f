//! Named network profiles.
//!
//! The names match the `hardhatNetwork` values used in parameters files, so a
//! file written for the Hardhat tooling selects the same endpoint here.

use serde::Serialize;

use crate::error::{Result, SetupError};

/// Infura-hosted public networks.
const INFURA_NETWORKS: [&str; 4] = ["mainnet", "rinkeby", "goerli", "ropsten"];

/// Local and shared development endpoints.
const LOCAL_NETWORKS: [(&str, &str); 6] = [
    ("hardhat", "http://127.0.0.1:8545"),
    ("localhost", "http://127.0.0.1:8545"),
    ("reporter", "http://127.0.0.1:8545"),
    ("coverage", "http://127.0.0.1:8555"),
    ("ganache", "http://127.0.0.1:8565"),
    ("localhostMnemonic", "http://139.162.15.16:6060"),
];

/// Environment variable holding the Infura project id.
pub const INFURA_PROJECT_ID_VAR: &str = "INFURA_PROJECT_ID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkProfile {
    pub name: String,
    pub rpc_url: String,
}

impl NetworkProfile {
    /// Resolve a network name. `infura_project_id` is only needed for the
    /// Infura-hosted networks.
    pub fn named(name: &str, infura_project_id: Option<&str>) -> Result<Self> {
        if let Some((_, url)) = LOCAL_NETWORKS.iter().find(|(n, _)| *n == name) {
            return Ok(Self {
                name: name.to_string(),
                rpc_url: url.to_string(),
            });
        }

        if INFURA_NETWORKS.contains(&name) {
            let project_id = infura_project_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| SetupError::MissingEnv {
                    network: name.to_string(),
                    variable: INFURA_PROJECT_ID_VAR.to_string(),
                })?;
            return Ok(Self {
                name: name.to_string(),
                rpc_url: format!("https://{name}.infura.io/v3/{project_id}"),
            });
        }

        Err(SetupError::UnknownNetwork {
            name: name.to_string(),
            known: known_networks().join(", "),
        })
    }

    /// Explicit endpoint, bypassing the named profiles.
    pub fn custom(rpc_url: impl Into<String>) -> Self {
        Self {
            name: "custom".to_string(),
            rpc_url: rpc_url.into(),
        }
    }
}

pub fn known_networks() -> Vec<&'static str> {
    LOCAL_NETWORKS
        .iter()
        .map(|(name, _)| *name)
        .chain(INFURA_NETWORKS)
        .collect()
}
