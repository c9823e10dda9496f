//! perp-chain: JSON-RPC backing for the deployment core
//!
//! ## Key Components
//!
//! - `EthersChainClient`: `ChainClient` over an `ethers` provider and local signer
//! - `ArtifactStore`: Hardhat/Foundry artifact lookup by contract name
//! - `NetworkProfile`: named endpoints (`localhost`, `ganache`, Infura networks, ...)
//! - `SignerSource`: private key / mnemonic selection

pub mod artifacts;
pub mod client;
mod error;
pub mod networks;
pub mod signer;

pub use artifacts::{ArtifactStore, ContractArtifact};
pub use client::{ClientConfig, EthersChainClient, DEFAULT_PROXY_ARTIFACT};
pub use error::{Result, SetupError};
pub use networks::{known_networks, NetworkProfile, INFURA_PROJECT_ID_VAR};
pub use signer::{SignerSource, DEFAULT_MNEMONIC};
