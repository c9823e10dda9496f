//! Network identity of a run.

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::chain::ChainClient;
use crate::domain::error::Result;

/// Chain and signing account of a run. Resolved once, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    pub chain_id: u64,
    pub deployer: Address,
}

impl NetworkContext {
    pub fn new(chain_id: u64, deployer: Address) -> Self {
        Self { chain_id, deployer }
    }

    /// Ask the chain client which network and account this run uses.
    pub async fn resolve(chain: &dyn ChainClient) -> Result<Self> {
        let chain_id = chain.chain_id().await?;
        let deployer = chain.deployer().await?;
        Ok(Self { chain_id, deployer })
    }
}
