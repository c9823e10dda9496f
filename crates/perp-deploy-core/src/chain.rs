//! Chain collaborator interface.
//!
//! The orchestrator never talks to a node directly. Everything that touches
//! the chain goes through `ChainClient`, whose operations block until the
//! transaction is confirmed (or fail). A JSON-RPC implementation lives in the
//! `perp-chain` crate; `fakes::MemoryChainClient` is the in-memory one.

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, H256, U256};

/// Result type for chain operations
pub type ChainResult<T> = std::result::Result<T, ChainError>;

/// Errors surfaced by a chain client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },

    #[error("transaction was not confirmed: {0}")]
    NotConfirmed(String),

    #[error("contract artifact error: {0}")]
    Artifact(String),

    #[error("signer error: {0}")]
    Signer(String),
}

/// Reference to deployable bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContractRef {
    /// Poseidon hash library generated for `arity` inputs.
    PoseidonLibrary { arity: u8 },
    /// Compiled contract looked up by artifact name.
    Artifact(String),
}

impl ContractRef {
    pub fn artifact(name: impl Into<String>) -> Self {
        ContractRef::Artifact(name.into())
    }

    /// Name of the artifact file holding this contract's bytecode.
    pub fn artifact_name(&self) -> String {
        match self {
            ContractRef::PoseidonLibrary { arity } => format!("Poseidon{arity}Elements"),
            ContractRef::Artifact(name) => name.clone(),
        }
    }
}

impl std::fmt::Display for ContractRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.artifact_name())
    }
}

/// A state-changing method call: canonical signature plus ABI tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub signature: String,
    pub args: Vec<Token>,
}

impl MethodCall {
    pub fn new(signature: impl Into<String>, args: Vec<Token>) -> Self {
        Self {
            signature: signature.into(),
            args,
        }
    }

    /// Method name without the parameter list.
    pub fn name(&self) -> &str {
        self.signature
            .split_once('(')
            .map(|(name, _)| name)
            .unwrap_or(&self.signature)
    }

    /// First four bytes of `keccak256(signature)`.
    pub fn selector(&self) -> [u8; 4] {
        ethers::utils::id(&self.signature)
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn calldata(&self) -> Vec<u8> {
        let mut data = self.selector().to_vec();
        data.extend(ethers::abi::encode(&self.args));
        data
    }
}

/// Confirmation of a method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
}

/// Deployment / transaction submission service.
///
/// Every method returns only after the transaction is confirmed; a timeout or
/// a dropped transaction is an error, never a silent retry.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id of the connected network.
    async fn chain_id(&self) -> ChainResult<u64>;

    /// Account that signs every transaction of the run.
    async fn deployer(&self) -> ChainResult<Address>;

    /// Native balance of `address`.
    async fn balance(&self, address: Address) -> ChainResult<U256>;

    /// Create a contract and return its confirmed address.
    async fn create_contract(
        &self,
        contract: &ContractRef,
        constructor_args: &[Token],
    ) -> ChainResult<Address>;

    /// Create `contract` behind an upgradeable proxy without running any
    /// initializer. Returns the proxy address.
    async fn create_upgradeable(&self, contract: &ContractRef) -> ChainResult<Address>;

    /// Send a state-changing call and wait for its receipt.
    async fn call_method(&self, address: Address, call: &MethodCall) -> ChainResult<CallReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_erc20_transfer() {
        let call = MethodCall::new("transfer(address,uint256)", vec![]);
        assert_eq!(call.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(call.name(), "transfer");
    }

    #[test]
    fn calldata_is_selector_plus_words() {
        let call = MethodCall::new(
            "setFeeAccId(uint48)",
            vec![Token::Uint(U256::from(13084326u64))],
        );
        let data = call.calldata();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &call.selector());
        assert_eq!(U256::from_big_endian(&data[4..]), U256::from(13084326u64));
    }

    #[test]
    fn poseidon_artifact_names() {
        assert_eq!(
            ContractRef::PoseidonLibrary { arity: 3 }.artifact_name(),
            "Poseidon3Elements"
        );
        assert_eq!(ContractRef::artifact("Verifier400").to_string(), "Verifier400");
    }
}
