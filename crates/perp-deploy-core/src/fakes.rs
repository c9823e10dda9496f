//! In-memory chain client (testing only)
//!
//! `MemoryChainClient` confirms every transaction instantly, hands out
//! sequential addresses starting at `0x…1000`, and keeps a journal of what
//! was created and called. It models the one-shot initializer: a second
//! `init` on the same address reverts.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, H256, U256};

use crate::chain::*;

/// Revert reason of an initializer called twice.
pub const ALREADY_INITIALIZED: &str = "Initializable: contract is already initialized";

const FIRST_ADDRESS: u64 = 0x1000;

/// A confirmed contract creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Creation {
    pub contract: ContractRef,
    pub address: Address,
    pub constructor_args: Vec<Token>,
    pub upgradeable: bool,
}

/// A confirmed method call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub address: Address,
    pub call: MethodCall,
}

#[derive(Debug, Default)]
struct ChainState {
    nonce: u64,
    creations: Vec<Creation>,
    calls: Vec<RecordedCall>,
    initialized: HashSet<Address>,
    failing_creations: Vec<ContractRef>,
    rejected_methods: HashMap<String, String>,
}

impl ChainState {
    fn next_hash(&mut self) -> H256 {
        self.nonce += 1;
        H256::from_low_u64_be(self.nonce)
    }
}

/// In-memory chain with instant confirmation.
#[derive(Debug)]
pub struct MemoryChainClient {
    chain_id: u64,
    deployer: Address,
    state: Mutex<ChainState>,
}

impl MemoryChainClient {
    pub fn new(chain_id: u64) -> Self {
        Self::with_deployer(chain_id, Address::from_low_u64_be(0xde91))
    }

    pub fn with_deployer(chain_id: u64, deployer: Address) -> Self {
        Self {
            chain_id,
            deployer,
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Make the next creation of `contract` fail without confirming.
    pub fn fail_next_creation_of(&self, contract: ContractRef) {
        self.state.lock().unwrap().failing_creations.push(contract);
    }

    /// Revert every call to `method` (by name) with `reason`.
    pub fn reject_calls_to(&self, method: &str, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_methods
            .insert(method.to_string(), reason.to_string());
    }

    /// Undo [`Self::reject_calls_to`].
    pub fn accept_calls_to(&self, method: &str) {
        self.state.lock().unwrap().rejected_methods.remove(method);
    }

    /// Pretend `address` was initialized by someone else.
    pub fn mark_initialized(&self, address: Address) {
        self.state.lock().unwrap().initialized.insert(address);
    }

    pub fn creations(&self) -> Vec<Creation> {
        self.state.lock().unwrap().creations.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Confirmed calls of `method` (by name).
    pub fn calls_named(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.call.name() == method)
            .collect()
    }

    fn create(
        &self,
        contract: &ContractRef,
        constructor_args: &[Token],
        upgradeable: bool,
    ) -> ChainResult<Address> {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.failing_creations.iter().position(|c| c == contract) {
            state.failing_creations.remove(pos);
            return Err(ChainError::NotConfirmed(format!(
                "creation of {contract} was dropped"
            )));
        }

        let address = Address::from_low_u64_be(FIRST_ADDRESS + state.creations.len() as u64);
        state.next_hash();
        state.creations.push(Creation {
            contract: contract.clone(),
            address,
            constructor_args: constructor_args.to_vec(),
            upgradeable,
        });
        Ok(address)
    }
}

#[async_trait]
impl ChainClient for MemoryChainClient {
    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(self.chain_id)
    }

    async fn deployer(&self) -> ChainResult<Address> {
        Ok(self.deployer)
    }

    async fn balance(&self, _address: Address) -> ChainResult<U256> {
        Ok(U256::exp10(21))
    }

    async fn create_contract(
        &self,
        contract: &ContractRef,
        constructor_args: &[Token],
    ) -> ChainResult<Address> {
        self.create(contract, constructor_args, false)
    }

    async fn create_upgradeable(&self, contract: &ContractRef) -> ChainResult<Address> {
        self.create(contract, &[], true)
    }

    async fn call_method(&self, address: Address, call: &MethodCall) -> ChainResult<CallReceipt> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.rejected_methods.get(call.name()) {
            return Err(ChainError::Reverted {
                reason: reason.clone(),
            });
        }
        if call.name() == "init" && !state.initialized.insert(address) {
            return Err(ChainError::Reverted {
                reason: ALREADY_INITIALIZED.to_string(),
            });
        }

        let tx_hash = state.next_hash();
        state.calls.push(RecordedCall {
            address,
            call: call.clone(),
        });
        Ok(CallReceipt {
            tx_hash,
            block_number: Some(state.nonce),
        })
    }
}
