//! `ChainClient` over JSON-RPC
//!
//! Transactions are signed locally, sent through `ethers`' signer middleware
//! (which fills nonce, gas and fees) and awaited until the configured number
//! of confirmations. A receipt with status 0 is a revert; a transaction that
//! disappears from the mempool is `NotConfirmed`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, U256, U64};
use perp_deploy_core::{CallReceipt, ChainClient, ChainError, ChainResult, ContractRef, MethodCall};
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::error::{Result, SetupError};
use crate::signer::SignerSource;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Artifact deployed in front of upgradeable implementations.
pub const DEFAULT_PROXY_ARTIFACT: &str = "ERC1967Proxy";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Blocks to wait after inclusion before a transaction counts as confirmed.
    pub confirmations: usize,
    pub poll_interval: Duration,
    pub proxy_artifact: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            confirmations: 1,
            poll_interval: Duration::from_millis(500),
            proxy_artifact: DEFAULT_PROXY_ARTIFACT.to_string(),
        }
    }
}

pub struct EthersChainClient {
    client: Arc<SignerClient>,
    chain_id: u64,
    artifacts: ArtifactStore,
    config: ClientConfig,
}

impl EthersChainClient {
    /// Connect to `rpc_url`, ask it for its chain id and bind the signer to it.
    pub async fn connect(
        rpc_url: &str,
        signer: &SignerSource,
        artifacts: ArtifactStore,
        config: ClientConfig,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| SetupError::Provider(format!("invalid RPC url {rpc_url}: {e}")))?
            .interval(config.poll_interval);
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| SetupError::Provider(e.to_string()))?
            .as_u64();
        let wallet = signer.wallet(chain_id)?;
        info!(chain_id, deployer = ?wallet.address(), rpc_url, "connected");

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            chain_id,
            artifacts,
            config,
        })
    }

    /// Sign, send and wait for confirmation.
    async fn send(&self, tx: TransactionRequest) -> ChainResult<TransactionReceipt> {
        let tx = tx.from(self.client.address());
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| classify(&e.to_string()))?;
        let tx_hash = *pending;
        debug!(tx = ?tx_hash, "transaction sent");

        let receipt = pending
            .confirmations(self.config.confirmations)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?
            .ok_or_else(|| {
                ChainError::NotConfirmed(format!("transaction {tx_hash:?} dropped from mempool"))
            })?;

        if receipt.status == Some(U64::zero()) {
            return Err(ChainError::Reverted {
                reason: format!("transaction {tx_hash:?} reverted"),
            });
        }
        Ok(receipt)
    }

    async fn deploy_bytecode(&self, name: &str, data: Bytes) -> ChainResult<Address> {
        let receipt = self.send(TransactionRequest::new().data(data)).await?;
        let address = receipt.contract_address.ok_or_else(|| {
            ChainError::NotConfirmed(format!(
                "creation of {name} confirmed without a contract address"
            ))
        })?;
        info!(contract = name, address = ?address, tx = ?receipt.transaction_hash, "contract created");
        Ok(address)
    }
}

#[async_trait]
impl ChainClient for EthersChainClient {
    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(self.chain_id)
    }

    async fn deployer(&self) -> ChainResult<Address> {
        Ok(self.client.address())
    }

    async fn balance(&self, address: Address) -> ChainResult<U256> {
        self.client
            .get_balance(address, None)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn create_contract(
        &self,
        contract: &ContractRef,
        constructor_args: &[Token],
    ) -> ChainResult<Address> {
        let name = contract.artifact_name();
        let data = self
            .artifacts
            .load(&name)
            .and_then(|artifact| artifact.deploy_data(&name, constructor_args))?;
        self.deploy_bytecode(&name, data).await
    }

    async fn create_upgradeable(&self, contract: &ContractRef) -> ChainResult<Address> {
        let implementation = self.create_contract(contract, &[]).await?;
        let proxy = ContractRef::artifact(self.config.proxy_artifact.clone());
        // empty init data: the initializer is called separately
        let address = self
            .create_contract(&proxy, &proxy_constructor_args(implementation))
            .await
            .map_err(|err| orphaned_implementation(implementation, &proxy, err))?;
        info!(implementation = ?implementation, proxy = ?address, "upgradeable component created");
        Ok(address)
    }

    async fn call_method(&self, address: Address, call: &MethodCall) -> ChainResult<CallReceipt> {
        debug!(method = call.name(), to = ?address, "sending call");
        let tx = TransactionRequest::new().to(address).data(call.calldata());
        let receipt = self.send(tx).await?;
        Ok(CallReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
        })
    }
}

/// `ERC1967Proxy(implementation, data)` with empty data.
fn proxy_constructor_args(implementation: Address) -> [Token; 2] {
    [Token::Address(implementation), Token::Bytes(Vec::new())]
}

/// The implementation is confirmed but unreachable without its proxy, and a
/// retry creates a new one. Surface its address before passing `err` on.
fn orphaned_implementation(
    implementation: Address,
    proxy: &ContractRef,
    err: ChainError,
) -> ChainError {
    warn!(
        implementation = ?implementation,
        proxy = %proxy.artifact_name(),
        error = %err,
        "proxy creation failed; implementation left unused"
    );
    err
}

/// Sort a send-time error into revert or transport failure. Nodes report
/// reverts during gas estimation as "execution reverted: <reason>".
fn classify(message: &str) -> ChainError {
    const MARKER: &str = "execution reverted";
    match message.find(MARKER) {
        Some(pos) => {
            let rest = message[pos + MARKER.len()..].trim_start_matches(':').trim();
            let reason = if rest.is_empty() { MARKER } else { rest };
            ChainError::Reverted {
                reason: reason.to_string(),
            }
        }
        None if message.contains("revert") => ChainError::Reverted {
            reason: message.to_string(),
        },
        None => ChainError::Transport(message.to_string()),
    }
}
