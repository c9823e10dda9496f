//! Run plan: validated, defaulted view of one chain's parameters.
//!
//! Everything that can be rejected without touching the chain is rejected
//! here, including the packed parameter range checks.

use ethers::types::{Address, U256};
use tracing::warn;

use crate::domain::component::{ComponentSpec, VerifierVariant, HASH_LIBRARY_ARITIES};
use crate::domain::error::{DeployError, Result};
use crate::domain::parameters::ChainParameters;
use crate::encoder::encode_max_tx_levels;
use crate::main_component::{DEFAULT_FEE_ACC_ID, DEFAULT_INS_ACC_ID, MAX_ACCOUNT_ID};

/// Capacity classes used when `maxTxVerifier` is absent.
pub const DEFAULT_MAX_TX: [u64; 3] = [8, 400, 2048];

/// Depth used for every slot when `nLevelsVerifer` is absent.
pub const DEFAULT_DEPTH_LEVELS: u64 = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub deposit_token: Address,
    /// One spec per verifier slot, in slot order.
    pub verifiers: Vec<ComponentSpec>,
    pub depth_levels: Vec<u64>,
    /// Packed `capacity + (depth << 248)` per slot.
    pub max_tx_levels: Vec<U256>,
    /// Poseidon addresses supplied by the parameters file (exactly four).
    pub cached_poseidons: Option<Vec<Address>>,
    /// Verifier addresses supplied by the parameters file (one per slot).
    pub cached_verifiers: Option<Vec<Address>>,
    pub ins_acc_id: u64,
    pub fee_acc_id: u64,
}

impl RunPlan {
    pub fn from_chain_parameters(params: &ChainParameters) -> Result<Self> {
        let deposit_token = params.deposit_token_address.ok_or_else(|| {
            DeployError::Configuration("depositTokenAddress is required".to_string())
        })?;

        let capacities = params
            .max_tx_verifier
            .clone()
            .unwrap_or_else(|| DEFAULT_MAX_TX.iter().copied().map(U256::from).collect());
        let slots = capacities.len();
        if slots == 0 {
            return Err(DeployError::Configuration(
                "maxTxVerifier must list at least one verifier slot".to_string(),
            ));
        }

        let depth_levels = params
            .n_levels_verifier
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_DEPTH_LEVELS; slots]);
        let variants = params
            .verifier_type
            .clone()
            .unwrap_or_else(|| vec![VerifierVariant::Real; slots]);

        if depth_levels.len() != slots || variants.len() != slots {
            return Err(DeployError::Configuration(format!(
                "verifier lists must have equal length: maxTxVerifier={slots}, nLevelsVerifer={}, verifierType={}",
                depth_levels.len(),
                variants.len()
            )));
        }

        let max_tx_levels = encode_max_tx_levels(&capacities, &depth_levels)?;

        let verifiers = capacities
            .iter()
            .zip(&variants)
            .enumerate()
            .map(|(slot, (capacity, variant))| ComponentSpec::verifier(slot, *capacity, *variant))
            .collect();

        let cached_poseidons = match &params.lib_poseidons_address {
            Some(list) if list.len() == HASH_LIBRARY_ARITIES.len() => Some(list.clone()),
            Some(list) => {
                warn!(
                    entries = list.len(),
                    "ignoring libPoseidonsAddress: expected exactly {} addresses",
                    HASH_LIBRARY_ARITIES.len()
                );
                None
            }
            None => None,
        };

        let cached_verifiers = match &params.lib_verifiers_address {
            Some(list) if list.len() == slots => Some(list.clone()),
            Some(list) if list.is_empty() => None,
            Some(list) => {
                warn!(
                    entries = list.len(),
                    slots, "ignoring libVerifiersAddress: one address per verifier slot expected"
                );
                None
            }
            None => None,
        };

        let ins_acc_id = checked_account_id("insAccId", params.ins_acc_id, DEFAULT_INS_ACC_ID)?;
        let fee_acc_id = checked_account_id("feeAccId", params.fee_acc_id, DEFAULT_FEE_ACC_ID)?;

        Ok(Self {
            deposit_token,
            verifiers,
            depth_levels,
            max_tx_levels,
            cached_poseidons,
            cached_verifiers,
            ins_acc_id,
            fee_acc_id,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.verifiers.len()
    }
}

fn checked_account_id(field: &str, value: Option<u64>, default: u64) -> Result<u64> {
    let id = value.unwrap_or(default);
    if id > MAX_ACCOUNT_ID {
        return Err(DeployError::Configuration(format!(
            "{field} {id} does not fit in 48 bits"
        )));
    }
    Ok(id)
}
