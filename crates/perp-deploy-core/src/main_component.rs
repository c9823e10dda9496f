//! Calls made on the main `Perpetual` component after it is created.

use ethers::abi::Token;
use ethers::types::{Address, U256};

use crate::chain::MethodCall;
use crate::domain::component::MAIN_COMPONENT_NAME;

pub const INIT_SIGNATURE: &str = "init(address,address,address[],uint256[],address[])";
pub const SET_OPERATOR_SIGNATURE: &str = "setOperator(address)";
pub const SET_INS_ACC_ID_SIGNATURE: &str = "setInsAccId(uint48)";
pub const SET_FEE_ACC_ID_SIGNATURE: &str = "setFeeAccId(uint48)";

/// Insurance account id assigned when the chain section does not set one.
pub const DEFAULT_INS_ACC_ID: u64 = 13_084_334;

/// Fee account id assigned when the chain section does not set one.
pub const DEFAULT_FEE_ACC_ID: u64 = 13_084_326;

/// Largest account id a `uint48` can hold.
pub const MAX_ACCOUNT_ID: u64 = (1 << 48) - 1;

/// Registry marker holding the main address once `init` has confirmed.
pub fn initialized_marker() -> String {
    format!("{MAIN_COMPONENT_NAME}#initialized")
}

/// Registry marker holding the main address once the follow-up calls confirmed.
pub fn configured_marker() -> String {
    format!("{MAIN_COMPONENT_NAME}#configured")
}

/// Prefix of the registry entries holding the addresses `init` received,
/// one entry per array position.
pub const INIT_ARGUMENT_PREFIX: &str = "perpetual#init:";

/// Registry name of the Poseidon address at `index` of the `init` call.
pub fn init_poseidon_key(index: usize) -> String {
    format!("{INIT_ARGUMENT_PREFIX}poseidon:{index}")
}

/// Registry name of the verifier address for `slot` of the `init` call.
pub fn init_verifier_key(slot: usize) -> String {
    format!("{INIT_ARGUMENT_PREFIX}verifier:{slot}")
}

fn address_array(addresses: &[Address]) -> Token {
    Token::Array(addresses.iter().copied().map(Token::Address).collect())
}

/// The one-shot initializer.
pub fn init_call(
    operator: Address,
    deposit_token: Address,
    verifiers: &[Address],
    max_tx_levels: &[U256],
    poseidons: &[Address],
) -> MethodCall {
    MethodCall::new(
        INIT_SIGNATURE,
        vec![
            Token::Address(operator),
            Token::Address(deposit_token),
            address_array(verifiers),
            Token::Array(max_tx_levels.iter().copied().map(Token::Uint).collect()),
            address_array(poseidons),
        ],
    )
}

pub fn set_operator_call(operator: Address) -> MethodCall {
    MethodCall::new(SET_OPERATOR_SIGNATURE, vec![Token::Address(operator)])
}

pub fn set_ins_acc_id_call(id: u64) -> MethodCall {
    MethodCall::new(SET_INS_ACC_ID_SIGNATURE, vec![Token::Uint(U256::from(id))])
}

pub fn set_fee_acc_id_call(id: u64) -> MethodCall {
    MethodCall::new(SET_FEE_ACC_ID_SIGNATURE, vec![Token::Uint(U256::from(id))])
}
