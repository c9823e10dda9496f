//! End-to-end runs of the orchestrator against the in-memory chain.

use std::path::PathBuf;
use std::sync::Arc;

use ethers::abi::Token;
use ethers::types::{Address, U256};
use perp_deploy_core::fakes::{MemoryChainClient, ALREADY_INITIALIZED};
use perp_deploy_core::main_component::{DEFAULT_FEE_ACC_ID, DEFAULT_INS_ACC_ID};
use perp_deploy_core::{
    ContractRef, DeployError, DeploymentOrchestrator, DeploymentOutputRecord, EncodingRangeError,
    ParametersFile, RunState, DEPTH_SHIFT,
};
use perp_registry::{AddressRegistry, JsonFileRegistry, MemoryAddressRegistry};
use tempfile::TempDir;

const CHAIN: u64 = 85;
const TOKEN: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

struct Harness {
    chain: Arc<MemoryChainClient>,
    registry: Arc<dyn AddressRegistry>,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_registry(Arc::new(MemoryAddressRegistry::new()))
    }

    fn with_registry(registry: Arc<dyn AddressRegistry>) -> Self {
        Self {
            chain: Arc::new(MemoryChainClient::new(CHAIN)),
            registry,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn parameters(&self, chain_section: serde_json::Value) -> ParametersFile {
        let raw = serde_json::json!({
            "hardhatNetwork": "localhost",
            "test": true,
            CHAIN.to_string(): chain_section,
        })
        .to_string();
        ParametersFile::from_str(self.dir.path().join("deploy_parameters.json"), &raw).unwrap()
    }

    fn output_path(&self) -> PathBuf {
        self.dir.path().join("deploy_output.json")
    }

    fn orchestrator(&self) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(self.chain.clone(), self.registry.clone())
    }
}

fn mock_single_slot() -> serde_json::Value {
    serde_json::json!({
        "depositTokenAddress": TOKEN,
        "maxTxVerifier": [8],
        "nLevelsVerifer": [32],
        "verifierType": ["mock"],
    })
}

fn address_tokens(addresses: &[Address]) -> Token {
    Token::Array(addresses.iter().copied().map(Token::Address).collect())
}

#[tokio::test]
async fn single_mock_slot_from_empty_registry() {
    let h = Harness::new();
    let params = h.parameters(mock_single_slot());

    let report = h
        .orchestrator()
        .run(&params, &h.output_path())
        .await
        .expect("run succeeds");

    let creations = h.chain.creations();
    assert_eq!(creations.len(), 6);
    for (creation, arity) in creations.iter().zip([2u8, 3, 4, 5]) {
        assert_eq!(creation.contract, ContractRef::PoseidonLibrary { arity });
    }
    assert_eq!(creations[4].contract, ContractRef::artifact("VerifierRollupHelper"));
    assert_eq!(creations[5].contract, ContractRef::artifact("Perpetual"));
    assert!(creations[5].upgradeable);
    assert_eq!(report.fresh().len(), 6);

    let inits = h.chain.calls_named("init");
    assert_eq!(inits.len(), 1);
    assert_eq!(inits[0].address, report.main.address);
    let expected = U256::from(8u64) + (U256::from(32u64) << DEPTH_SHIFT);
    assert_eq!(inits[0].call.args[3], Token::Array(vec![Token::Uint(expected)]));
    assert_eq!(
        inits[0].call.args[1],
        Token::Address(TOKEN.parse::<Address>().unwrap())
    );

    let written = DeploymentOutputRecord::read_from(&h.output_path()).unwrap();
    assert_eq!(written.main_component_address, report.main.address);
    assert_eq!(written.chain_id, CHAIN);
    assert_eq!(written.hardhat_network.as_deref(), Some("localhost"));
    assert_eq!(written.test, Some(serde_json::Value::Bool(true)));
    assert_eq!(written.provenance.parameters_digest, params.digest);
}

#[tokio::test]
async fn initializer_arguments_follow_slot_and_arity_order() {
    let h = Harness::new();
    let params = h.parameters(serde_json::json!({
        "depositTokenAddress": TOKEN,
        "maxTxVerifier": [8, 400, 2048],
        "nLevelsVerifer": [32, 32, 32],
    }));

    let report = h.orchestrator().run(&params, &h.output_path()).await.unwrap();

    let creations = h.chain.creations();
    let verifier_addresses: Vec<Address> = ["Verifier8", "Verifier400", "Verifier2048"]
        .iter()
        .map(|name| {
            creations
                .iter()
                .find(|c| c.contract == ContractRef::artifact(*name))
                .expect("verifier created")
                .address
        })
        .collect();
    let poseidon_addresses: Vec<Address> = creations[..4].iter().map(|c| c.address).collect();

    let init = &h.chain.calls_named("init")[0];
    assert_eq!(init.call.args[0], Token::Address(report.network.deployer));
    assert_eq!(init.call.args[2], address_tokens(&verifier_addresses));
    assert_eq!(init.call.args[4], address_tokens(&poseidon_addresses));
    assert_eq!(report.output.lib_verifiers_address, verifier_addresses);
}

#[tokio::test]
async fn follow_up_calls_assign_operator_and_account_ids() {
    let h = Harness::new();
    let params = h.parameters(mock_single_slot());

    let report = h.orchestrator().run(&params, &h.output_path()).await.unwrap();

    let names: Vec<String> = h
        .chain
        .calls()
        .iter()
        .map(|c| c.call.name().to_string())
        .collect();
    assert_eq!(names, ["init", "setOperator", "setInsAccId", "setFeeAccId"]);

    let calls = h.chain.calls();
    assert!(calls.iter().all(|c| c.address == report.main.address));
    assert_eq!(calls[1].call.args, vec![Token::Address(report.network.deployer)]);
    assert_eq!(
        calls[2].call.args,
        vec![Token::Uint(U256::from(DEFAULT_INS_ACC_ID))]
    );
    assert_eq!(
        calls[3].call.args,
        vec![Token::Uint(U256::from(DEFAULT_FEE_ACC_ID))]
    );
}

#[tokio::test]
async fn account_ids_can_be_overridden_per_chain() {
    let h = Harness::new();
    let mut section = mock_single_slot();
    section["insAccId"] = serde_json::json!(11);
    section["feeAccId"] = serde_json::json!(12);
    let params = h.parameters(section);

    h.orchestrator().run(&params, &h.output_path()).await.unwrap();

    assert_eq!(
        h.chain.calls_named("setInsAccId")[0].call.args,
        vec![Token::Uint(U256::from(11u64))]
    );
    assert_eq!(
        h.chain.calls_named("setFeeAccId")[0].call.args,
        vec![Token::Uint(U256::from(12u64))]
    );
}

#[tokio::test]
async fn second_run_reuses_everything() {
    let h = Harness::new();
    let params = h.parameters(mock_single_slot());

    let first = h.orchestrator().run(&params, &h.output_path()).await.unwrap();
    let creations_after_first = h.chain.creations().len();

    let second = h.orchestrator().run(&params, &h.output_path()).await.unwrap();

    assert!(second.fresh().is_empty());
    assert!(!second.initialized_now);
    assert_eq!(h.chain.creations().len(), creations_after_first);
    assert_eq!(h.chain.calls_named("init").len(), 1);
    assert_eq!(h.chain.calls_named("setOperator").len(), 1);

    assert_eq!(
        second.output.main_component_address,
        first.output.main_component_address
    );
    assert_eq!(
        second.output.lib_poseidons_address,
        first.output.lib_poseidons_address
    );
    assert_eq!(
        second.output.lib_verifiers_address,
        first.output.lib_verifiers_address
    );
}

#[tokio::test]
async fn file_registry_makes_reruns_idempotent_across_processes() {
    let dir = tempfile::tempdir().unwrap();
    let registry_path = dir.path().join("registry.json");
    let chain = Arc::new(MemoryChainClient::new(CHAIN));
    let raw = serde_json::json!({ CHAIN.to_string(): mock_single_slot() }).to_string();
    let params = ParametersFile::from_str(dir.path().join("params.json"), &raw).unwrap();
    let output = dir.path().join("out.json");

    let registry = Arc::new(JsonFileRegistry::open(&registry_path).unwrap());
    let first = DeploymentOrchestrator::new(chain.clone(), registry)
        .run(&params, &output)
        .await
        .unwrap();

    let reopened = Arc::new(JsonFileRegistry::open(&registry_path).unwrap());
    let second = DeploymentOrchestrator::new(chain.clone(), reopened)
        .run(&params, &output)
        .await
        .unwrap();

    assert!(second.fresh().is_empty());
    assert_eq!(second.main.address, first.main.address);
    assert_eq!(chain.calls_named("init").len(), 1);
}

#[tokio::test]
async fn three_of_four_cached_hash_libraries_are_all_redeployed() {
    let cached: Vec<(String, Address)> = [2u8, 3, 4]
        .iter()
        .map(|arity| (format!("poseidon:{arity}"), Address::from_low_u64_be(*arity as u64)))
        .collect();
    let h = Harness::with_registry(Arc::new(MemoryAddressRegistry::with_entries(CHAIN, cached)));
    let params = h.parameters(mock_single_slot());

    let report = h.orchestrator().run(&params, &h.output_path()).await.unwrap();

    assert_eq!(report.hash_libraries.len(), 4);
    assert!(report.hash_libraries.iter().all(|c| c.freshly_deployed));
    let poseidon_creations = h
        .chain
        .creations()
        .iter()
        .filter(|c| matches!(c.contract, ContractRef::PoseidonLibrary { .. }))
        .count();
    assert_eq!(poseidon_creations, 4);
    assert!(!report
        .output
        .lib_poseidons_address
        .contains(&Address::from_low_u64_be(2)));
}

#[tokio::test]
async fn addresses_listed_in_parameters_are_reused() {
    let h = Harness::new();
    let poseidons: Vec<Address> = (0xa2..=0xa5).map(Address::from_low_u64_be).collect();
    let verifier = Address::from_low_u64_be(0xb0);
    let mut section = mock_single_slot();
    section["libPoseidonsAddress"] = serde_json::to_value(&poseidons).unwrap();
    section["libVerifiersAddress"] = serde_json::to_value([verifier]).unwrap();
    let params = h.parameters(section);

    let report = h.orchestrator().run(&params, &h.output_path()).await.unwrap();

    let creations = h.chain.creations();
    assert_eq!(creations.len(), 1);
    assert_eq!(creations[0].contract, ContractRef::artifact("Perpetual"));
    assert_eq!(report.output.lib_poseidons_address, poseidons);
    assert_eq!(report.output.lib_verifiers_address, vec![verifier]);
}

#[tokio::test]
async fn misaligned_lists_abort_before_any_deployment() {
    let h = Harness::new();
    let params = h.parameters(serde_json::json!({
        "depositTokenAddress": TOKEN,
        "maxTxVerifier": [8, 400],
        "nLevelsVerifer": [32, 32, 32],
    }));

    let failure = h
        .orchestrator()
        .run(&params, &h.output_path())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, RunState::Init);
    assert!(matches!(failure.error, DeployError::Configuration(_)));
    assert!(h.chain.creations().is_empty());
    assert!(h.chain.calls().is_empty());
    assert!(!h.output_path().exists());
}

#[tokio::test]
async fn missing_chain_section_is_configuration_error() {
    let h = Harness::new();
    let raw = serde_json::json!({ "1": mock_single_slot() }).to_string();
    let params = ParametersFile::from_str(h.dir.path().join("p.json"), &raw).unwrap();

    let failure = h
        .orchestrator()
        .run(&params, &h.output_path())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, RunState::Init);
    assert!(matches!(failure.error, DeployError::Configuration(_)));
    assert!(h.chain.creations().is_empty());
}

#[tokio::test]
async fn out_of_range_depth_aborts_before_any_deployment() {
    let h = Harness::new();
    let params = h.parameters(serde_json::json!({
        "depositTokenAddress": TOKEN,
        "maxTxVerifier": [8],
        "nLevelsVerifer": [300],
    }));

    let failure = h
        .orchestrator()
        .run(&params, &h.output_path())
        .await
        .unwrap_err();

    assert!(matches!(failure.error, DeployError::EncodingRange(_)));
    assert!(h.chain.creations().is_empty());
}

#[tokio::test]
async fn initializer_rejection_is_fatal() {
    let h = Harness::new();
    h.chain.reject_calls_to("init", "Pausable: paused");
    let params = h.parameters(mock_single_slot());

    let failure = h
        .orchestrator()
        .run(&params, &h.output_path())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, RunState::MainDeployed);
    assert!(matches!(
        failure.error,
        DeployError::InitializationRejected { ref reason, .. } if reason == "Pausable: paused"
    ));
    assert!(failure.to_string().contains("main_deployed"));
    assert!(h.chain.calls_named("setOperator").is_empty());
    assert!(!h.output_path().exists());
}

#[tokio::test]
async fn already_initialized_main_is_not_treated_as_done() {
    let main = Address::from_low_u64_be(0xfeed);
    let h = Harness::with_registry(Arc::new(MemoryAddressRegistry::with_entries(
        CHAIN,
        [("perpetual", main)],
    )));
    h.chain.mark_initialized(main);
    let params = h.parameters(mock_single_slot());

    let failure = h
        .orchestrator()
        .run(&params, &h.output_path())
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        DeployError::InitializationRejected { address, ref reason }
            if address == main && reason == ALREADY_INITIALIZED
    ));
    assert!(h
        .chain
        .creations()
        .iter()
        .all(|c| c.contract != ContractRef::artifact("Perpetual")));
    assert!(!h.output_path().exists());
}

#[tokio::test]
async fn changed_verifier_type_does_not_reuse_initialized_main() {
    let h = Harness::new();
    let first = h
        .orchestrator()
        .run(&h.parameters(mock_single_slot()), &h.output_path())
        .await
        .unwrap();

    let mut section = mock_single_slot();
    section["verifierType"] = serde_json::json!(["real"]);
    let second_output = h.dir.path().join("second_output.json");
    let failure = h
        .orchestrator()
        .run(&h.parameters(section), &second_output)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, RunState::MainDeployed);
    assert!(matches!(
        failure.error,
        DeployError::InitializedWithOtherComponents { address, ref detail }
            if address == first.main.address && detail.contains("verifier:0:8:real")
    ));
    assert_eq!(h.chain.calls_named("init").len(), 1);
    assert_eq!(h.chain.calls_named("setOperator").len(), 1);
    assert!(!second_output.exists());
}

#[tokio::test]
async fn replaced_hash_libraries_do_not_reuse_initialized_main() {
    let h = Harness::new();
    h.orchestrator()
        .run(&h.parameters(mock_single_slot()), &h.output_path())
        .await
        .unwrap();
    let creations_after_first = h.chain.creations().len();

    let mut section = mock_single_slot();
    let replacements: Vec<Address> = (0xa2..=0xa5).map(Address::from_low_u64_be).collect();
    section["libPoseidonsAddress"] = serde_json::to_value(&replacements).unwrap();
    let failure = h
        .orchestrator()
        .run(&h.parameters(section), &h.output_path())
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        DeployError::InitializedWithOtherComponents { ref detail, .. }
            if detail.contains("poseidon:2")
    ));
    assert_eq!(h.chain.creations().len(), creations_after_first);
    assert_eq!(h.chain.calls_named("init").len(), 1);
}

#[tokio::test]
async fn dropped_verifier_slot_does_not_reuse_initialized_main() {
    let h = Harness::new();
    let two_slots = serde_json::json!({
        "depositTokenAddress": TOKEN,
        "maxTxVerifier": [8, 400],
        "nLevelsVerifer": [32, 32],
        "verifierType": ["mock", "mock"],
    });
    h.orchestrator()
        .run(&h.parameters(two_slots), &h.output_path())
        .await
        .unwrap();

    let failure = h
        .orchestrator()
        .run(&h.parameters(mock_single_slot()), &h.output_path())
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        DeployError::InitializedWithOtherComponents { ref detail, .. }
            if detail.contains("init received 6 component addresses, this run resolved 5")
    ));
}

#[tokio::test]
async fn marker_without_recorded_arguments_trusts_reused_components() {
    let main = Address::from_low_u64_be(0xfeed);
    let mut entries: Vec<(String, Address)> = [2u64, 3, 4, 5]
        .iter()
        .map(|arity| (format!("poseidon:{arity}"), Address::from_low_u64_be(0xa0 + arity)))
        .collect();
    entries.push(("verifier:0:8:mock".to_string(), Address::from_low_u64_be(0xb0)));
    for name in ["perpetual", "perpetual#initialized", "perpetual#configured"] {
        entries.push((name.to_string(), main));
    }
    let h = Harness::with_registry(Arc::new(MemoryAddressRegistry::with_entries(CHAIN, entries)));

    let report = h
        .orchestrator()
        .run(&h.parameters(mock_single_slot()), &h.output_path())
        .await
        .unwrap();

    assert!(!report.initialized_now);
    assert_eq!(report.main.address, main);
    assert!(h.chain.creations().is_empty());
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn capacity_beyond_u64_reaches_the_range_check() {
    let h = Harness::new();
    let params = h.parameters(serde_json::json!({
        "depositTokenAddress": TOKEN,
        // 2^248
        "maxTxVerifier": ["452312848583266388373324160190187140051835877600158453279131187530910662656"],
        "nLevelsVerifer": [32],
    }));

    let failure = h
        .orchestrator()
        .run(&params, &h.output_path())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, RunState::Init);
    assert!(matches!(
        failure.error,
        DeployError::EncodingRange(EncodingRangeError::CapacityOutOfRange { index: 0, .. })
    ));
    assert!(h.chain.creations().is_empty());
}
