//! The artifact store finds every contract a deployment run asks for.

use std::fs;
use std::path::Path;

use perp_chain::ArtifactStore;
use perp_deploy_core::{ComponentSpec, VerifierVariant};

fn write_artifact(root: &Path, rel: &str, bytecode: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let body = serde_json::json!({ "abi": [], "bytecode": bytecode });
    fs::write(path, body.to_string()).unwrap();
}

#[test]
fn every_component_of_a_default_run_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for arity in 2..=5 {
        write_artifact(root, &format!("poseidon/Poseidon{arity}Elements.json"), "0x60");
    }
    for capacity in [8, 400, 2048] {
        let name = format!("Verifier{capacity}");
        write_artifact(root, &format!("contracts/verifiers/{name}.sol/{name}.json"), "0x61");
    }
    write_artifact(
        root,
        "contracts/test/VerifierRollupHelper.sol/VerifierRollupHelper.json",
        "0x62",
    );
    write_artifact(root, "contracts/Perpetual.sol/Perpetual.json", "0x63");
    write_artifact(root, "contracts/Perpetual.sol/Perpetual.dbg.json", "");

    let store = ArtifactStore::open(root).unwrap();

    let mut specs: Vec<ComponentSpec> = [2u8, 3, 4, 5]
        .into_iter()
        .map(ComponentSpec::hash_library)
        .collect();
    for (slot, capacity) in [8u64, 400, 2048].into_iter().enumerate() {
        specs.push(ComponentSpec::verifier(slot, capacity, VerifierVariant::Real));
        specs.push(ComponentSpec::verifier(slot, capacity, VerifierVariant::Mock));
    }
    specs.push(ComponentSpec::main());

    for spec in specs {
        let name = spec.contract_ref().artifact_name();
        let artifact = store
            .load(&name)
            .unwrap_or_else(|e| panic!("{} ({name}): {e}", spec.name));
        assert!(!artifact.bytecode(&name).unwrap().is_empty());
    }
}
