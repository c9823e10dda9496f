//! Deployment run driver.
//!
//! Walks `Init → ComponentsResolving → ComponentsReady → MainDeployed →
//! MainInitialized → OutputWritten`. Every step awaits confirmation before
//! the next one starts, and everything a rerun needs to resume lives in the
//! registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ethers::types::Address;
use perp_registry::{AddressRegistry, ComponentGroup};
use tracing::{debug, info, warn, Instrument, Span};
use uuid::Uuid;

use crate::chain::{ChainClient, ChainError, MethodCall};
use crate::deployer::ComponentDeployer;
use crate::domain::component::{ComponentSpec, DeployedComponent, HASH_LIBRARY_ARITIES};
use crate::domain::error::{DeployError, Result, StageFailure};
use crate::domain::network::NetworkContext;
use crate::domain::output::{DeploymentOutputRecord, Provenance};
use crate::domain::parameters::ParametersFile;
use crate::domain::run::RunState;
use crate::main_component::{
    configured_marker, init_call, init_poseidon_key, init_verifier_key, initialized_marker,
    set_fee_acc_id_call, set_ins_acc_id_call, set_operator_call, INIT_ARGUMENT_PREFIX,
};
use crate::obs;
use crate::plan::RunPlan;

/// Everything a successful run resolved.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub run_id: String,
    pub network: NetworkContext,
    /// Arities 2..=5 in order.
    pub hash_libraries: Vec<DeployedComponent>,
    /// Slot order.
    pub verifiers: Vec<DeployedComponent>,
    pub main: DeployedComponent,
    /// `false` when a previous run had already initialized `main`.
    pub initialized_now: bool,
    pub output: DeploymentOutputRecord,
    pub output_path: PathBuf,
}

impl DeploymentReport {
    /// Components created by this run, in creation order.
    pub fn fresh(&self) -> Vec<&DeployedComponent> {
        self.hash_libraries
            .iter()
            .chain(&self.verifiers)
            .chain(std::iter::once(&self.main))
            .filter(|c| c.freshly_deployed)
            .collect()
    }
}

pub struct DeploymentOrchestrator {
    chain: Arc<dyn ChainClient>,
    registry: Arc<dyn AddressRegistry>,
    deployer: ComponentDeployer,
    state: RunState,
    run_id: String,
}

impl DeploymentOrchestrator {
    pub fn new(chain: Arc<dyn ChainClient>, registry: Arc<dyn AddressRegistry>) -> Self {
        let deployer = ComponentDeployer::new(chain.clone(), registry.clone());
        Self {
            chain,
            registry,
            deployer,
            state: RunState::Init,
            run_id: String::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the whole deployment for the connected chain.
    ///
    /// On failure the returned [`StageFailure`] names the last state reached;
    /// no output file is written.
    pub async fn run(
        &mut self,
        parameters: &ParametersFile,
        output_path: &Path,
    ) -> std::result::Result<DeploymentReport, StageFailure> {
        self.run_id = Uuid::new_v4().to_string();
        self.state = RunState::Init;
        let started = Instant::now();
        let span = obs::run_span(&self.run_id);
        obs::emit_run_started(&self.run_id, &parameters.path);

        let run_id = self.run_id.clone();
        match self.execute(parameters, output_path).instrument(span).await {
            Ok(report) => {
                obs::emit_run_finished(
                    &run_id,
                    started.elapsed().as_millis() as u64,
                    report.fresh().len(),
                    report.main.address,
                );
                Ok(report)
            }
            Err(error) => {
                obs::emit_run_failed(&run_id, self.state, &error);
                Err(StageFailure {
                    stage: self.state,
                    error,
                })
            }
        }
    }

    async fn execute(
        &mut self,
        parameters: &ParametersFile,
        output_path: &Path,
    ) -> Result<DeploymentReport> {
        let network = NetworkContext::resolve(self.chain.as_ref()).await?;
        Span::current().record("chain_id", network.chain_id);
        let plan = RunPlan::from_chain_parameters(parameters.parameters.chain(network.chain_id)?)?;
        info!(
            deployer = ?network.deployer,
            slots = plan.slot_count(),
            "deployment plan ready"
        );
        self.check_balance(&network).await?;
        self.seed_cached_addresses(&network, &plan).await?;
        self.advance(RunState::ComponentsResolving)?;

        let hash_libraries = self.deployer.deploy_hash_libraries(&network).await?;
        let verifiers = self.resolve_verifiers(&network, &plan).await?;
        self.advance(RunState::ComponentsReady)?;

        let main = self
            .deployer
            .resolve_or_deploy(&ComponentSpec::main(), &network)
            .await?;
        self.advance(RunState::MainDeployed)?;

        let initialized_now = self
            .initialize_main(&network, &plan, &main, &hash_libraries, &verifiers)
            .await?;
        self.configure_main(&network, &plan, &main).await?;
        self.advance(RunState::MainInitialized)?;

        let output = DeploymentOutputRecord {
            main_component_address: main.address,
            hardhat_network: parameters.parameters.hardhat_network.clone(),
            mnemonic: parameters.parameters.mnemonic.clone(),
            test: parameters.parameters.test.clone(),
            chain_id: network.chain_id,
            lib_poseidons_address: addresses(&hash_libraries),
            lib_verifiers_address: addresses(&verifiers),
            provenance: Provenance::new(network.deployer, parameters.digest.clone()),
        };
        self.write_output(&output, output_path)?;

        Ok(DeploymentReport {
            run_id: self.run_id.clone(),
            network,
            hash_libraries,
            verifiers,
            main,
            initialized_now,
            output,
            output_path: output_path.to_path_buf(),
        })
    }

    /// Persist the output record. Allowed once the main component is
    /// initialized, and again after it was written.
    pub fn write_output(&mut self, record: &DeploymentOutputRecord, path: &Path) -> Result<()> {
        match self.state {
            RunState::MainInitialized | RunState::OutputWritten => {}
            from => {
                return Err(DeployError::InvalidTransition {
                    from,
                    to: RunState::OutputWritten,
                })
            }
        }
        record.write_to(path)?;
        info!(path = %path.display(), main = ?record.main_component_address, "output record written");
        if self.state == RunState::MainInitialized {
            self.advance(RunState::OutputWritten)?;
        }
        Ok(())
    }

    fn advance(&mut self, to: RunState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(DeployError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        obs::emit_stage_entered(&self.run_id, to);
        Ok(())
    }

    async fn check_balance(&self, network: &NetworkContext) -> Result<()> {
        let balance = self.chain.balance(network.deployer).await?;
        if balance.is_zero() {
            warn!(deployer = ?network.deployer, "deployer has no funds");
        } else {
            info!(
                deployer = ?network.deployer,
                balance = %ethers::utils::format_ether(balance),
                "deployer balance"
            );
        }
        Ok(())
    }

    /// Record addresses listed in the parameters file so they are reused.
    async fn seed_cached_addresses(&self, network: &NetworkContext, plan: &RunPlan) -> Result<()> {
        if let Some(poseidons) = &plan.cached_poseidons {
            for (arity, address) in HASH_LIBRARY_ARITIES.iter().zip(poseidons) {
                let spec = ComponentSpec::hash_library(*arity);
                self.registry
                    .record(network.chain_id, &spec.name, *address)
                    .await?;
            }
            debug!("seeded hash libraries from parameters");
        }
        if let Some(verifiers) = &plan.cached_verifiers {
            for (spec, address) in plan.verifiers.iter().zip(verifiers) {
                self.registry
                    .record(network.chain_id, &spec.name, *address)
                    .await?;
            }
            debug!("seeded verifiers from parameters");
        }
        Ok(())
    }

    async fn resolve_verifiers(
        &self,
        network: &NetworkContext,
        plan: &RunPlan,
    ) -> Result<Vec<DeployedComponent>> {
        let complete = self
            .registry
            .is_complete(network.chain_id, ComponentGroup::Verifiers, plan.slot_count())
            .await?;
        debug!(complete, slots = plan.slot_count(), "verifier group");

        let mut verifiers = Vec::with_capacity(plan.slot_count());
        for spec in &plan.verifiers {
            verifiers.push(self.deployer.resolve_or_deploy(spec, network).await?);
        }
        Ok(verifiers)
    }

    /// Call the one-shot initializer unless a previous run already did.
    ///
    /// Skipping is only allowed when the earlier `init` received exactly the
    /// components resolved now; anything else fails instead of reporting
    /// addresses the main component does not use.
    async fn initialize_main(
        &self,
        network: &NetworkContext,
        plan: &RunPlan,
        main: &DeployedComponent,
        hash_libraries: &[DeployedComponent],
        verifiers: &[DeployedComponent],
    ) -> Result<bool> {
        let marker = initialized_marker();
        let arguments = init_arguments(hash_libraries, verifiers);
        if self.registry.resolve(network.chain_id, &marker).await? == Some(main.address) {
            self.check_init_arguments(network, main, &arguments).await?;
            obs::emit_main_initialized(main.address, true);
            return Ok(false);
        }

        let call = init_call(
            network.deployer,
            plan.deposit_token,
            &addresses(verifiers),
            &plan.max_tx_levels,
            &addresses(hash_libraries),
        );
        debug!(calldata = %hex::encode(call.calldata()), "init calldata");
        match self.chain.call_method(main.address, &call).await {
            Ok(receipt) => debug!(tx = ?receipt.tx_hash, "init confirmed"),
            Err(ChainError::Reverted { reason }) => {
                return Err(DeployError::InitializationRejected {
                    address: main.address,
                    reason,
                })
            }
            Err(source) => {
                return Err(DeployError::CallFailed {
                    method: call.name().to_string(),
                    address: main.address,
                    source,
                })
            }
        }

        self.record_init_arguments(network, &arguments).await?;
        self.registry
            .record(network.chain_id, &marker, main.address)
            .await?;
        obs::emit_main_initialized(main.address, false);
        Ok(true)
    }

    async fn recorded_init_arguments(
        &self,
        network: &NetworkContext,
    ) -> Result<BTreeMap<String, Address>> {
        Ok(self
            .registry
            .entries(network.chain_id)
            .await?
            .into_iter()
            .filter(|(name, _)| name.starts_with(INIT_ARGUMENT_PREFIX))
            .collect())
    }

    /// Replace whatever an earlier main component's `init` left behind.
    async fn record_init_arguments(
        &self,
        network: &NetworkContext,
        arguments: &[(String, &DeployedComponent)],
    ) -> Result<()> {
        for name in self.recorded_init_arguments(network).await?.keys() {
            self.registry.clear(network.chain_id, name).await?;
        }
        for (name, component) in arguments {
            self.registry
                .record(network.chain_id, name, component.address)
                .await?;
        }
        Ok(())
    }

    async fn check_init_arguments(
        &self,
        network: &NetworkContext,
        main: &DeployedComponent,
        arguments: &[(String, &DeployedComponent)],
    ) -> Result<()> {
        let mismatch = |detail: String| DeployError::InitializedWithOtherComponents {
            address: main.address,
            detail,
        };

        if let Some((_, fresh)) = arguments.iter().find(|(_, c)| c.freshly_deployed) {
            return Err(mismatch(format!("{} was deployed by this run", fresh.name())));
        }

        let recorded = self.recorded_init_arguments(network).await?;
        if recorded.is_empty() {
            warn!(
                main = ?main.address,
                "initializer arguments not recorded; trusting reused components"
            );
            return Ok(());
        }
        for (name, component) in arguments {
            match recorded.get(name) {
                Some(address) if *address == component.address => {}
                Some(address) => {
                    return Err(mismatch(format!(
                        "{} resolved to {:?}, init received {address:?}",
                        component.name(),
                        component.address
                    )))
                }
                None => {
                    return Err(mismatch(format!(
                        "{} resolved to {:?}, init received nothing in its position",
                        component.name(),
                        component.address
                    )))
                }
            }
        }
        if recorded.len() != arguments.len() {
            return Err(mismatch(format!(
                "init received {} component addresses, this run resolved {}",
                recorded.len(),
                arguments.len()
            )));
        }
        Ok(())
    }

    /// Operator role and account identifiers.
    async fn configure_main(
        &self,
        network: &NetworkContext,
        plan: &RunPlan,
        main: &DeployedComponent,
    ) -> Result<()> {
        let marker = configured_marker();
        if self.registry.resolve(network.chain_id, &marker).await? == Some(main.address) {
            debug!("main component already configured");
            return Ok(());
        }

        let calls = [
            set_operator_call(network.deployer),
            set_ins_acc_id_call(plan.ins_acc_id),
            set_fee_acc_id_call(plan.fee_acc_id),
        ];
        for call in &calls {
            self.send(main.address, call).await?;
        }

        self.registry
            .record(network.chain_id, &marker, main.address)
            .await?;
        info!(
            operator = ?network.deployer,
            ins_acc_id = plan.ins_acc_id,
            fee_acc_id = plan.fee_acc_id,
            "main component configured"
        );
        Ok(())
    }

    async fn send(&self, address: Address, call: &MethodCall) -> Result<()> {
        let receipt = self
            .chain
            .call_method(address, call)
            .await
            .map_err(|source| DeployError::CallFailed {
                method: call.name().to_string(),
                address,
                source,
            })?;
        debug!(method = call.name(), tx = ?receipt.tx_hash, "call confirmed");
        Ok(())
    }
}

/// Registry name of each `init` array position, paired with the component
/// passed there.
fn init_arguments<'a>(
    hash_libraries: &'a [DeployedComponent],
    verifiers: &'a [DeployedComponent],
) -> Vec<(String, &'a DeployedComponent)> {
    hash_libraries
        .iter()
        .enumerate()
        .map(|(index, c)| (init_poseidon_key(index), c))
        .chain(
            verifiers
                .iter()
                .enumerate()
                .map(|(slot, c)| (init_verifier_key(slot), c)),
        )
        .collect()
}

fn addresses(components: &[DeployedComponent]) -> Vec<Address> {
    components.iter().map(|c| c.address).collect()
}
