//! Deploy-or-resolve for single components and the Poseidon group.

use std::sync::Arc;

use perp_registry::{AddressRegistry, ComponentGroup};
use tracing::{debug, info};

use crate::chain::ChainClient;
use crate::domain::component::{ComponentSpec, DeployedComponent, HASH_LIBRARY_ARITIES};
use crate::domain::error::{DeployError, Result};
use crate::domain::network::NetworkContext;
use crate::obs;

/// Creates components on chain and keeps the registry in step with them.
///
/// Every confirmed creation is recorded before the next one starts, so a run
/// that aborts halfway leaves the registry describing exactly what exists.
pub struct ComponentDeployer {
    chain: Arc<dyn ChainClient>,
    registry: Arc<dyn AddressRegistry>,
}

impl ComponentDeployer {
    pub fn new(chain: Arc<dyn ChainClient>, registry: Arc<dyn AddressRegistry>) -> Self {
        Self { chain, registry }
    }

    /// Create `spec` unconditionally and record its address.
    pub async fn deploy(
        &self,
        spec: &ComponentSpec,
        network: &NetworkContext,
    ) -> Result<DeployedComponent> {
        let contract = spec.contract_ref();
        info!(component = %spec.name, contract = %contract, "deploying component");

        let created = if spec.is_upgradeable() {
            self.chain.create_upgradeable(&contract).await
        } else {
            self.chain.create_contract(&contract, &[]).await
        };
        let address = created.map_err(|source| DeployError::DeploymentFailure {
            component: spec.name.clone(),
            source,
        })?;

        self.registry
            .record(network.chain_id, &spec.name, address)
            .await?;
        obs::emit_component_resolved(&spec.name, address, true);

        Ok(DeployedComponent {
            spec: spec.clone(),
            address,
            freshly_deployed: true,
        })
    }

    /// Reuse the recorded address of `spec`, deploying it only when absent.
    pub async fn resolve_or_deploy(
        &self,
        spec: &ComponentSpec,
        network: &NetworkContext,
    ) -> Result<DeployedComponent> {
        match self.registry.resolve(network.chain_id, &spec.name).await? {
            Some(address) => {
                obs::emit_component_resolved(&spec.name, address, false);
                Ok(DeployedComponent {
                    spec: spec.clone(),
                    address,
                    freshly_deployed: false,
                })
            }
            None => self.deploy(spec, network).await,
        }
    }

    /// Resolve the Poseidon libraries, arities 2..=5 in order.
    ///
    /// The group is reused only when the registry holds exactly the four
    /// expected entries. Anything else (missing arities, strays) clears the
    /// group and deploys all four again.
    pub async fn deploy_hash_libraries(
        &self,
        network: &NetworkContext,
    ) -> Result<Vec<DeployedComponent>> {
        let specs: Vec<ComponentSpec> = HASH_LIBRARY_ARITIES
            .iter()
            .map(|arity| ComponentSpec::hash_library(*arity))
            .collect();
        let group = ComponentGroup::HashLibraries;

        if self
            .registry
            .is_complete(network.chain_id, group, specs.len())
            .await?
        {
            let mut cached = Vec::with_capacity(specs.len());
            for spec in &specs {
                match self.registry.resolve(network.chain_id, &spec.name).await? {
                    Some(address) => cached.push(DeployedComponent {
                        spec: spec.clone(),
                        address,
                        freshly_deployed: false,
                    }),
                    None => break,
                }
            }
            if cached.len() == specs.len() {
                for component in &cached {
                    obs::emit_component_resolved(component.name(), component.address, false);
                }
                return Ok(cached);
            }
        }

        let stale: Vec<String> = self
            .registry
            .entries(network.chain_id)
            .await?
            .into_keys()
            .filter(|name| group.contains(name))
            .collect();
        if !stale.is_empty() {
            info!(
                entries = stale.len(),
                "hash library group incomplete, redeploying all {}",
                specs.len()
            );
        }
        for name in &stale {
            debug!(component = %name, "clearing stale registry entry");
            self.registry.clear(network.chain_id, name).await?;
        }

        let mut deployed = Vec::with_capacity(specs.len());
        for spec in &specs {
            deployed.push(self.deploy(spec, network).await?);
        }
        Ok(deployed)
    }
}
