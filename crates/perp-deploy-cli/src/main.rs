//! perp-deploy - Perpetual rollup deployment CLI
//!
//! ## Commands
//!
//! - `deploy`: Deploy (or reuse) Poseidon libraries and verifiers, then create
//!   and initialize the upgradeable Perpetual component
//! - `encode`: Print the packed `maxTx`/`nLevels` words for a verifier table
//! - `registry`: Inspect or clear recorded component addresses

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ethers::types::U256;
use perp_chain::{
    ArtifactStore, ClientConfig, EthersChainClient, NetworkProfile, SignerSource,
    DEFAULT_PROXY_ARTIFACT,
};
use perp_deploy_core::{
    encode_max_tx_levels, DeployParameters, DeploymentOrchestrator, DeploymentReport,
    ParametersFile, PackedParameter,
};
use perp_registry::{AddressRegistry, JsonFileRegistry, MemoryAddressRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};

#[derive(Parser)]
#[command(name = "perp-deploy")]
#[command(author = "Perpetual Rollup Engineering")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deploy the Perpetual rollup contracts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a deployment for the chain the RPC endpoint is connected to
    Deploy(DeployArgs),

    /// Pack verifier capacities and depths into initializer words
    Encode {
        /// Capacity class per verifier slot (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        max_tx: Vec<String>,

        /// Tree depth per verifier slot (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        levels: Vec<u64>,
    },

    /// Address registry operations
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Args)]
struct DeployArgs {
    /// Deploy parameters file
    #[arg(
        short,
        long,
        env = "DEPLOY_PARAMETERS",
        default_value = "deploy_parameters.json"
    )]
    parameters: PathBuf,

    /// Registry file; addresses are read from and written back to it.
    /// Without it only addresses listed in the parameters file are reused.
    #[arg(long, env = "DEPLOY_REGISTRY")]
    registry: Option<PathBuf>,

    /// Directory holding compiled contract artifacts
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Explicit JSON-RPC endpoint (overrides --network)
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// Named network (default: the parameters file's hardhatNetwork, else localhost)
    #[arg(long)]
    network: Option<String>,

    /// Output record path (default: pathOutputJson, else next to the parameters file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Confirmations to wait for after each transaction
    #[arg(long, default_value = "1")]
    confirmations: usize,

    /// Artifact used as the upgradeable proxy
    #[arg(long, default_value = DEFAULT_PROXY_ARTIFACT)]
    proxy_artifact: String,

    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[arg(long, env = "MNEMONIC", hide_env_values = true)]
    mnemonic: Option<String>,

    #[arg(long, env = "INFURA_PROJECT_ID", hide_env_values = true)]
    infura_project_id: Option<String>,
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List recorded addresses for a chain
    Show {
        #[arg(long, env = "DEPLOY_REGISTRY")]
        registry: PathBuf,

        #[arg(long)]
        chain_id: u64,
    },

    /// Forget one recorded address
    Clear {
        #[arg(long, env = "DEPLOY_REGISTRY")]
        registry: PathBuf,

        #[arg(long)]
        chain_id: u64,

        /// Component name, e.g. `poseidon:3` or `perpetual`
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    perp_deploy_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Deploy(args) => cmd_deploy(args).await,
        Commands::Encode { max_tx, levels } => cmd_encode(&max_tx, &levels),
        Commands::Registry { action } => match action {
            RegistryAction::Show { registry, chain_id } => {
                cmd_registry_show(&registry, chain_id).await
            }
            RegistryAction::Clear {
                registry,
                chain_id,
                name,
            } => cmd_registry_clear(&registry, chain_id, &name).await,
        },
    }
}

async fn cmd_deploy(args: DeployArgs) -> Result<()> {
    let parameters = ParametersFile::load(&args.parameters).with_context(|| {
        format!(
            "Failed to load parameters from {}",
            args.parameters.display()
        )
    })?;

    let profile = select_network(
        args.rpc_url,
        args.network,
        &parameters.parameters,
        args.infura_project_id.as_deref(),
    )?;
    let signer = SignerSource::select(
        args.private_key,
        args.mnemonic,
        parameters.parameters.mnemonic_phrase(),
    );
    if signer.is_default() {
        warn!("no key configured, signing with the default development mnemonic");
    }

    let artifacts = ArtifactStore::open(&args.artifacts).with_context(|| {
        format!("Failed to index artifacts in {}", args.artifacts.display())
    })?;
    let config = ClientConfig {
        confirmations: args.confirmations,
        proxy_artifact: args.proxy_artifact,
        ..ClientConfig::default()
    };
    info!(network = %profile.name, rpc_url = %profile.rpc_url, "connecting");
    let chain = EthersChainClient::connect(&profile.rpc_url, &signer, artifacts, config)
        .await
        .with_context(|| format!("Failed to connect to {}", profile.rpc_url))?;

    let registry: Arc<dyn AddressRegistry> = match &args.registry {
        Some(path) => Arc::new(
            JsonFileRegistry::open(path)
                .with_context(|| format!("Failed to open registry {}", path.display()))?,
        ),
        None => Arc::new(MemoryAddressRegistry::new()),
    };

    let output_path = args.output.unwrap_or_else(|| parameters.output_path());
    let mut orchestrator = DeploymentOrchestrator::new(Arc::new(chain), registry);
    match orchestrator.run(&parameters, &output_path).await {
        Ok(report) => {
            print!("{}", render_report(&report));
            Ok(())
        }
        Err(failure) => {
            error!(stage = %failure.stage, error = %failure.error, "deployment failed");
            Err(failure.into())
        }
    }
}

/// `--rpc-url` wins, then `--network`, then the parameters file, then localhost.
fn select_network(
    rpc_url: Option<String>,
    network: Option<String>,
    parameters: &DeployParameters,
    infura_project_id: Option<&str>,
) -> Result<NetworkProfile> {
    if let Some(url) = rpc_url {
        return Ok(NetworkProfile::custom(url));
    }
    let name = network
        .or_else(|| parameters.hardhat_network.clone())
        .unwrap_or_else(|| "localhost".to_string());
    Ok(NetworkProfile::named(&name, infura_project_id)?)
}

fn render_report(report: &DeploymentReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Perpetual deployed on chain {}\n",
        report.network.chain_id
    ));
    out.push_str(&format!("  main:      {:?}\n", report.main.address));
    for lib in &report.hash_libraries {
        out.push_str(&format!("  {:<22} {:?}\n", lib.name(), lib.address));
    }
    for verifier in &report.verifiers {
        out.push_str(&format!("  {:<22} {:?}\n", verifier.name(), verifier.address));
    }
    let fresh = report.fresh();
    if fresh.is_empty() {
        out.push_str("  nothing new deployed\n");
    } else {
        let names: Vec<&str> = fresh.iter().map(|c| c.name()).collect();
        out.push_str(&format!("  newly deployed: {}\n", names.join(", ")));
    }
    out.push_str(&format!("  output: {}\n", report.output_path.display()));
    out
}

fn cmd_encode(max_tx: &[String], levels: &[u64]) -> Result<()> {
    let capacities = max_tx
        .iter()
        .map(|raw| {
            U256::from_dec_str(raw.trim()).with_context(|| format!("Invalid capacity '{raw}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let words = encode_max_tx_levels(&capacities, levels)?;
    for line in render_words(&words) {
        println!("{line}");
    }
    Ok(())
}

fn render_words(words: &[U256]) -> Vec<String> {
    words
        .iter()
        .map(|word| {
            let mut bytes = [0u8; 32];
            word.to_big_endian(&mut bytes);
            let decoded = PackedParameter::decode(*word);
            format!(
                "0x{} (capacity={}, levels={})",
                hex::encode(bytes),
                decoded.capacity,
                decoded.depth_levels
            )
        })
        .collect()
}

async fn cmd_registry_show(path: &PathBuf, chain_id: u64) -> Result<()> {
    let registry = JsonFileRegistry::open(path)
        .with_context(|| format!("Failed to open registry {}", path.display()))?;
    let entries = registry.entries(chain_id).await?;
    if entries.is_empty() {
        println!("No entries for chain {chain_id}");
        return Ok(());
    }
    for (name, address) in entries {
        println!("{name:<24} {address:?}");
    }
    Ok(())
}

async fn cmd_registry_clear(path: &PathBuf, chain_id: u64, name: &str) -> Result<()> {
    let registry = JsonFileRegistry::open(path)
        .with_context(|| format!("Failed to open registry {}", path.display()))?;
    if registry.resolve(chain_id, name).await?.is_none() {
        bail!("No entry '{name}' for chain {chain_id}");
    }
    registry.clear(chain_id, name).await?;
    println!("Cleared {name} on chain {chain_id}");
    Ok(())
}
