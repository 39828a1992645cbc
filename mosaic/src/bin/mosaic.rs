use std::{fmt, path::PathBuf, process};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ethers::types::Address;
use mosaiclib::{
    address::parse_address,
    chain::NodeClient,
    config::Directory,
    plumbing::{self, AddressSource, StartOptions, SubgraphTarget},
    pools::PoolAccounts,
    subgraph::Side,
    utils,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(about, version)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Live chain data and mosaic configs. Defaults to ~/.mosaic
    #[clap(long, global = true, env = "MOSAIC_DIR")]
    mosaic_dir: Option<PathBuf>,

    /// Committed chain state, init configs and subgraph sources. Defaults to the
    /// current directory
    #[clap(long, global = true)]
    project_dir: Option<PathBuf>,

    /// solc combined-json output with every mosaic contract
    #[clap(long, global = true, env = "MOSAIC_CONTRACTS")]
    contracts: Option<PathBuf>,

    #[clap(long, short, global = true, default_value = "info")]
    logs: LogLevel,

    /// Modules to log at debug level
    #[clap(long, global = true, value_delimiter = ',')]
    debug_modules: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start chain nodes and, unless told otherwise, a graph node for each
    Start(StartStruct),
    /// Stop chain nodes and their graph nodes
    Stop(StopStruct),
    /// Open a console on a running node
    Attach(AttachStruct),
    /// Follow the logs of a running node
    Logs(ChainStruct),
    /// List running mosaic nodes
    List,
    /// Create a new auxiliary chain linked to an origin chain
    New(NewStruct),
    /// Deploy a stake pool on the origin chain
    SetupStakePool(StakePoolStruct),
    /// Deploy a redeem pool on an auxiliary chain
    SetupRedeemPool(RedeemPoolStruct),
    /// Deploy the subgraph of one side of a gateway pair
    Subgraph(SubgraphStruct),
    /// Print the addresses of a gateway pair
    Addresses(AddressesStruct),
    /// Check the deployed contracts of a gateway pair against the mosaic config
    VerifyChain(VerifyStruct),
}

#[derive(Args, Debug)]
struct StartStruct {
    #[clap(required = true)]
    chains: Vec<String>,
    #[clap(long)]
    port: Option<u16>,
    #[clap(long)]
    rpc_port: Option<u16>,
    #[clap(long)]
    ws_port: Option<u16>,
    /// Keep the containers after they are stopped
    #[clap(long)]
    keep: bool,
    /// Comma separated accounts to unlock
    #[clap(long)]
    unlock: Option<String>,
    /// Password file for the accounts to unlock
    #[clap(long)]
    password: Option<PathBuf>,
    /// Origin chain of the auxiliary chains being started
    #[clap(long)]
    origin: Option<String>,
    #[clap(long)]
    client: Option<NodeClient>,
    #[clap(long)]
    without_graph_node: bool,
}

#[derive(Args, Debug)]
struct StopStruct {
    #[clap(required = true)]
    chains: Vec<String>,
    #[clap(long)]
    origin: Option<String>,
}

#[derive(Args, Debug)]
struct AttachStruct {
    chain: String,
    #[clap(long)]
    client: Option<NodeClient>,
}

#[derive(Args, Debug)]
struct ChainStruct {
    chain: String,
}

#[derive(Args, Debug)]
struct NewStruct {
    chain_id: u64,
    origin_websocket: String,
    /// Password for the new sealer and deployer accounts, one line per account
    password_file: PathBuf,
    /// Leave the sealer running afterwards
    #[clap(long)]
    keep: bool,
}

#[derive(Args, Debug)]
struct StakePoolStruct {
    origin_chain: String,
    origin_websocket: String,
    #[clap(value_parser = parse_address)]
    deployer: Address,
    #[clap(value_parser = parse_address)]
    owner: Address,
    #[clap(value_parser = parse_address)]
    admin: Address,
}

#[derive(Args, Debug)]
struct RedeemPoolStruct {
    origin_chain: String,
    aux_chain_id: u64,
    aux_websocket: String,
    #[clap(value_parser = parse_address)]
    deployer: Address,
    #[clap(value_parser = parse_address)]
    owner: Address,
    #[clap(value_parser = parse_address)]
    admin: Address,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Take the pair from the gateway config written for this gateway
    #[clap(long, value_parser = parse_address, conflicts_with = "gateway_config")]
    gateway: Option<Address>,
    /// Take the pair from this gateway config file
    #[clap(long)]
    gateway_config: Option<PathBuf>,
}

impl SourceArgs {
    fn source(&self) -> AddressSource {
        match (&self.gateway, &self.gateway_config) {
            (Some(gateway), _) => AddressSource::Gateway(*gateway),
            (None, Some(path)) => AddressSource::GatewayConfigFile(path.clone()),
            (None, None) => AddressSource::MosaicConfig,
        }
    }
}

#[derive(Args, Debug)]
struct SubgraphStruct {
    origin_chain: String,
    aux_chain_id: u64,
    side: Side,
    graph_admin_rpc: String,
    graph_ipfs: String,
    #[clap(flatten)]
    source: SourceArgs,
}

#[derive(Args, Debug)]
struct AddressesStruct {
    origin_chain: String,
    aux_chain_id: u64,
    #[clap(flatten)]
    source: SourceArgs,
    /// Take the token pair from this token config file
    #[clap(long)]
    token_config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct VerifyStruct {
    origin_websocket: String,
    aux_websocket: String,
    origin_chain: String,
    aux_chain_id: u64,
}

#[derive(Clone, PartialEq, Debug, clap::ValueEnum)]
enum LogLevel {
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
        )
    }
}

impl Cli {
    fn directory(&self) -> Result<Directory> {
        let mut directory = Directory::default_dirs()?;
        if let Some(dir) = &self.mosaic_dir {
            directory.mosaic_dir = dir.clone();
        }
        if let Some(dir) = &self.project_dir {
            directory.project_dir = dir.clone();
        }
        directory.absolute()
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let directory = cli.directory()?;
    let contracts = cli.contracts.as_deref();
    match &cli.command {
        Commands::Start(arg) => {
            let options = StartOptions {
                port: arg.port,
                rpc_port: arg.rpc_port,
                websocket_port: arg.ws_port,
                keep_after_stop: arg.keep,
                unlock: arg.unlock.clone(),
                password: arg.password.clone(),
                origin: arg.origin.clone(),
                client: arg.client,
                without_graph_node: arg.without_graph_node,
            };
            plumbing::start_chains(&directory, &arg.chains, &options).await?;
        }
        Commands::Stop(arg) => {
            plumbing::stop_chains(&directory, &arg.chains, arg.origin.as_deref()).await?;
        }
        Commands::Attach(arg) => {
            return plumbing::attach(&directory, &arg.chain, arg.client).await;
        }
        Commands::Logs(arg) => return plumbing::logs(&directory, &arg.chain).await,
        Commands::List => plumbing::list().await?,
        Commands::New(arg) => {
            let artifacts = plumbing::load_artifacts(contracts, &directory)?;
            plumbing::new_chain(
                &directory,
                arg.chain_id,
                &arg.origin_websocket,
                &arg.password_file,
                artifacts,
                arg.keep,
            )
            .await?;
        }
        Commands::SetupStakePool(arg) => {
            let artifacts = plumbing::load_artifacts(contracts, &directory)?;
            plumbing::setup_stake_pool(
                &directory,
                &arg.origin_chain,
                &arg.origin_websocket,
                artifacts,
                PoolAccounts {
                    deployer: arg.deployer,
                    owner: arg.owner,
                    admin: arg.admin,
                },
            )
            .await?;
        }
        Commands::SetupRedeemPool(arg) => {
            let artifacts = plumbing::load_artifacts(contracts, &directory)?;
            plumbing::setup_redeem_pool(
                &directory,
                &arg.origin_chain,
                arg.aux_chain_id,
                &arg.aux_websocket,
                artifacts,
                PoolAccounts {
                    deployer: arg.deployer,
                    owner: arg.owner,
                    admin: arg.admin,
                },
            )
            .await?;
        }
        Commands::Subgraph(arg) => {
            let target = SubgraphTarget {
                origin_chain: &arg.origin_chain,
                aux_chain_id: arg.aux_chain_id,
                side: arg.side,
                graph_admin_rpc: &arg.graph_admin_rpc,
                graph_ipfs: &arg.graph_ipfs,
            };
            plumbing::deploy_subgraph(&directory, target, &arg.source.source()).await?;
        }
        Commands::Addresses(arg) => {
            plumbing::print_addresses(
                &directory,
                &arg.origin_chain,
                arg.aux_chain_id,
                &arg.source.source(),
                arg.token_config.as_deref(),
            )?;
        }
        Commands::VerifyChain(arg) => {
            let artifacts = plumbing::load_artifacts(contracts, &directory)?;
            plumbing::verify_chain(
                &directory,
                &arg.origin_websocket,
                &arg.aux_websocket,
                &arg.origin_chain,
                arg.aux_chain_id,
                &artifacts,
            )
            .await?;
        }
    }
    Ok(0)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_spec = utils::compute_log_string(&cli.logs.to_string(), &cli.debug_modules);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_spec))
        .with_target(false)
        .init();

    match utils::with_error_logged(run(cli).await) {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(_) => process::exit(1),
    }
}
