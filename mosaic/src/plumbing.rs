//! Code for all the mosaic commands, so you can invoke it from your own programs.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use ethers::{
    providers::{Provider, Ws},
    types::Address,
};
use tracing::info;

use crate::{
    address::checksummed,
    chain::{NodeClient, aux_chain_id, is_valid_aux_chain, is_valid_origin_chain},
    config::{
        Directory, GatewayAddresses, GatewayConfig, InitConfig, MosaicConfig, TokenAddresses,
        TokenConfig,
    },
    contracts::Artifacts,
    error::MosaicError,
    graph::{GraphDescription, GraphNode},
    initialization::Initialization,
    node::{self, ChainNode, NodeDescription, NodePorts},
    pools::{self, PoolAccounts, PoolAddresses},
    retry::RetryPolicy,
    subgraph::{Side, Subgraph},
    verifier::ChainVerifier,
};

/// Flags shared by every chain given to `start`.
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
    pub port: Option<u16>,
    pub rpc_port: Option<u16>,
    pub websocket_port: Option<u16>,
    pub keep_after_stop: bool,
    pub unlock: Option<String>,
    pub password: Option<PathBuf>,
    pub origin: Option<String>,
    pub client: Option<NodeClient>,
    pub without_graph_node: bool,
}

impl StartOptions {
    /// Unlocking needs a password file and a password file is only read to unlock.
    pub fn check_unlock(&self) -> Result<()> {
        match (&self.unlock, &self.password) {
            (Some(_), None) => bail!("--unlock requires --password"),
            (None, Some(_)) => bail!("--password is only used together with --unlock"),
            _ => Ok(()),
        }
    }

    /// Default ports are only needed for the ones not given explicitly.
    fn ports(&self, chain: &str) -> Result<NodePorts> {
        if let (Some(port), Some(rpc_port), Some(websocket_port)) =
            (self.port, self.rpc_port, self.websocket_port)
        {
            return Ok(NodePorts {
                port,
                rpc_port,
                websocket_port,
            });
        }
        let defaults = NodePorts::for_chain(chain)?;
        Ok(NodePorts {
            port: self.port.unwrap_or(defaults.port),
            rpc_port: self.rpc_port.unwrap_or(defaults.rpc_port),
            websocket_port: self.websocket_port.unwrap_or(defaults.websocket_port),
        })
    }

    pub fn describe(&self, chain: &str, directory: &Directory) -> Result<NodeDescription> {
        let mut description =
            NodeDescription::with_ports(chain, directory.clone(), self.ports(chain)?);
        description.keep_after_stop = self.keep_after_stop;
        description.unlock = self.unlock.clone();
        description.password = self
            .password
            .as_deref()
            .map(|path| {
                std::fs::canonicalize(path)
                    .with_context(|| format!("Cannot find password file {}", path.display()))
            })
            .transpose()?;
        description.client = self.client;
        if description.is_aux_chain() {
            let origin = self
                .origin
                .as_deref()
                .ok_or_else(|| anyhow!("auxiliary chain {chain} needs --origin"))?;
            if !is_valid_aux_chain(chain, origin, directory) {
                bail!("{chain} is not an auxiliary chain of {origin}");
            }
            description.origin_chain = Some(origin.to_owned());
        } else if !is_valid_origin_chain(chain, directory) {
            bail!("{chain} is neither a known origin chain nor one with a mosaic config");
        }
        Ok(description)
    }
}

/// Connect to a websocket endpoint, waiting for it to come up.
pub async fn connect(url: &str) -> Result<Arc<Provider<Ws>>> {
    let provider = RetryPolicy::port_wait()
        .retry(&format!("connect to {url}"), || async {
            Ok(Provider::<Ws>::connect(url).await?)
        })
        .await?;
    Ok(Arc::new(provider))
}

pub fn load_artifacts(path: Option<&Path>, directory: &Directory) -> Result<Arc<Artifacts>> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| directory.default_contracts_path());
    Ok(Arc::new(Artifacts::from_file(&path)?))
}

pub async fn start_chains(
    directory: &Directory,
    chains: &[String],
    options: &StartOptions,
) -> Result<()> {
    options.check_unlock()?;
    for chain in chains {
        let description = options.describe(chain, directory)?;
        ChainNode::new(description.clone()).start().await?;
        if !options.without_graph_node {
            let mut graph = GraphDescription::new(
                chain,
                description.origin_chain.as_deref(),
                directory.clone(),
            )?;
            graph.keep_after_stop = options.keep_after_stop;
            GraphNode::new(graph).start().await?;
        }
    }
    Ok(())
}

pub async fn stop_chains(
    directory: &Directory,
    chains: &[String],
    origin: Option<&str>,
) -> Result<()> {
    for chain in chains {
        node::stop_container(&node::container_name(chain)).await?;
        let origin = if aux_chain_id(chain).is_some() {
            origin
        } else {
            None
        };
        GraphNode::new(GraphDescription::new(chain, origin, directory.clone())?)
            .stop()
            .await?;
    }
    Ok(())
}

pub async fn attach(
    directory: &Directory,
    chain: &str,
    client: Option<NodeClient>,
) -> Result<i32> {
    let mut description = NodeDescription::new(chain, directory.clone())?;
    description.client = client;
    ChainNode::new(description).attach().await
}

pub async fn logs(directory: &Directory, chain: &str) -> Result<i32> {
    ChainNode::new(NodeDescription::new(chain, directory.clone())?)
        .logs()
        .await
}

pub async fn list() -> Result<()> {
    let names = node::list().await?;
    if names.is_empty() {
        println!("No mosaic chains running");
    }
    for name in names {
        println!("{}", name.bold());
    }
    Ok(())
}

/// Bootstrap auxiliary chain `chain_id` from `<project>/initialize/<chain_id>.json`.
pub async fn new_chain(
    directory: &Directory,
    chain_id: u64,
    origin_websocket: &str,
    password_file: &Path,
    artifacts: Arc<Artifacts>,
    keep_after_stop: bool,
) -> Result<MosaicConfig> {
    let init_path = directory.init_config_path(&chain_id.to_string());
    let init = InitConfig::from_file(&init_path)?;
    let password_file = std::fs::canonicalize(password_file)
        .with_context(|| format!("Cannot find password file {}", password_file.display()))?;
    info!(chain_id, origin = %init.origin_chain, "bootstrapping auxiliary chain");
    Initialization::new(
        init,
        chain_id,
        origin_websocket,
        password_file,
        directory.clone(),
        artifacts,
        keep_after_stop,
    )
    .run()
    .await
}

pub async fn setup_stake_pool(
    directory: &Directory,
    origin_chain: &str,
    origin_websocket: &str,
    artifacts: Arc<Artifacts>,
    accounts: PoolAccounts,
) -> Result<PoolAddresses> {
    let provider = connect(origin_websocket).await?;
    pools::setup_stake_pool(provider, artifacts, directory, origin_chain, accounts).await
}

pub async fn setup_redeem_pool(
    directory: &Directory,
    origin_chain: &str,
    aux_chain_id: u64,
    aux_websocket: &str,
    artifacts: Arc<Artifacts>,
    accounts: PoolAccounts,
) -> Result<PoolAddresses> {
    let provider = connect(aux_websocket).await?;
    pools::setup_redeem_pool(provider, artifacts, directory, origin_chain, aux_chain_id, accounts)
        .await
}

/// Where the addresses of a gateway pair come from.
#[derive(Clone, Debug)]
pub enum AddressSource {
    /// The pair recorded in the mosaic config of the origin chain.
    MosaicConfig,
    /// The gateway config written for this gateway address.
    Gateway(Address),
    /// An explicit gateway config file.
    GatewayConfigFile(PathBuf),
}

pub fn gateway_addresses(
    directory: &Directory,
    origin_chain: &str,
    aux_chain_id: u64,
    source: &AddressSource,
) -> Result<(GatewayAddresses, TokenAddresses)> {
    let gateway_config = match source {
        AddressSource::MosaicConfig => {
            let config = MosaicConfig::from_chain(directory, origin_chain)?;
            return Ok((
                GatewayAddresses::from_mosaic_config(&config, aux_chain_id)?,
                TokenAddresses::from_mosaic_config(&config, aux_chain_id)?,
            ));
        }
        AddressSource::Gateway(gateway) => {
            GatewayConfig::from_chain(directory, origin_chain, aux_chain_id, gateway)?
        }
        AddressSource::GatewayConfigFile(path) => GatewayConfig::from_file(path)?,
    };
    if gateway_config.aux_chain_id != aux_chain_id {
        return Err(MosaicError::mismatch(
            "gateway config auxChainId",
            aux_chain_id,
            gateway_config.aux_chain_id,
        )
        .into());
    }
    Ok((
        GatewayAddresses::from_gateway_config(&gateway_config),
        TokenAddresses::from_gateway_config(&gateway_config),
    ))
}

/// Print the addresses of a gateway pair. A token config, when given, overrides
/// the token pair.
pub fn print_addresses(
    directory: &Directory,
    origin_chain: &str,
    aux_chain_id: u64,
    source: &AddressSource,
    token_config: Option<&Path>,
) -> Result<()> {
    let (gateway, mut tokens) = gateway_addresses(directory, origin_chain, aux_chain_id, source)?;
    if let Some(path) = token_config {
        tokens = TokenAddresses::from_token_config(&TokenConfig::from_file(path)?);
    }
    let optional =
        |a: Option<Address>| a.as_ref().map(checksummed).unwrap_or_else(|| "-".to_owned());
    for (name, value) in [
        ("stake pool", optional(gateway.stake_pool)),
        ("gateway", checksummed(&gateway.gateway)),
        ("anchor", checksummed(&gateway.anchor)),
        ("co-anchor", checksummed(&gateway.co_anchor)),
        ("co-gateway", checksummed(&gateway.co_gateway)),
        ("redeem pool", optional(gateway.redeem_pool)),
        ("value token", checksummed(&tokens.value_token)),
        ("utility token", checksummed(&tokens.utility_token)),
    ] {
        println!("{:>14} {}", name.bold(), value);
    }
    Ok(())
}

pub struct SubgraphTarget<'a> {
    pub origin_chain: &'a str,
    pub aux_chain_id: u64,
    pub side: Side,
    pub graph_admin_rpc: &'a str,
    pub graph_ipfs: &'a str,
}

pub async fn deploy_subgraph(
    directory: &Directory,
    target: SubgraphTarget<'_>,
    source: &AddressSource,
) -> Result<()> {
    let (addresses, _) =
        gateway_addresses(directory, target.origin_chain, target.aux_chain_id, source)?;
    Subgraph {
        directory: directory.clone(),
        origin_chain: target.origin_chain.to_owned(),
        aux_chain_id: target.aux_chain_id,
        side: target.side,
        addresses,
        graph_admin_rpc: target.graph_admin_rpc.to_owned(),
        graph_ipfs: target.graph_ipfs.to_owned(),
    }
    .deploy()
    .await
}

pub async fn verify_chain(
    directory: &Directory,
    origin_websocket: &str,
    aux_websocket: &str,
    origin_chain: &str,
    aux_chain_id: u64,
    artifacts: &Artifacts,
) -> Result<()> {
    let config = MosaicConfig::from_chain(directory, origin_chain)?;
    let origin = connect(origin_websocket).await?;
    let auxiliary = connect(aux_websocket).await?;
    ChainVerifier::new(origin.as_ref(), auxiliary.as_ref(), artifacts, &config, aux_chain_id)
        .verify()
        .await?;
    println!(
        "{} gateway pair of {} on {}",
        "Verified".green(),
        aux_chain_id.to_string().bold(),
        origin_chain.bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_needs_password() {
        let mut options = StartOptions {
            unlock: Some("0x0".to_owned()),
            ..Default::default()
        };
        assert!(options.check_unlock().is_err());
        options.password = Some(PathBuf::from("pw"));
        options.check_unlock().unwrap();
        options.unlock = None;
        assert!(options.check_unlock().is_err());
        StartOptions::default().check_unlock().unwrap();
    }

    #[test]
    fn describe_applies_overrides() {
        let project = tempfile::tempdir().unwrap();
        let directory = Directory::new(project.path().join("m"), project.path());
        let options = StartOptions {
            rpc_port: Some(9545),
            client: Some(NodeClient::Geth),
            ..Default::default()
        };
        let description = options.describe("goerli", &directory).unwrap();
        assert_eq!(description.ports.rpc_port, 9545);
        assert_eq!(description.ports.port, 30303);
        assert_eq!(description.client, Some(NodeClient::Geth));

        assert!(options.describe("1405", &directory).is_err());
        let aux = StartOptions {
            origin: Some("goerli".to_owned()),
            ..Default::default()
        };
        assert!(aux.describe("1405", &directory).is_err());
        std::fs::create_dir_all(directory.project_chain_dir("goerli", "1405")).unwrap();
        let description = aux.describe("1405", &directory).unwrap();
        assert_eq!(description.origin_chain.as_deref(), Some("goerli"));
        assert_eq!(description.ports.websocket_port, 51405);

        assert!(options.describe("no-such-chain", &directory).is_err());
    }

    #[test]
    fn describe_resolves_password_file() {
        let project = tempfile::tempdir().unwrap();
        let directory = Directory::new(project.path().join("m"), project.path());
        let password = project.path().join("password.txt");
        std::fs::write(&password, "secret\n").unwrap();

        let options = StartOptions {
            unlock: Some("0x0".to_owned()),
            password: Some(password.clone()),
            ..Default::default()
        };
        let description = options.describe("goerli", &directory).unwrap();
        let resolved = description.password.unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, std::fs::canonicalize(&password).unwrap());

        let missing = StartOptions {
            password: Some(PathBuf::from("no/such/password.txt")),
            ..options
        };
        let err = missing.describe("goerli", &directory).unwrap_err();
        assert!(err.to_string().contains("no/such/password.txt"), "{err}");
    }

    #[test]
    fn addresses_from_gateway_config() {
        let mosaic = tempfile::tempdir().unwrap();
        let directory = Directory::new(mosaic.path(), mosaic.path());
        let gateway = Address::repeat_byte(0x04);
        let config = GatewayConfig {
            aux_chain_id: 1405,
            origin_contracts: crate::config::OriginGatewayContracts {
                stake_pool_address: None,
                eip20_gateway_address: gateway,
                anchor_address: Address::repeat_byte(0x02),
                value_token_address: Address::repeat_byte(0x0a),
            },
            auxiliary_contracts: crate::config::AuxiliaryGatewayContracts {
                redeem_pool_address: None,
                eip20_co_gateway_address: Address::repeat_byte(0x03),
                anchor_address: Address::repeat_byte(0x05),
                utility_token_address: Address::repeat_byte(0x0b),
            },
        };
        let path = config.write(&directory, "goerli").unwrap();

        let source = AddressSource::Gateway(gateway);
        let (pair, tokens) = gateway_addresses(&directory, "goerli", 1405, &source).unwrap();
        assert_eq!(pair.co_anchor, Address::repeat_byte(0x05));
        assert_eq!(tokens.utility_token, Address::repeat_byte(0x0b));

        let err = gateway_addresses(
            &directory,
            "goerli",
            1406,
            &AddressSource::GatewayConfigFile(path),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MosaicError>(),
            Some(MosaicError::ChainVerificationMismatch { .. })
        ));
        let source = AddressSource::MosaicConfig;
        assert!(gateway_addresses(&directory, "goerli", 1405, &source).is_err());
    }
}
