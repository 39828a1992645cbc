use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use ethers::{
    providers::{Provider, Ws},
    types::Address,
};
use fs_extra::dir::CopyOptions;
use tracing::{info, warn};

use crate::{
    address::checksummed,
    chain::{KnownOrigin, NodeClient, aux_chain_id, select_client},
    commands::CommandBuilder,
    config::Directory,
    retry::RetryPolicy,
};

pub const GETH_IMAGE: &str = "ethereum/client-go:v1.9.5";
pub const PARITY_IMAGE: &str = "parity/parity:v2.5.13-stable";
pub const CONTAINER_PREFIX: &str = "mosaic_";

const GETH_DATA_DIR: &str = "/chain_data";
const PARITY_DATA_DIR: &str = "/home/parity/.local/share/io.parity.ethereum";
const PASSWORD_FILE: &str = "/password.txt";
const RPC_APIS: &str = "eth,net,web3,network,debug,txpool,admin,personal";
const BOOT_NODES_FILE: &str = "bootnodes";

/// Gas limit the auxiliary sealer steers blocks towards. Large enough for the
/// co-gateway deployment in a single block.
pub const SEALER_TARGET_GAS_LIMIT: u64 = 94_000_000;

/// Ports a chain node listens on, host and container alike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodePorts {
    pub port: u16,
    pub rpc_port: u16,
    pub websocket_port: u16,
}

impl NodePorts {
    /// Auxiliary chains are spread out by chain id so several can run side by side;
    /// origin chains use the client defaults.
    pub fn for_chain(chain: &str) -> Result<Self> {
        Ok(match aux_chain_id(chain) {
            Some(id) => Self {
                port: offset_port(30000, id)?,
                rpc_port: offset_port(40000, id)?,
                websocket_port: offset_port(50000, id)?,
            },
            None => Self {
                port: 30303,
                rpc_port: 8545,
                websocket_port: 8546,
            },
        })
    }
}

/// `base + chain_id`, failing for chain ids that push the port past 65535.
pub(crate) fn offset_port(base: u16, chain_id: u64) -> Result<u16> {
    u64::from(base)
        .checked_add(chain_id)
        .and_then(|port| u16::try_from(port).ok())
        .ok_or_else(|| anyhow!("chain id {chain_id} pushes port {base} past 65535"))
}

/// Everything needed to run one chain node container.
#[derive(Clone, Debug)]
pub struct NodeDescription {
    pub chain: String,
    pub directory: Directory,
    pub ports: NodePorts,
    pub keep_after_stop: bool,
    /// Comma separated accounts to unlock; requires `password`.
    pub unlock: Option<String>,
    pub password: Option<PathBuf>,
    /// Origin an auxiliary chain belongs to. `None` for origin chains.
    pub origin_chain: Option<String>,
    pub client: Option<NodeClient>,
    /// Seal blocks with this account.
    pub sealer: Option<Address>,
}

impl NodeDescription {
    pub fn new(chain: &str, directory: Directory) -> Result<Self> {
        Ok(Self::with_ports(chain, directory, NodePorts::for_chain(chain)?))
    }

    pub fn with_ports(chain: &str, directory: Directory, ports: NodePorts) -> Self {
        Self {
            chain: chain.to_owned(),
            directory,
            ports,
            keep_after_stop: false,
            unlock: None,
            password: None,
            origin_chain: None,
            client: None,
            sealer: None,
        }
    }

    pub fn is_aux_chain(&self) -> bool {
        aux_chain_id(&self.chain).is_some()
    }
}

pub struct ChainNode {
    description: NodeDescription,
    client: NodeClient,
}

impl ChainNode {
    pub fn new(description: NodeDescription) -> Self {
        let client = select_client(&description.chain, description.client);
        Self {
            description,
            client,
        }
    }

    pub fn client(&self) -> NodeClient {
        self.client
    }

    pub fn container_name(&self) -> String {
        container_name(&self.description.chain)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.description.ports.websocket_port)
    }

    pub fn rpc_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.description.ports.rpc_port)
    }

    /// Host directory mounted as the node's data directory.
    pub fn chain_dir(&self) -> Result<PathBuf> {
        let d = &self.description;
        if d.is_aux_chain() {
            let origin = d
                .origin_chain
                .as_deref()
                .ok_or_else(|| anyhow!("auxiliary chain {} needs an origin chain", d.chain))?;
            Ok(d.directory.aux_chain_dir(origin, &d.chain))
        } else {
            Ok(d.directory.origin_chain_dir(&d.chain))
        }
    }

    fn boot_nodes_path(&self) -> Option<PathBuf> {
        let d = &self.description;
        let origin = d.origin_chain.as_deref()?;
        Some(
            d.directory
                .project_chain_dir(origin, &d.chain)
                .join(BOOT_NODES_FILE),
        )
    }

    /// Arguments passed to the client binary inside the container.
    pub fn client_args(&self, boot_nodes: &[String]) -> Vec<String> {
        match self.client {
            NodeClient::Geth => self.geth_args(boot_nodes),
            NodeClient::Parity => self.parity_args(),
        }
    }

    fn geth_args(&self, boot_nodes: &[String]) -> Vec<String> {
        let d = &self.description;
        let mut args: Vec<String> = vec!["--datadir".into(), GETH_DATA_DIR.into()];
        match (aux_chain_id(&d.chain), d.chain.as_str()) {
            (Some(id), _) => args.extend(["--networkid".into(), id.to_string()]),
            (None, "ropsten") => args.push("--testnet".into()),
            (None, "goerli") => args.push("--goerli".into()),
            (None, "dev-origin") => {
                if let Ok(id) = KnownOrigin::DevOrigin.chain_id() {
                    args.extend(["--networkid".into(), id.to_string()]);
                }
            }
            _ => {}
        }
        args.extend([
            "--port".into(),
            d.ports.port.to_string(),
            "--syncmode".into(),
            "full".into(),
            "--rpc".into(),
            "--rpcaddr".into(),
            "0.0.0.0".into(),
            "--rpcport".into(),
            d.ports.rpc_port.to_string(),
            "--rpcvhosts=*".into(),
            "--rpccorsdomain=*".into(),
            "--rpcapi".into(),
            RPC_APIS.into(),
            "--ws".into(),
            "--wsaddr".into(),
            "0.0.0.0".into(),
            "--wsport".into(),
            d.ports.websocket_port.to_string(),
            "--wsorigins=*".into(),
            "--wsapi".into(),
            RPC_APIS.into(),
        ]);
        if !boot_nodes.is_empty() {
            args.extend(["--bootnodes".into(), boot_nodes.join(",")]);
        }
        if let Some(unlock) = &d.unlock {
            args.extend([
                "--unlock".into(),
                unlock.clone(),
                "--password".into(),
                PASSWORD_FILE.into(),
                "--allow-insecure-unlock".into(),
            ]);
        }
        if let Some(sealer) = &d.sealer {
            args.extend([
                "--mine".into(),
                "--miner.etherbase".into(),
                checksummed(sealer),
                "--gasprice".into(),
                "0".into(),
                "--targetgaslimit".into(),
                SEALER_TARGET_GAS_LIMIT.to_string(),
            ]);
        }
        args
    }

    fn parity_args(&self) -> Vec<String> {
        let d = &self.description;
        let mut args: Vec<String> = vec![
            "--chain".into(),
            d.chain.clone(),
            "--base-path".into(),
            PARITY_DATA_DIR.into(),
            "--port".into(),
            d.ports.port.to_string(),
            "--jsonrpc-port".into(),
            d.ports.rpc_port.to_string(),
            "--jsonrpc-interface".into(),
            "all".into(),
            "--jsonrpc-apis".into(),
            "all".into(),
            "--jsonrpc-hosts".into(),
            "all".into(),
            "--jsonrpc-cors".into(),
            "all".into(),
            "--ws-port".into(),
            d.ports.websocket_port.to_string(),
            "--ws-interface".into(),
            "all".into(),
            "--ws-apis".into(),
            "all".into(),
            "--ws-origins".into(),
            "all".into(),
            "--ws-hosts".into(),
            "all".into(),
        ];
        if let Some(unlock) = &d.unlock {
            args.extend([
                "--unlock".into(),
                unlock.clone(),
                "--password".into(),
                PASSWORD_FILE.into(),
            ]);
        }
        args
    }

    /// The full `docker run` argument list.
    pub fn docker_run_args(
        &self,
        chain_dir: &Path,
        boot_nodes: &[String],
        run_as: &[String],
    ) -> Vec<String> {
        let d = &self.description;
        let mut args: Vec<String> = vec!["run".into(), "-d".into()];
        args.extend_from_slice(run_as);
        if !d.keep_after_stop {
            args.push("--rm".into());
        }
        args.extend(["--name".into(), self.container_name()]);
        let p = d.ports;
        for mapping in [
            format!("{}:{}", p.port, p.port),
            format!("{}:{}/udp", p.port, p.port),
            format!("{}:{}", p.rpc_port, p.rpc_port),
            format!("{}:{}", p.websocket_port, p.websocket_port),
        ] {
            args.extend(["-p".into(), mapping]);
        }
        let (data_dir, image) = match self.client {
            NodeClient::Geth => (GETH_DATA_DIR, GETH_IMAGE),
            NodeClient::Parity => (PARITY_DATA_DIR, PARITY_IMAGE),
        };
        args.extend([
            "-v".into(),
            format!("{}:{data_dir}", chain_dir.display()),
        ]);
        if let Some(password) = &d.password {
            args.extend([
                "-v".into(),
                format!("{}:{PASSWORD_FILE}", password.display()),
            ]);
        }
        args.push(image.into());
        args.extend(self.client_args(boot_nodes));
        args
    }

    pub async fn start(&self) -> Result<()> {
        let chain_dir = self.chain_dir()?;
        self.prepare_chain_dir(&chain_dir)?;
        let boot_nodes = match self.boot_nodes_path() {
            Some(path) => read_boot_nodes(&path).await?,
            None => Vec::new(),
        };
        info!(
            chain = %self.description.chain,
            client = %self.client,
            dir = %chain_dir.display(),
            "starting node"
        );
        // The parity image runs as its own user already.
        let run_as = match self.client {
            NodeClient::Geth => docker_user_args(&chain_dir)?,
            NodeClient::Parity => Vec::new(),
        };
        let args = self.docker_run_args(&chain_dir, &boot_nodes, &run_as);
        CommandBuilder::new()
            .silent()
            .cmd("docker", &[])
            .more_args(&args)
            .run_for_output()
            .await?;
        println!(
            "{} {} ({}) rpc {} ws {}",
            "Started".green(),
            self.container_name().bold(),
            self.client,
            self.rpc_url(),
            self.ws_url()
        );
        Ok(())
    }

    /// An auxiliary chain that was generated elsewhere is started from the state
    /// committed to the project directory.
    fn prepare_chain_dir(&self, chain_dir: &Path) -> Result<()> {
        if chain_dir.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(chain_dir)
            .with_context(|| format!("Cannot create {}", chain_dir.display()))?;
        let d = &self.description;
        let (Some(origin), NodeClient::Geth) = (d.origin_chain.as_deref(), self.client) else {
            return Ok(());
        };
        let committed = d.directory.project_chain_dir(origin, &d.chain).join("geth");
        if committed.is_dir() {
            info!(
                from = %committed.display(),
                "initialising chain data from the project directory"
            );
            fs_extra::dir::copy(&committed, chain_dir, &CopyOptions::new())
                .with_context(|| format!("Cannot copy {}", committed.display()))?;
        }
        Ok(())
    }

    /// Connect to the node's websocket endpoint, waiting for it to come up.
    pub async fn connect(&self, policy: RetryPolicy) -> Result<Provider<Ws>> {
        let url = self.ws_url();
        policy
            .retry(&format!("connect to {url}"), || async {
                Ok(Provider::<Ws>::connect(url.as_str()).await?)
            })
            .await
    }

    pub async fn stop(&self) -> Result<()> {
        stop_container(&self.container_name()).await
    }

    pub async fn attach(&self) -> Result<i32> {
        match self.client {
            NodeClient::Geth => {
                let ipc = format!("{GETH_DATA_DIR}/geth.ipc");
                CommandBuilder::new()
                    .cmd(
                        "docker",
                        &["exec", "-it", &self.container_name(), "geth", "attach", &ipc],
                    )
                    .run_interactive()
                    .await
            }
            NodeClient::Parity => Err(anyhow!(
                "parity has no console, connect to {} instead",
                self.rpc_url()
            )),
        }
    }

    pub async fn logs(&self) -> Result<i32> {
        CommandBuilder::new()
            .cmd("docker", &["logs", "-f", &self.container_name()])
            .run_interactive()
            .await
    }
}

pub fn container_name(chain: &str) -> String {
    format!("{CONTAINER_PREFIX}{chain}")
}

pub async fn stop_container(name: &str) -> Result<()> {
    let output = CommandBuilder::new()
        .silent()
        .ignore_failures()
        .cmd("docker", &["stop", name])
        .run_for_output()
        .await?;
    if output.success {
        println!("{} {}", "Stopped".yellow(), name.bold());
    } else {
        warn!(container = %name, "{}", output.sanitise_stderr());
    }
    Ok(())
}

/// Names of running mosaic node containers.
pub async fn list() -> Result<Vec<String>> {
    let output = CommandBuilder::new()
        .silent()
        .cmd(
            "docker",
            &[
                "ps",
                "--filter",
                &format!("name={CONTAINER_PREFIX}"),
                "--format",
                "{{.Names}}",
            ],
        )
        .run_for_output()
        .await?;
    Ok(parse_container_names(&output.sanitise_stdout()))
}

fn parse_container_names(stdout: &str) -> Vec<String> {
    let mut names: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with(CONTAINER_PREFIX))
        .map(str::to_owned)
        .collect();
    names.sort();
    names
}

/// One enode URL per line; a missing file means no boot nodes.
pub async fn read_boot_nodes(path: &Path) -> Result<Vec<String>> {
    if !crate::utils::file_exists(path).await? {
        return Ok(Vec::new());
    }
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

/// `--user` for geth containers: the owner of the mounted directory.
#[cfg(unix)]
pub(crate) fn docker_user_args(dir: &Path) -> Result<Vec<String>> {
    use std::os::unix::fs::MetadataExt;

    let metadata =
        std::fs::metadata(dir).with_context(|| format!("Cannot stat {}", dir.display()))?;
    Ok(vec![
        "--user".to_owned(),
        format!("{}:{}", metadata.uid(), metadata.gid()),
    ])
}

#[cfg(not(unix))]
pub(crate) fn docker_user_args(_dir: &Path) -> Result<Vec<String>> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> Directory {
        Directory::new("/m", "/p")
    }

    fn contains_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn ports() {
        assert_eq!(
            NodePorts::for_chain("1405").unwrap(),
            NodePorts {
                port: 31405,
                rpc_port: 41405,
                websocket_port: 51405
            }
        );
        assert_eq!(NodePorts::for_chain("ropsten").unwrap().rpc_port, 8545);
        assert_eq!(offset_port(50000, 15_535).unwrap(), u16::MAX);
        assert!(offset_port(50000, 15_536).is_err());
        assert!(offset_port(30000, u64::MAX).is_err());
        // The websocket port overflows first.
        assert!(NodePorts::for_chain("40000").is_err());
        assert!(NodeDescription::new("40000", directory()).is_err());
    }

    #[test]
    fn geth_aux_node() {
        let mut description = NodeDescription::new("1405", directory()).unwrap();
        description.origin_chain = Some("ropsten".into());
        description.unlock = Some("0x01,0x02".into());
        description.password = Some("/tmp/pw".into());
        description.sealer = Some(Address::repeat_byte(1));
        let node = ChainNode::new(description);
        assert_eq!(node.client(), NodeClient::Geth);
        assert_eq!(node.container_name(), "mosaic_1405");

        let chain_dir = node.chain_dir().unwrap();
        assert_eq!(chain_dir, PathBuf::from("/m/ropsten/1405"));
        let run_as = ["--user".to_owned(), "1000:1000".to_owned()];
        let boot_nodes = ["enode://a@1.2.3.4:30303".to_owned()];
        let args = node.docker_run_args(&chain_dir, &boot_nodes, &run_as);
        assert_eq!(&args[..4], ["run", "-d", "--user", "1000:1000"]);
        assert!(args.contains(&"--rm".to_string()));
        assert!(contains_pair(&args, "--name", "mosaic_1405"));
        assert!(contains_pair(&args, "-p", "41405:41405"));
        assert!(contains_pair(&args, "-v", "/m/ropsten/1405:/chain_data"));
        assert!(contains_pair(&args, "-v", "/tmp/pw:/password.txt"));
        assert!(args.contains(&GETH_IMAGE.to_string()));
        assert!(contains_pair(&args, "--networkid", "1405"));
        assert!(contains_pair(&args, "--wsport", "51405"));
        assert!(contains_pair(&args, "--bootnodes", "enode://a@1.2.3.4:30303"));
        assert!(contains_pair(&args, "--gasprice", "0"));
        assert!(contains_pair(&args, "--targetgaslimit", "94000000"));
        assert!(contains_pair(&args, "--unlock", "0x01,0x02"));
    }

    #[test]
    fn parity_origin_node() {
        let mut description = NodeDescription::new("ropsten", directory()).unwrap();
        description.keep_after_stop = true;
        let node = ChainNode::new(description);
        assert_eq!(node.client(), NodeClient::Parity);
        let chain_dir = node.chain_dir().unwrap();
        assert_eq!(chain_dir, PathBuf::from("/m/ropsten/origin"));
        let args = node.docker_run_args(&chain_dir, &[], &[]);
        assert!(!args.contains(&"--rm".to_string()));
        assert!(args.contains(&PARITY_IMAGE.to_string()));
        assert!(contains_pair(&args, "--chain", "ropsten"));
        assert!(contains_pair(
            &args,
            "-v",
            "/m/ropsten/origin:/home/parity/.local/share/io.parity.ethereum"
        ));
        assert!(contains_pair(&args, "-p", "8546:8546"));
    }

    #[test]
    fn client_override() {
        let mut description = NodeDescription::new("goerli", directory()).unwrap();
        description.client = Some(NodeClient::Geth);
        let node = ChainNode::new(description);
        assert_eq!(node.client(), NodeClient::Geth);
        assert!(node.client_args(&[]).contains(&"--goerli".to_string()));
    }

    #[test]
    fn aux_chain_without_origin() {
        let node = ChainNode::new(NodeDescription::new("1405", directory()).unwrap());
        assert!(node.chain_dir().is_err());
    }

    #[test]
    fn container_names() {
        assert_eq!(
            parse_container_names("mosaic_ropsten\nother\n mosaic_1405 \n"),
            vec!["mosaic_1405".to_string(), "mosaic_ropsten".to_string()]
        );
    }

    #[tokio::test]
    async fn boot_nodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootnodes");
        assert!(read_boot_nodes(&path).await.unwrap().is_empty());
        std::fs::write(&path, "enode://a@1.1.1.1:1\n\nenode://b@2.2.2.2:2\n").unwrap();
        assert_eq!(read_boot_nodes(&path).await.unwrap().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn containers_run_as_directory_owner() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let metadata = std::fs::metadata(dir.path()).unwrap();
        assert_eq!(
            docker_user_args(dir.path()).unwrap(),
            vec![
                "--user".to_owned(),
                format!("{}:{}", metadata.uid(), metadata.gid())
            ]
        );
        assert!(docker_user_args(&dir.path().join("missing")).is_err());
    }
}
