use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use serde::Serialize;
use tera::Tera;
use tracing::info;

use crate::{
    chain::aux_chain_id,
    commands::CommandBuilder,
    config::Directory,
    node::{NodePorts, offset_port},
    utils,
};

const COMPOSE_TEMPLATE: &str = include_str!("../resources/docker-compose.tera.yml");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GraphPorts {
    pub graphql_http: u16,
    pub graphql_ws: u16,
    pub json_rpc: u16,
    pub index_status: u16,
    pub ipfs: u16,
    pub postgres: u16,
}

impl GraphPorts {
    pub fn for_chain(chain: &str) -> Result<Self> {
        let defaults = Self {
            graphql_http: 8000,
            graphql_ws: 8001,
            json_rpc: 8020,
            index_status: 8030,
            ipfs: 5001,
            postgres: 5432,
        };
        Ok(match aux_chain_id(chain) {
            Some(id) => Self {
                graphql_http: offset_port(defaults.graphql_http, id)?,
                graphql_ws: offset_port(defaults.graphql_ws, id)?,
                json_rpc: offset_port(defaults.json_rpc, id)?,
                index_status: offset_port(defaults.index_status, id)?,
                ipfs: offset_port(defaults.ipfs, id)?,
                postgres: offset_port(defaults.postgres, id)?,
            },
            None => defaults,
        })
    }
}

/// A graph-node with its IPFS and Postgres, indexing one chain.
#[derive(Clone, Debug)]
pub struct GraphDescription {
    pub directory: Directory,
    pub chain: String,
    /// Origin the chain belongs to; `None` when `chain` is itself an origin chain.
    pub origin_chain: Option<String>,
    pub ports: GraphPorts,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_database: String,
    /// RPC endpoint of the chain as seen from inside the graph-node container.
    pub ethereum_rpc: String,
    pub keep_after_stop: bool,
}

impl GraphDescription {
    pub fn new(chain: &str, origin_chain: Option<&str>, directory: Directory) -> Result<Self> {
        let node_ports = NodePorts::for_chain(chain)?;
        Ok(Self {
            directory,
            chain: chain.to_owned(),
            origin_chain: origin_chain.map(str::to_owned),
            ports: GraphPorts::for_chain(chain)?,
            postgres_user: "graph-node".to_owned(),
            postgres_password: "let-me-in".to_owned(),
            postgres_database: "graph-node".to_owned(),
            ethereum_rpc: format!("http://host.docker.internal:{}", node_ports.rpc_port),
            keep_after_stop: false,
        })
    }

    pub fn graph_dir(&self) -> PathBuf {
        let origin = self.origin_chain.as_deref().unwrap_or(&self.chain);
        self.directory.graph_dir(origin, &self.chain)
    }
}

#[derive(Serialize)]
struct ComposeContext<'a> {
    ports: GraphPorts,
    postgres_user: &'a str,
    postgres_password: &'a str,
    postgres_database: &'a str,
    network: &'a str,
    ethereum_rpc: &'a str,
    data_dir: String,
}

pub struct GraphNode {
    description: GraphDescription,
}

impl GraphNode {
    pub fn new(description: GraphDescription) -> Self {
        Self { description }
    }

    pub fn project_name(&self) -> String {
        format!("mosaic_graph_{}", self.description.chain)
    }

    pub fn compose_file(&self) -> PathBuf {
        self.description.graph_dir().join("docker-compose.yml")
    }

    pub fn admin_rpc(&self) -> String {
        format!("http://127.0.0.1:{}", self.description.ports.json_rpc)
    }

    pub fn ipfs_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.description.ports.ipfs)
    }

    pub fn render_compose(&self) -> Result<String> {
        let d = &self.description;
        let context = ComposeContext {
            ports: d.ports,
            postgres_user: &d.postgres_user,
            postgres_password: &d.postgres_password,
            postgres_database: &d.postgres_database,
            network: &d.chain,
            ethereum_rpc: &d.ethereum_rpc,
            data_dir: utils::string_from_path(&d.graph_dir())?,
        };
        let mut tera = Tera::default();
        tera.add_raw_template("docker-compose.yml", COMPOSE_TEMPLATE)?;
        tera.render(
            "docker-compose.yml",
            &tera::Context::from_serialize(&context)?,
        )
        .context("Whilst rendering docker-compose.yml")
    }

    pub async fn start(&self) -> Result<()> {
        let compose = self.render_compose()?;
        let path = self.compose_file();
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, compose).await?;
        info!(chain = %self.description.chain, compose = %path.display(), "starting graph node");
        self.compose(&["up", "-d"]).await?;
        println!(
            "{} graph node for {}: admin {} ipfs {}",
            "Started".green(),
            self.description.chain.bold(),
            self.admin_rpc(),
            self.ipfs_url()
        );
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if !utils::file_exists(self.compose_file()).await? {
            return Ok(());
        }
        if self.description.keep_after_stop {
            self.compose(&["stop"]).await
        } else {
            self.compose(&["down"]).await
        }
    }

    async fn compose(&self, args: &[&str]) -> Result<()> {
        let file = utils::string_from_path(&self.compose_file())?;
        let project = self.project_name();
        CommandBuilder::new()
            .silent()
            .cmd("docker-compose", &["-f", &file, "-p", &project])
            .more_args(args)
            .run_for_output()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports() {
        assert_eq!(GraphPorts::for_chain("ropsten").unwrap().graphql_http, 8000);
        let aux = GraphPorts::for_chain("1405").unwrap();
        assert_eq!(aux.json_rpc, 9425);
        assert_eq!(aux.postgres, 6837);
        assert!(GraphPorts::for_chain("60000").is_err());
        let directory = Directory::new("/m", "/p");
        assert!(GraphDescription::new("60000", Some("ropsten"), directory).is_err());
    }

    #[test]
    fn compose_file() {
        let description =
            GraphDescription::new("1405", Some("ropsten"), Directory::new("/m", "/p")).unwrap();
        let node = GraphNode::new(description);
        assert_eq!(node.project_name(), "mosaic_graph_1405");
        assert_eq!(
            node.compose_file(),
            PathBuf::from("/m/ropsten/graph/1405/docker-compose.yml")
        );
        let compose = node.render_compose().unwrap();
        assert!(compose.contains("'9405:8000'"));
        assert!(compose.contains("ethereum: '1405:http://host.docker.internal:41405'"));
        assert!(compose.contains("'/m/ropsten/graph/1405/postgres:/var/lib/postgresql/data'"));
        assert_eq!(node.admin_rpc(), "http://127.0.0.1:9425");
    }
}
