use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::{Color, Colorize};
use ethers::types::Address;
use fs_extra::dir::CopyOptions;
use serde::Serialize;
use strum_macros::Display;
use tera::Tera;
use tracing::info;

use crate::{
    address::checksummed,
    commands::CommandBuilder,
    config::{Directory, GatewayAddresses},
    utils,
};

const MANIFEST_TEMPLATE: &str = include_str!("../resources/subgraph.tera.yaml");

/// Which half of a gateway pair a subgraph indexes.
#[derive(Clone, Copy, Debug, ValueEnum, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Origin,
    Auxiliary,
}

#[derive(Serialize)]
struct EventHandler {
    entity: &'static str,
    signature: &'static str,
}

const GATEWAY_EVENTS: &[EventHandler] = &[
    EventHandler {
        entity: "StakeIntentDeclared",
        signature: "StakeIntentDeclared(indexed bytes32,address,uint256,address,uint256)",
    },
    EventHandler {
        entity: "StakeProgressed",
        signature: "StakeProgressed(indexed bytes32,address,uint256,uint256,bool,bytes32)",
    },
    EventHandler {
        entity: "StakeRevocationDeclared",
        signature: "RevertStakeIntentDeclared(indexed bytes32,address,uint256,uint256)",
    },
    EventHandler {
        entity: "RedeemIntentConfirmed",
        signature: "RedeemIntentConfirmed(indexed bytes32,address,uint256,address,uint256,uint256,uint256,bytes32)",
    },
    EventHandler {
        entity: "UnstakeProgressed",
        signature: "UnstakeProgressed(indexed bytes32,address,address,uint256,uint256,uint256,bool,bytes32)",
    },
    EventHandler {
        entity: "GatewayProven",
        signature: "GatewayProven(address,uint256,bytes32,bool)",
    },
];

const CO_GATEWAY_EVENTS: &[EventHandler] = &[
    EventHandler {
        entity: "StakeIntentConfirmed",
        signature: "StakeIntentConfirmed(indexed bytes32,address,uint256,address,uint256,uint256,bytes32)",
    },
    EventHandler {
        entity: "MintProgressed",
        signature: "MintProgressed(indexed bytes32,address,address,uint256,uint256,uint256,bool,bytes32)",
    },
    EventHandler {
        entity: "RedeemIntentDeclared",
        signature: "RedeemIntentDeclared(indexed bytes32,address,uint256,address,uint256)",
    },
    EventHandler {
        entity: "RedeemProgressed",
        signature: "RedeemProgressed(indexed bytes32,address,uint256,uint256,bool,bytes32)",
    },
    EventHandler {
        entity: "GatewayProven",
        signature: "GatewayProven(address,uint256,bytes32,bool)",
    },
];

#[derive(Serialize)]
struct ManifestContext<'a> {
    side: String,
    network: &'a str,
    start_block: u64,
    gateway_contract: &'static str,
    gateway: String,
    gateway_events: &'static [EventHandler],
    anchor: String,
    pool_contract: &'static str,
    pool_event: &'static str,
    pool: Option<String>,
}

/// A subgraph for one side of a gateway pair, deployed to a running graph node.
pub struct Subgraph {
    pub directory: Directory,
    pub origin_chain: String,
    pub aux_chain_id: u64,
    pub side: Side,
    pub addresses: GatewayAddresses,
    pub graph_admin_rpc: String,
    pub graph_ipfs: String,
}

impl Subgraph {
    fn gateway(&self) -> Address {
        match self.side {
            Side::Origin => self.addresses.gateway,
            Side::Auxiliary => self.addresses.co_gateway,
        }
    }

    /// `mosaic/<side>-<first four bytes of the gateway address>`
    pub fn name(&self) -> String {
        format!(
            "mosaic/{}-{}",
            self.side,
            hex::encode(&self.gateway().as_bytes()[..4])
        )
    }

    pub fn network(&self) -> String {
        match self.side {
            Side::Origin => self.origin_chain.clone(),
            Side::Auxiliary => self.aux_chain_id.to_string(),
        }
    }

    pub fn render_manifest(&self) -> Result<String> {
        let network = self.network();
        let (gateway_contract, gateway_events, anchor, pool_contract, pool_event, pool) =
            match self.side {
                Side::Origin => (
                    "EIP20Gateway",
                    GATEWAY_EVENTS,
                    self.addresses.anchor,
                    "OSTComposer",
                    "StakeRequested(uint256,address,uint256,uint256,uint256,address,address,bytes32)",
                    self.addresses.stake_pool,
                ),
                Side::Auxiliary => (
                    "EIP20CoGateway",
                    CO_GATEWAY_EVENTS,
                    self.addresses.co_anchor,
                    "RedeemPool",
                    "RedeemRequested(uint256,address,uint256,uint256,uint256,address,address,bytes32)",
                    self.addresses.redeem_pool,
                ),
            };
        let context = ManifestContext {
            side: self.side.to_string(),
            network: &network,
            start_block: 0,
            gateway_contract,
            gateway: checksummed(&self.gateway()),
            gateway_events,
            anchor: checksummed(&anchor),
            pool_contract,
            pool_event,
            pool: pool.as_ref().map(checksummed),
        };
        let mut tera = Tera::default();
        tera.add_raw_template("subgraph.yaml", MANIFEST_TEMPLATE)?;
        tera.render("subgraph.yaml", &tera::Context::from_serialize(&context)?)
            .context("Whilst rendering subgraph.yaml")
    }

    /// Stage the subgraph sources with a generated manifest, then codegen, create and
    /// deploy with the graph CLI.
    pub async fn deploy(&self) -> Result<()> {
        let source = self.directory.subgraph_source_dir(&self.side.to_string());
        let staging = tempfile::tempdir()?;
        stage_sources(&source, staging.path())?;
        tokio::fs::write(
            staging.path().join("subgraph.yaml"),
            self.render_manifest()?,
        )
        .await?;

        let name = self.name();
        let cwd = utils::string_from_path(staging.path())?;
        info!(%name, network = %self.network(), "deploying subgraph");
        for args in [
            vec!["codegen"],
            vec!["create", "--node", self.graph_admin_rpc.as_str(), name.as_str()],
            vec![
                "deploy",
                "--node",
                self.graph_admin_rpc.as_str(),
                "--ipfs",
                self.graph_ipfs.as_str(),
                name.as_str(),
            ],
        ] {
            CommandBuilder::new()
                .cwd(&cwd)
                .color(Color::BrightBlack)
                .cmd("graph", &args)
                .run_logged()
                .await?;
        }
        println!("{} subgraph {}", "Deployed".green(), name.bold());
        Ok(())
    }
}

fn stage_sources(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        return Ok(());
    }
    let options = CopyOptions::new().content_only(true).overwrite(true);
    fs_extra::dir::copy(source, target, &options)
        .with_context(|| format!("Cannot copy subgraph sources from {}", source.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subgraph(side: Side) -> Subgraph {
        Subgraph {
            directory: Directory::new("/m", "/p"),
            origin_chain: "ropsten".to_owned(),
            aux_chain_id: 1405,
            side,
            addresses: GatewayAddresses {
                stake_pool: Some(Address::repeat_byte(0x01)),
                gateway: Address::repeat_byte(0xab),
                anchor: Address::repeat_byte(0x03),
                co_anchor: Address::repeat_byte(0x04),
                co_gateway: Address::repeat_byte(0xcd),
                redeem_pool: None,
            },
            graph_admin_rpc: "http://127.0.0.1:8020".to_owned(),
            graph_ipfs: "http://127.0.0.1:5001".to_owned(),
        }
    }

    #[test]
    fn names() {
        assert_eq!(subgraph(Side::Origin).name(), "mosaic/origin-abababab");
        assert_eq!(subgraph(Side::Auxiliary).name(), "mosaic/auxiliary-cdcdcdcd");
        assert_eq!(subgraph(Side::Auxiliary).network(), "1405");
    }

    #[test]
    fn origin_manifest() {
        let manifest = subgraph(Side::Origin).render_manifest().unwrap();
        let address = checksummed(&Address::repeat_byte(0xab));
        assert!(manifest.contains(&format!("address: '{address}'")));
        assert!(manifest.contains("network: 'ropsten'"));
        assert!(manifest.contains("name: OSTComposer"));
        assert!(manifest.contains("handler: handleStakeIntentDeclared"));
        assert!(manifest.contains("file: ./src/origin/Anchor.ts"));
    }

    #[test]
    fn auxiliary_manifest_without_pool() {
        let manifest = subgraph(Side::Auxiliary).render_manifest().unwrap();
        assert!(manifest.contains("name: EIP20CoGateway"));
        assert!(manifest.contains(&checksummed(&Address::repeat_byte(0x04))));
        assert!(!manifest.contains("RedeemPool"));
    }

    #[test]
    fn staging_copies_sources() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("abi")).unwrap();
        std::fs::write(src.path().join("schema.graphql"), "type A @entity { id: ID! }").unwrap();
        std::fs::write(src.path().join("abi/Anchor.json"), "[]").unwrap();
        let dst = tempfile::tempdir().unwrap();
        stage_sources(src.path(), dst.path()).unwrap();
        assert!(dst.path().join("schema.graphql").exists());
        assert!(dst.path().join("abi/Anchor.json").exists());
        stage_sources(&src.path().join("missing"), dst.path()).unwrap();
    }
}
