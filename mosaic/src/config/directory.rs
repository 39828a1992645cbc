use std::path::PathBuf;

use anyhow::Result;
use ethers::types::Address;

use crate::{address::checksummed, utils};

pub const DEFAULT_MOSAIC_DIR: &str = ".mosaic";
pub const MOSAIC_CONFIG_FILE: &str = "mosaic.json";
pub const GATEWAY_CONFIG_FILE: &str = "gateway-config.json";
pub const TOKEN_CONFIG_FILE: &str = "token-config.json";

/// Where everything lives on disk.
///
/// `mosaic_dir` holds live chain data and the accumulated [`MosaicConfig`](super::MosaicConfig)
/// files; `project_dir` holds what gets committed: init configs, genesis and chain state of
/// auxiliary chains, contract artifacts and subgraph sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directory {
    pub mosaic_dir: PathBuf,
    pub project_dir: PathBuf,
}

impl Directory {
    pub fn new(mosaic_dir: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            mosaic_dir: mosaic_dir.into(),
            project_dir: project_dir.into(),
        }
    }

    /// Both directories resolved against the working directory. Docker treats a
    /// relative `-v` source as a named volume.
    pub fn absolute(&self) -> Result<Self> {
        Ok(Self::new(
            std::path::absolute(&self.mosaic_dir)?,
            std::path::absolute(&self.project_dir)?,
        ))
    }

    /// `~/.mosaic` and the current working directory.
    pub fn default_dirs() -> Result<Self> {
        Ok(Self::new(
            utils::relative_home_path(DEFAULT_MOSAIC_DIR)?,
            std::env::current_dir()?,
        ))
    }

    pub fn origin_dir(&self, origin: &str) -> PathBuf {
        self.mosaic_dir.join(origin)
    }

    pub fn mosaic_config_path(&self, origin: &str) -> PathBuf {
        self.origin_dir(origin).join(MOSAIC_CONFIG_FILE)
    }

    pub fn origin_chain_dir(&self, origin: &str) -> PathBuf {
        self.origin_dir(origin).join("origin")
    }

    pub fn aux_chain_dir(&self, origin: &str, aux_chain_id: &str) -> PathBuf {
        self.origin_dir(origin).join(aux_chain_id)
    }

    pub fn graph_dir(&self, origin: &str, chain: &str) -> PathBuf {
        self.origin_dir(origin).join("graph").join(chain)
    }

    pub fn gateway_dir(&self, origin: &str, aux_chain_id: &str, gateway: &Address) -> PathBuf {
        self.aux_chain_dir(origin, aux_chain_id)
            .join(format!("gateway-{}", checksummed(gateway)))
    }

    pub fn gateway_config_path(
        &self,
        origin: &str,
        aux_chain_id: &str,
        gateway: &Address,
    ) -> PathBuf {
        self.gateway_dir(origin, aux_chain_id, gateway)
            .join(GATEWAY_CONFIG_FILE)
    }

    pub fn project_chain_dir(&self, origin: &str, aux_chain_id: &str) -> PathBuf {
        self.project_dir
            .join("chains")
            .join(origin)
            .join(aux_chain_id)
    }

    pub fn init_config_path(&self, aux_chain_id: &str) -> PathBuf {
        self.project_dir
            .join("initialize")
            .join(format!("{aux_chain_id}.json"))
    }

    pub fn default_contracts_path(&self) -> PathBuf {
        self.project_dir.join("contracts").join("contracts.json")
    }

    pub fn subgraph_source_dir(&self, side: &str) -> PathBuf {
        self.project_dir.join("graph").join(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_dirs_become_absolute() {
        let dir = Directory::new("mosaic-data", "/p").absolute().unwrap();
        assert!(dir.mosaic_dir.is_absolute());
        assert_eq!(
            dir.mosaic_dir,
            std::env::current_dir().unwrap().join("mosaic-data")
        );
        assert_eq!(dir.project_dir, PathBuf::from("/p"));
    }

    #[test]
    fn layout() {
        let dir = Directory::new("/m", "/p");
        assert_eq!(
            dir.mosaic_config_path("ropsten"),
            PathBuf::from("/m/ropsten/mosaic.json")
        );
        assert_eq!(
            dir.aux_chain_dir("ropsten", "1405"),
            PathBuf::from("/m/ropsten/1405")
        );
        assert_eq!(
            dir.project_chain_dir("ropsten", "1405"),
            PathBuf::from("/p/chains/ropsten/1405")
        );
        assert_eq!(
            dir.init_config_path("500"),
            PathBuf::from("/p/initialize/500.json")
        );
        let gateway = Address::repeat_byte(0xab);
        assert_eq!(
            dir.gateway_config_path("ropsten", "1405", &gateway),
            PathBuf::from(format!(
                "/m/ropsten/1405/gateway-{}/gateway-config.json",
                checksummed(&gateway)
            ))
        );
    }
}
