use anyhow::{Result, anyhow};
use clap::ValueEnum;
use strum::EnumProperty;
use strum_macros::{Display, EnumIter, EnumString};

use crate::config::{Directory, MosaicConfig};

/// Origin chains the tool knows without a mosaic config.
#[derive(
    Clone, Copy, Debug, ValueEnum, Display, EnumString, EnumIter, EnumProperty, PartialEq, Eq,
)]
pub enum KnownOrigin {
    #[value(name = "ethereum")]
    #[strum(serialize = "ethereum", props(client = "parity", chain_id = "1"))]
    Ethereum,
    #[value(name = "ropsten")]
    #[strum(serialize = "ropsten", props(client = "parity", chain_id = "3"))]
    Ropsten,
    #[value(name = "goerli")]
    #[strum(serialize = "goerli", props(client = "parity", chain_id = "5"))]
    Goerli,
    #[value(name = "dev-origin")]
    #[strum(serialize = "dev-origin", props(client = "geth", chain_id = "1515"))]
    DevOrigin,
}

impl KnownOrigin {
    pub fn client(&self) -> NodeClient {
        self.get_str("client")
            .and_then(|c| c.parse::<NodeClient>().ok())
            .unwrap_or(NodeClient::Geth)
    }

    pub fn chain_id(&self) -> Result<u64> {
        let id = self
            .get_str("chain_id")
            .ok_or_else(|| anyhow!("chain {self} has no chain id"))?;
        Ok(id.parse()?)
    }
}

/// Node implementation a chain runs on.
#[derive(Clone, Copy, Debug, ValueEnum, Display, EnumString, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum NodeClient {
    Geth,
    Parity,
}

/// Parity serves the public networks, everything else (auxiliary chains, the dev
/// origin) runs geth. `client_override` wins over both.
pub fn select_client(chain: &str, client_override: Option<NodeClient>) -> NodeClient {
    if let Some(client) = client_override {
        return client;
    }
    match chain.parse::<KnownOrigin>() {
        Ok(origin) => origin.client(),
        Err(_) => NodeClient::Geth,
    }
}

/// Auxiliary chains are named by their numeric chain id.
pub fn aux_chain_id(chain: &str) -> Option<u64> {
    if chain.is_empty() || !chain.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    chain.parse().ok()
}

/// A known origin chain name, or a chain for which a mosaic config exists.
/// Numeric identifiers are never origin chains.
pub fn is_valid_origin_chain(chain: &str, directory: &Directory) -> bool {
    if chain.is_empty() || aux_chain_id(chain).is_some() {
        return false;
    }
    chain.parse::<KnownOrigin>().is_ok() || MosaicConfig::exists(directory, chain)
}

/// An auxiliary chain generated into the project directory, or one recorded in the
/// mosaic config of `origin`.
pub fn is_valid_aux_chain(aux: &str, origin: &str, directory: &Directory) -> bool {
    if aux_chain_id(aux).is_none() {
        return false;
    }
    if directory.project_chain_dir(origin, aux).is_dir() {
        return true;
    }
    MosaicConfig::from_chain(directory, origin)
        .map(|config| config.aux_chain(aux).is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn client_selection() {
        assert_eq!(select_client("ropsten", None), NodeClient::Parity);
        assert_eq!(select_client("goerli", None), NodeClient::Parity);
        assert_eq!(select_client("ethereum", None), NodeClient::Parity);
        assert_eq!(select_client("dev-origin", None), NodeClient::Geth);
        assert_eq!(select_client("1405", None), NodeClient::Geth);
        assert_eq!(
            select_client("1405", Some(NodeClient::Parity)),
            NodeClient::Parity
        );
        assert_eq!(
            select_client("goerli", Some(NodeClient::Geth)),
            NodeClient::Geth
        );
    }

    #[test]
    fn chain_props() {
        assert_eq!(KnownOrigin::Goerli.chain_id().unwrap(), 5);
        assert_eq!(
            "dev-origin".parse::<KnownOrigin>().unwrap(),
            KnownOrigin::DevOrigin
        );
        assert_eq!("parity".parse::<NodeClient>().unwrap(), NodeClient::Parity);
        assert_eq!(KnownOrigin::iter().count(), 4);
        assert_eq!(NodeClient::Geth.to_string(), "geth");
    }

    #[test]
    fn validators() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::new(dir.path().join("mosaic"), dir.path().join("project"));

        assert!(is_valid_origin_chain("goerli", &directory));
        assert!(!is_valid_origin_chain("1405", &directory));
        assert!(!is_valid_origin_chain("private", &directory));
        MosaicConfig::new("private")
            .write_to_mosaic_config_directory(&directory)
            .unwrap();
        assert!(is_valid_origin_chain("private", &directory));

        assert!(!is_valid_aux_chain("1405", "goerli", &directory));
        std::fs::create_dir_all(directory.project_chain_dir("goerli", "1405")).unwrap();
        assert!(is_valid_aux_chain("1405", "goerli", &directory));

        let mut config = MosaicConfig::new("private");
        config.aux_chain_entry(1406);
        config.write_to_mosaic_config_directory(&directory).unwrap();
        assert!(is_valid_aux_chain("1406", "private", &directory));
        assert!(!is_valid_aux_chain("aux", "private", &directory));
    }
}
