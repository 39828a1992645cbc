use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Directory, read_config_file, write_config_file};
use crate::{address::checksummed, serde_util::checksummed::option as opt_address};

/// Everything deployed for one origin chain and the auxiliary chains linked to it.
/// Stored at `<mosaicDir>/<origin>/mosaic.json` and rewritten after each saga step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MosaicConfig {
    pub origin_chain: OriginChainConfig,
    #[serde(default)]
    pub auxiliary_chains: BTreeMap<String, AuxiliaryChainConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OriginChainConfig {
    pub chain: String,
    #[serde(default)]
    pub contract_addresses: OriginChainContracts,
}

/// Origin contracts shared by every auxiliary chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OriginChainContracts {
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub simple_token_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub stake_pool_organization_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub stake_pool_address: Option<Address>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuxiliaryChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub boot_nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis: Option<Value>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub sealer: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub deployer: Option<Address>,
    #[serde(default)]
    pub contract_addresses: ContractAddresses,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContractAddresses {
    #[serde(default)]
    pub origin: OriginContracts,
    #[serde(default)]
    pub auxiliary: AuxiliaryContracts,
}

/// Origin side of one gateway pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OriginContracts {
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub anchor_organization_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub anchor_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub merkle_patricia_lib_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub message_bus_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub gateway_lib_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub gateway_organization_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub eip20_gateway_address: Option<Address>,
    /// A stake pool serving only this pair; the shared one in `originChain` otherwise.
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub stake_pool_organization_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub stake_pool_address: Option<Address>,
}

/// Auxiliary side of one gateway pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuxiliaryContracts {
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub anchor_organization_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub anchor_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub co_gateway_and_ost_prime_organization_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub ost_prime_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub merkle_patricia_lib_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub message_bus_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub gateway_lib_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub eip20_co_gateway_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub redeem_pool_organization_address: Option<Address>,
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub redeem_pool_address: Option<Address>,
}

/// Fill an address slot. Setting the same value twice is fine; replacing a recorded
/// address with a different one is refused.
pub fn set_once(field: &str, slot: &mut Option<Address>, value: Address) -> Result<()> {
    match slot {
        Some(existing) if *existing != value => Err(anyhow!(
            "{field} is already recorded as {}, refusing to replace it with {}",
            checksummed(existing),
            checksummed(&value)
        )),
        _ => {
            *slot = Some(value);
            Ok(())
        }
    }
}

/// Refuse to deploy something whose slot is already taken.
pub fn ensure_unset(field: &str, slot: Option<Address>) -> Result<()> {
    match slot {
        Some(existing) => Err(anyhow!(
            "{field} is already recorded as {}",
            checksummed(&existing)
        )),
        None => Ok(()),
    }
}

/// Read a slot that a later step depends on.
pub fn required(field: &str, slot: Option<Address>) -> Result<Address> {
    slot.ok_or_else(|| anyhow!("{field} is not recorded in the mosaic config"))
}

impl MosaicConfig {
    pub fn new(origin_chain: &str) -> Self {
        Self {
            origin_chain: OriginChainConfig {
                chain: origin_chain.to_owned(),
                contract_addresses: OriginChainContracts::default(),
            },
            auxiliary_chains: BTreeMap::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(read_config_file(path)?)
    }

    /// The config of `chain` if one was written, else an empty one. Absence is not an error.
    pub fn from_chain(directory: &Directory, chain: &str) -> Result<Self> {
        let path = directory.mosaic_config_path(chain);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::new(chain))
        }
    }

    pub fn exists(directory: &Directory, chain: &str) -> bool {
        directory.mosaic_config_path(chain).exists()
    }

    /// Overwrites any earlier file; last writer wins.
    pub fn write_to_mosaic_config_directory(&self, directory: &Directory) -> Result<PathBuf> {
        let path = directory.mosaic_config_path(&self.origin_chain.chain);
        write_config_file(&path, self)?;
        Ok(path)
    }

    pub fn aux_chain(&self, chain_id: &str) -> Option<&AuxiliaryChainConfig> {
        self.auxiliary_chains.get(chain_id)
    }

    /// The stake pool facilitators of `aux` should use.
    pub fn stake_pool_for(&self, aux: &AuxiliaryChainConfig) -> Option<Address> {
        aux.contract_addresses
            .origin
            .stake_pool_address
            .or(self.origin_chain.contract_addresses.stake_pool_address)
    }

    pub fn require_aux_chain(&self, chain_id: &str) -> Result<&AuxiliaryChainConfig> {
        self.aux_chain(chain_id).ok_or_else(|| {
            anyhow!(
                "auxiliary chain {chain_id} is not in the mosaic config of {}",
                self.origin_chain.chain
            )
        })
    }

    /// The entry for `chain_id`, created empty if it is not there yet.
    pub fn aux_chain_entry(&mut self, chain_id: u64) -> &mut AuxiliaryChainConfig {
        self.auxiliary_chains
            .entry(chain_id.to_string())
            .or_insert_with(|| AuxiliaryChainConfig {
                chain_id,
                ..Default::default()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_once_refuses_overwrite() {
        let mut slot = None;
        let a = Address::repeat_byte(1);
        set_once("anchorAddress", &mut slot, a).unwrap();
        set_once("anchorAddress", &mut slot, a).unwrap();
        assert!(set_once("anchorAddress", &mut slot, Address::repeat_byte(2)).is_err());
        assert_eq!(slot, Some(a));
        assert!(ensure_unset("anchorAddress", slot).is_err());
        ensure_unset("anchorAddress", None).unwrap();
    }

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::new(dir.path(), dir.path());
        let config = MosaicConfig::from_chain(&directory, "ropsten").unwrap();
        assert_eq!(config, MosaicConfig::new("ropsten"));
        assert!(!MosaicConfig::exists(&directory, "ropsten"));
    }

    #[test]
    fn json_layout() {
        let mut config = MosaicConfig::new("goerli");
        let aux = config.aux_chain_entry(1405);
        aux.contract_addresses.auxiliary.eip20_co_gateway_address =
            Some(Address::repeat_byte(0x11));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["originChain"]["chain"], "goerli");
        assert_eq!(json["auxiliaryChains"]["1405"]["chainId"], 1405);
        let auxiliary = &json["auxiliaryChains"]["1405"]["contractAddresses"]["auxiliary"];
        assert_eq!(
            auxiliary["eip20CoGatewayAddress"],
            checksummed(&Address::repeat_byte(0x11))
        );
        // Unset slots are left out entirely.
        assert!(
            json["auxiliaryChains"]["1405"]["contractAddresses"]["origin"]
                .as_object()
                .unwrap()
                .is_empty()
        );
    }
}
