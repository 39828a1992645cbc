use std::path::{Path, PathBuf};

use anyhow::Result;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use super::{Directory, MosaicConfig, read_config_file, required, write_config_file};
use crate::serde_util::{checksummed, checksummed::option as opt_address};

/// Per-gateway descriptor written next to the auxiliary chain data, for tools that
/// only care about one gateway pair and its pools.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GatewayConfig {
    pub aux_chain_id: u64,
    pub origin_contracts: OriginGatewayContracts,
    pub auxiliary_contracts: AuxiliaryGatewayContracts,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OriginGatewayContracts {
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub stake_pool_address: Option<Address>,
    #[serde(with = "checksummed")]
    pub eip20_gateway_address: Address,
    #[serde(with = "checksummed")]
    pub anchor_address: Address,
    #[serde(with = "checksummed")]
    pub value_token_address: Address,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuxiliaryGatewayContracts {
    #[serde(default, with = "opt_address", skip_serializing_if = "Option::is_none")]
    pub redeem_pool_address: Option<Address>,
    #[serde(with = "checksummed")]
    pub eip20_co_gateway_address: Address,
    #[serde(with = "checksummed")]
    pub anchor_address: Address,
    #[serde(with = "checksummed")]
    pub utility_token_address: Address,
}

impl GatewayConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(read_config_file(path)?)
    }

    pub fn from_chain(
        directory: &Directory,
        origin: &str,
        aux_chain_id: u64,
        gateway: &Address,
    ) -> Result<Self> {
        Self::from_file(&directory.gateway_config_path(
            origin,
            &aux_chain_id.to_string(),
            gateway,
        ))
    }

    /// Project the gateway pair of `aux_chain_id` out of a mosaic config.
    pub fn from_mosaic_config(config: &MosaicConfig, aux_chain_id: u64) -> Result<Self> {
        let aux = config.require_aux_chain(&aux_chain_id.to_string())?;
        let origin = &aux.contract_addresses.origin;
        let auxiliary = &aux.contract_addresses.auxiliary;
        Ok(Self {
            aux_chain_id,
            origin_contracts: OriginGatewayContracts {
                stake_pool_address: config.stake_pool_for(aux),
                eip20_gateway_address: required(
                    "origin.eip20GatewayAddress",
                    origin.eip20_gateway_address,
                )?,
                anchor_address: required("origin.anchorAddress", origin.anchor_address)?,
                value_token_address: required(
                    "originChain.simpleTokenAddress",
                    config.origin_chain.contract_addresses.simple_token_address,
                )?,
            },
            auxiliary_contracts: AuxiliaryGatewayContracts {
                redeem_pool_address: auxiliary.redeem_pool_address,
                eip20_co_gateway_address: required(
                    "auxiliary.eip20CoGatewayAddress",
                    auxiliary.eip20_co_gateway_address,
                )?,
                anchor_address: required("auxiliary.anchorAddress", auxiliary.anchor_address)?,
                utility_token_address: required(
                    "auxiliary.ostPrimeAddress",
                    auxiliary.ost_prime_address,
                )?,
            },
        })
    }

    pub fn write(&self, directory: &Directory, origin: &str) -> Result<PathBuf> {
        let path = directory.gateway_config_path(
            origin,
            &self.aux_chain_id.to_string(),
            &self.origin_contracts.eip20_gateway_address,
        );
        write_config_file(&path, self)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::MosaicError;

    #[test]
    fn missing_and_blank_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway-config.json");
        let err = GatewayConfig::from_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MosaicError>(),
            Some(MosaicError::MissingConfigFile(_))
        ));

        std::fs::write(&path, "  \n").unwrap();
        let err = GatewayConfig::from_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MosaicError>(),
            Some(MosaicError::MissingConfigFile(_))
        ));
    }

    #[test]
    fn schema_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway-config.json");
        let good = json!({
            "auxChainId": 1405,
            "originContracts": {
                "eip20GatewayAddress": "0x1111111111111111111111111111111111111111",
                "anchorAddress": "0x2222222222222222222222222222222222222222",
                "valueTokenAddress": "0x3333333333333333333333333333333333333333"
            },
            "auxiliaryContracts": {
                "eip20CoGatewayAddress": "0x4444444444444444444444444444444444444444",
                "anchorAddress": "0x5555555555555555555555555555555555555555",
                "utilityTokenAddress": "0x6666666666666666666666666666666666666666"
            }
        });
        std::fs::write(&path, good.to_string()).unwrap();
        let config = GatewayConfig::from_file(&path).unwrap();
        assert_eq!(config.aux_chain_id, 1405);
        assert_eq!(config.origin_contracts.stake_pool_address, None);

        for broken in [
            {
                let mut v = good.clone();
                v["originContracts"]["anchorAddress"] = json!("0x22");
                v
            },
            {
                let mut v = good.clone();
                v["auxiliaryContracts"]["extra"] = json!(1);
                v
            },
            {
                let mut v = good.clone();
                v.as_object_mut().unwrap().remove("auxChainId");
                v
            },
        ] {
            std::fs::write(&path, broken.to_string()).unwrap();
            let err = GatewayConfig::from_file(&path).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<MosaicError>(),
                Some(MosaicError::InvalidConfigSchema { .. })
            ));
        }
    }
}
