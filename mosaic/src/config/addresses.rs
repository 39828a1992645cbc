use anyhow::Result;
use ethers::types::Address;

use super::{GatewayConfig, MosaicConfig, TokenConfig, required};

/// The addresses needed to drive one gateway pair. Pools are optional until
/// `setup-stake-pool` and `setup-redeem-pool` have run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayAddresses {
    pub stake_pool: Option<Address>,
    pub gateway: Address,
    pub anchor: Address,
    pub co_anchor: Address,
    pub co_gateway: Address,
    pub redeem_pool: Option<Address>,
}

impl GatewayAddresses {
    pub fn from_mosaic_config(config: &MosaicConfig, aux_chain_id: u64) -> Result<Self> {
        let aux = config.require_aux_chain(&aux_chain_id.to_string())?;
        let origin = &aux.contract_addresses.origin;
        let auxiliary = &aux.contract_addresses.auxiliary;
        Ok(Self {
            stake_pool: config.stake_pool_for(aux),
            gateway: required("origin.eip20GatewayAddress", origin.eip20_gateway_address)?,
            anchor: required("origin.anchorAddress", origin.anchor_address)?,
            co_anchor: required("auxiliary.anchorAddress", auxiliary.anchor_address)?,
            co_gateway: required(
                "auxiliary.eip20CoGatewayAddress",
                auxiliary.eip20_co_gateway_address,
            )?,
            redeem_pool: auxiliary.redeem_pool_address,
        })
    }

    pub fn from_gateway_config(config: &GatewayConfig) -> Self {
        Self {
            stake_pool: config.origin_contracts.stake_pool_address,
            gateway: config.origin_contracts.eip20_gateway_address,
            anchor: config.origin_contracts.anchor_address,
            co_anchor: config.auxiliary_contracts.anchor_address,
            co_gateway: config.auxiliary_contracts.eip20_co_gateway_address,
            redeem_pool: config.auxiliary_contracts.redeem_pool_address,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenAddresses {
    pub value_token: Address,
    pub utility_token: Address,
}

impl TokenAddresses {
    pub fn from_mosaic_config(config: &MosaicConfig, aux_chain_id: u64) -> Result<Self> {
        let aux = config.require_aux_chain(&aux_chain_id.to_string())?;
        Ok(Self {
            value_token: required(
                "originChain.simpleTokenAddress",
                config.origin_chain.contract_addresses.simple_token_address,
            )?,
            utility_token: required(
                "auxiliary.ostPrimeAddress",
                aux.contract_addresses.auxiliary.ost_prime_address,
            )?,
        })
    }

    pub fn from_gateway_config(config: &GatewayConfig) -> Self {
        Self {
            value_token: config.origin_contracts.value_token_address,
            utility_token: config.auxiliary_contracts.utility_token_address,
        }
    }

    pub fn from_token_config(config: &TokenConfig) -> Self {
        Self {
            value_token: config.value_token_address,
            utility_token: config.utility_token_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployed() -> MosaicConfig {
        let mut config = MosaicConfig::new("dev-origin");
        config.origin_chain.contract_addresses.simple_token_address =
            Some(Address::repeat_byte(0x01));
        let aux = config.aux_chain_entry(1000);
        let origin = &mut aux.contract_addresses.origin;
        origin.anchor_address = Some(Address::repeat_byte(0x02));
        origin.eip20_gateway_address = Some(Address::repeat_byte(0x03));
        let auxiliary = &mut aux.contract_addresses.auxiliary;
        auxiliary.anchor_address = Some(Address::repeat_byte(0x04));
        auxiliary.eip20_co_gateway_address = Some(Address::repeat_byte(0x05));
        auxiliary.ost_prime_address = Some(Address::repeat_byte(0x06));
        config
    }

    #[test]
    fn projections_agree() {
        let config = deployed();
        let gateway_config = GatewayConfig::from_mosaic_config(&config, 1000).unwrap();

        let from_mosaic = GatewayAddresses::from_mosaic_config(&config, 1000).unwrap();
        assert_eq!(
            from_mosaic,
            GatewayAddresses::from_gateway_config(&gateway_config)
        );
        assert_eq!(from_mosaic.co_gateway, Address::repeat_byte(0x05));
        assert_eq!(from_mosaic.stake_pool, None);

        assert_eq!(
            TokenAddresses::from_mosaic_config(&config, 1000).unwrap(),
            TokenAddresses::from_gateway_config(&gateway_config)
        );
    }

    #[test]
    fn incomplete_pair() {
        let mut config = deployed();
        assert!(GatewayAddresses::from_mosaic_config(&config, 2000).is_err());
        config
            .aux_chain_entry(1000)
            .contract_addresses
            .auxiliary
            .eip20_co_gateway_address = None;
        let err = GatewayAddresses::from_mosaic_config(&config, 1000).unwrap_err();
        assert!(err.to_string().contains("eip20CoGatewayAddress"));
    }
}
