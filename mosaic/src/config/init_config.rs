use std::path::Path;

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use super::read_config_file;
use crate::{
    error::MosaicError,
    serde_util::{checksummed, u256_dec},
};

/// Transaction defaults for the origin side. `from` must be unlocked on the origin node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TxOptions {
    #[serde(with = "checksummed")]
    pub from: Address,
    #[serde(with = "u256_dec")]
    pub gas_price: U256,
}

/// Deployment parameters for bootstrapping one auxiliary chain, read from
/// `initialize/<chainId>.json`. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InitConfig {
    /// Name of the origin chain the new chain is linked to. Keys the MosaicConfig file.
    pub origin_chain: String,
    pub origin_tx_options: TxOptions,
    /// EIP20 base token (OST) on the origin chain.
    #[serde(with = "checksummed")]
    pub origin_ost_address: Address,
    #[serde(with = "u256_dec")]
    pub origin_bounty: U256,
    #[serde(with = "u256_dec")]
    pub auxiliary_bounty: U256,
    #[serde(with = "u256_dec")]
    pub origin_stake_amount: U256,
    #[serde(with = "u256_dec")]
    pub origin_stake_gas_price: U256,
    #[serde(with = "u256_dec")]
    pub origin_stake_gas_limit: U256,
    /// New origin blocks to see after staking before reading the state root.
    pub origin_stake_blocks_to_wait: u64,
    #[serde(with = "checksummed")]
    pub origin_anchor_organization_owner: Address,
    #[serde(with = "checksummed")]
    pub origin_anchor_organization_admin: Address,
    #[serde(with = "checksummed")]
    pub origin_gateway_organization_owner: Address,
    #[serde(with = "checksummed")]
    pub auxiliary_anchor_organization_owner: Address,
    #[serde(with = "checksummed")]
    pub auxiliary_anchor_organization_admin: Address,
    #[serde(with = "checksummed")]
    pub auxiliary_co_gateway_and_ost_prime_organization_owner: Address,
    #[serde(with = "checksummed")]
    pub origin_burner: Address,
    #[serde(with = "checksummed")]
    pub auxiliary_burner: Address,
    pub origin_max_state_roots: u64,
    pub auxiliary_max_state_roots: u64,
}

impl InitConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = read_config_file(path)?;
        config
            .validate()
            .with_context(|| format!("Invalid init config {}", path.display()))?;
        Ok(config)
    }

    /// Every string must be non-empty and every number non-zero.
    pub fn validate(&self) -> Result<(), MosaicError> {
        let checks: [(&'static str, bool); 12] = [
            ("originChain", self.origin_chain.trim().is_empty()),
            ("originTxOptions.gasPrice", self.origin_tx_options.gas_price.is_zero()),
            ("originBounty", self.origin_bounty.is_zero()),
            ("auxiliaryBounty", self.auxiliary_bounty.is_zero()),
            ("originStakeAmount", self.origin_stake_amount.is_zero()),
            ("originStakeGasPrice", self.origin_stake_gas_price.is_zero()),
            ("originStakeGasLimit", self.origin_stake_gas_limit.is_zero()),
            ("originStakeBlocksToWait", self.origin_stake_blocks_to_wait == 0),
            ("originMaxStateRoots", self.origin_max_state_roots == 0),
            ("auxiliaryMaxStateRoots", self.auxiliary_max_state_roots == 0),
            ("originTxOptions.from", self.origin_tx_options.from.is_zero()),
            ("originOstAddress", self.origin_ost_address.is_zero()),
        ];
        match checks.iter().find(|(_, bad)| *bad) {
            Some((field, _)) => Err(MosaicError::InvalidInitConfig { field: *field }),
            None => Ok(()),
        }
    }

    /// OST the staker has to approve to the gateway: the stake plus the bounty.
    pub fn stake_allowance(&self) -> U256 {
        self.origin_stake_amount + self.origin_bounty
    }
}
