//! Stake pool (OST composer) on origin and redeem pool on an auxiliary chain, with
//! the gateway configs that point facilitators at them.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use colored::Colorize;
use ethabi::Token;
use ethers::{
    providers::{Middleware, Provider, Ws},
    types::Address,
};
use tracing::{info, warn};

use crate::{
    address::checksummed,
    config::{Directory, GatewayConfig, MosaicConfig, ensure_unset, set_once},
    contracts::{Artifacts, ContractKind},
    deployer::Deployer,
    origin::deploy_organization,
};

/// Accounts involved in a pool deployment. `deployer` must be unlocked on the node.
#[derive(Clone, Copy, Debug)]
pub struct PoolAccounts {
    pub deployer: Address,
    pub owner: Address,
    pub admin: Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolAddresses {
    pub organization: Address,
    pub pool: Address,
}

async fn deploy_pool(
    provider: Arc<Provider<Ws>>,
    artifacts: Arc<Artifacts>,
    accounts: PoolAccounts,
    kind: ContractKind,
) -> Result<PoolAddresses> {
    let gas_price = provider.get_gas_price().await?;
    let d = Deployer::new(provider, artifacts, accounts.deployer, gas_price);
    let organization = deploy_organization(&d, accounts.owner, accounts.admin).await?;
    let pool = d.deploy(kind, &[Token::Address(organization)], &[]).await?;
    Ok(PoolAddresses { organization, pool })
}

/// Checked before anything is deployed, so a second run leaves no orphans on chain.
pub fn check_stake_pool_free(config: &MosaicConfig) -> Result<()> {
    let contracts = &config.origin_chain.contract_addresses;
    ensure_unset(
        "originChain.stakePoolOrganizationAddress",
        contracts.stake_pool_organization_address,
    )?;
    ensure_unset("originChain.stakePoolAddress", contracts.stake_pool_address)
}

pub fn check_redeem_pool_free(config: &MosaicConfig, aux_chain_id: u64) -> Result<()> {
    let aux = &config
        .require_aux_chain(&aux_chain_id.to_string())?
        .contract_addresses
        .auxiliary;
    ensure_unset(
        "auxiliary.redeemPoolOrganizationAddress",
        aux.redeem_pool_organization_address,
    )?;
    ensure_unset("auxiliary.redeemPoolAddress", aux.redeem_pool_address)
}

pub fn record_stake_pool(
    mut config: MosaicConfig,
    addresses: PoolAddresses,
) -> Result<MosaicConfig> {
    let contracts = &mut config.origin_chain.contract_addresses;
    set_once(
        "originChain.stakePoolOrganizationAddress",
        &mut contracts.stake_pool_organization_address,
        addresses.organization,
    )?;
    set_once(
        "originChain.stakePoolAddress",
        &mut contracts.stake_pool_address,
        addresses.pool,
    )?;
    Ok(config)
}

pub fn record_redeem_pool(
    mut config: MosaicConfig,
    aux_chain_id: u64,
    addresses: PoolAddresses,
) -> Result<MosaicConfig> {
    let aux = &mut config.aux_chain_entry(aux_chain_id).contract_addresses.auxiliary;
    set_once(
        "auxiliary.redeemPoolOrganizationAddress",
        &mut aux.redeem_pool_organization_address,
        addresses.organization,
    )?;
    set_once(
        "auxiliary.redeemPoolAddress",
        &mut aux.redeem_pool_address,
        addresses.pool,
    )?;
    Ok(config)
}

/// Write the gateway config of `aux_chain_id`, or of every auxiliary chain when
/// `None`. Chains whose gateway pair is not complete yet are skipped.
pub fn write_gateway_configs(
    config: &MosaicConfig,
    directory: &Directory,
    aux_chain_id: Option<u64>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for chain_id in config.auxiliary_chains.values().map(|aux| aux.chain_id) {
        if aux_chain_id.is_some_and(|wanted| wanted != chain_id) {
            continue;
        }
        match GatewayConfig::from_mosaic_config(config, chain_id) {
            Ok(gateway_config) => {
                written.push(gateway_config.write(directory, &config.origin_chain.chain)?)
            }
            Err(err) => warn!(chain_id, "no gateway config written: {err:#}"),
        }
    }
    Ok(written)
}

/// Deploy an OST composer on origin, record it and refresh every gateway config.
pub async fn setup_stake_pool(
    provider: Arc<Provider<Ws>>,
    artifacts: Arc<Artifacts>,
    directory: &Directory,
    origin_chain: &str,
    accounts: PoolAccounts,
) -> Result<PoolAddresses> {
    let config = MosaicConfig::from_chain(directory, origin_chain)?;
    check_stake_pool_free(&config)?;
    let addresses = deploy_pool(provider, artifacts, accounts, ContractKind::OstComposer).await?;
    let config = record_stake_pool(config, addresses)?;
    let path = config.write_to_mosaic_config_directory(directory)?;
    let gateway_configs = write_gateway_configs(&config, directory, None)?;
    info!(
        pool = %checksummed(&addresses.pool),
        gateway_configs = gateway_configs.len(),
        "stake pool recorded"
    );
    println!(
        "{} stake pool {} on {} ({})",
        "Deployed".green(),
        checksummed(&addresses.pool).bold(),
        origin_chain,
        path.display()
    );
    Ok(addresses)
}

/// Deploy a redeem pool on `aux_chain_id`, record it and rewrite its gateway config.
pub async fn setup_redeem_pool(
    provider: Arc<Provider<Ws>>,
    artifacts: Arc<Artifacts>,
    directory: &Directory,
    origin_chain: &str,
    aux_chain_id: u64,
    accounts: PoolAccounts,
) -> Result<PoolAddresses> {
    let config = MosaicConfig::from_chain(directory, origin_chain)?;
    check_redeem_pool_free(&config, aux_chain_id)?;
    let addresses = deploy_pool(provider, artifacts, accounts, ContractKind::RedeemPool).await?;
    let config = record_redeem_pool(config, aux_chain_id, addresses)?;
    let path = config.write_to_mosaic_config_directory(directory)?;
    write_gateway_configs(&config, directory, Some(aux_chain_id))?;
    info!(pool = %checksummed(&addresses.pool), aux_chain_id, "redeem pool recorded");
    println!(
        "{} redeem pool {} on {} ({})",
        "Deployed".green(),
        checksummed(&addresses.pool).bold(),
        aux_chain_id,
        path.display()
    );
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_pair(config: &mut MosaicConfig, chain_id: u64) {
        config.origin_chain.contract_addresses.simple_token_address =
            Some(Address::repeat_byte(0x0a));
        let entry = config.aux_chain_entry(chain_id);
        let origin = &mut entry.contract_addresses.origin;
        origin.eip20_gateway_address = Some(Address::repeat_byte(chain_id as u8));
        origin.anchor_address = Some(Address::repeat_byte(0x02));
        let aux = &mut entry.contract_addresses.auxiliary;
        aux.eip20_co_gateway_address = Some(Address::repeat_byte(0x03));
        aux.anchor_address = Some(Address::repeat_byte(0x04));
        aux.ost_prime_address = Some(Address::repeat_byte(0x05));
    }

    #[test]
    fn stake_pool_reaches_every_gateway_config() {
        let mosaic = tempfile::tempdir().unwrap();
        let directory = Directory::new(mosaic.path(), mosaic.path());
        let mut config = MosaicConfig::new("goerli");
        complete_pair(&mut config, 100);
        complete_pair(&mut config, 200);
        config.aux_chain_entry(300);

        let pool = PoolAddresses {
            organization: Address::repeat_byte(0x10),
            pool: Address::repeat_byte(0x11),
        };
        check_stake_pool_free(&config).unwrap();
        let config = record_stake_pool(config, pool).unwrap();
        assert!(check_stake_pool_free(&config).is_err());
        let written = write_gateway_configs(&config, &directory, None).unwrap();
        assert_eq!(written.len(), 2);
        let gateway_config = GatewayConfig::from_chain(
            &directory,
            "goerli",
            200,
            &Address::repeat_byte(200),
        )
        .unwrap();
        assert_eq!(
            gateway_config.origin_contracts.stake_pool_address,
            Some(Address::repeat_byte(0x11))
        );

        let other = PoolAddresses {
            organization: Address::repeat_byte(0x10),
            pool: Address::repeat_byte(0x12),
        };
        assert!(record_stake_pool(config, other).is_err());
    }

    #[test]
    fn redeem_pool_only_touches_its_chain() {
        let mosaic = tempfile::tempdir().unwrap();
        let directory = Directory::new(mosaic.path(), mosaic.path());
        let mut config = MosaicConfig::new("goerli");
        complete_pair(&mut config, 100);
        complete_pair(&mut config, 200);
        let pool = PoolAddresses {
            organization: Address::repeat_byte(0x20),
            pool: Address::repeat_byte(0x21),
        };
        assert!(check_redeem_pool_free(&config, 300).is_err());
        check_redeem_pool_free(&config, 100).unwrap();
        let config = record_redeem_pool(config, 100, pool).unwrap();
        assert!(check_redeem_pool_free(&config, 100).is_err());
        check_redeem_pool_free(&config, 200).unwrap();
        let written = write_gateway_configs(&config, &directory, Some(100)).unwrap();
        assert_eq!(written.len(), 1);
        let gateway_config = GatewayConfig::from_file(&written[0]).unwrap();
        assert_eq!(
            gateway_config.auxiliary_contracts.redeem_pool_address,
            Some(Address::repeat_byte(0x21))
        );
        assert_eq!(
            config
                .aux_chain("200")
                .unwrap()
                .contract_addresses
                .auxiliary
                .redeem_pool_address,
            None
        );
    }
}
