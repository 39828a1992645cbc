//! Bootstrap of a new auxiliary chain against an existing origin chain.
//!
//! The steps run strictly in order and nothing is rolled back: a failure leaves the
//! chain directory and whatever was written to the mosaic config behind, and the
//! next attempt is refused until the environment is cleaned up by hand.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Result, anyhow};
use colored::Colorize;
use ethers::{
    providers::{Middleware, Provider, Ws},
    types::{H256, U256},
};
use strum_macros::Display;
use tracing::{Instrument, Span, info, info_span};

use crate::{
    address::checksummed,
    auxiliary::{AuxiliaryChain, expected_ost_co_gateway_address},
    config::{Directory, InitConfig, MosaicConfig, set_once},
    contracts::Artifacts,
    error::MosaicError,
    origin::{OriginChain, hash_lock},
    proof::Proof,
    retry::RetryPolicy,
};

/// Where the bootstrap is. Every transition is logged.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    Clean,
    AccountsGenerated,
    ChainGenerated,
    SealerRunning,
    OriginContractsDeployed,
    OriginStaked,
    AuxContractsDeployed,
    PrimeFunded,
    StakeProven,
    Progressed,
    ConfigWritten,
}

pub struct Initialization {
    init: InitConfig,
    chain_id: u64,
    origin_websocket: String,
    password_file: PathBuf,
    directory: Directory,
    artifacts: Arc<Artifacts>,
    keep_after_stop: bool,
    state: SagaState,
    span: Span,
}

impl Initialization {
    pub fn new(
        init: InitConfig,
        chain_id: u64,
        origin_websocket: &str,
        password_file: PathBuf,
        directory: Directory,
        artifacts: Arc<Artifacts>,
        keep_after_stop: bool,
    ) -> Self {
        let span = info_span!("initialization", chain = %init.origin_chain, chain_id);
        Self {
            init,
            chain_id,
            origin_websocket: origin_websocket.to_owned(),
            password_file,
            directory,
            artifacts,
            keep_after_stop,
            state: SagaState::Clean,
            span,
        }
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    fn advance(&mut self, state: SagaState) {
        info!(from = %self.state, to = %state, "bootstrap step");
        self.state = state;
    }

    /// Refuse to start over an earlier attempt: neither chain data nor a config entry
    /// may exist for this chain id.
    pub fn check_environment(&self) -> Result<(), MosaicError> {
        let origin = &self.init.origin_chain;
        let chain_dir = self
            .directory
            .aux_chain_dir(origin, &self.chain_id.to_string());
        if chain_dir.exists() {
            return Err(MosaicError::EnvironmentNotClean(format!(
                "chain directory {} already exists",
                chain_dir.display()
            )));
        }
        let config = MosaicConfig::from_chain(&self.directory, origin)
            .map_err(|e| MosaicError::EnvironmentNotClean(format!("{e:#}")))?;
        if config.aux_chain(&self.chain_id.to_string()).is_some() {
            return Err(MosaicError::EnvironmentNotClean(format!(
                "mosaic config of {origin} already has an entry for chain {}",
                self.chain_id
            )));
        }
        Ok(())
    }

    /// Run the whole bootstrap and return the config as last written.
    pub async fn run(mut self) -> Result<MosaicConfig> {
        let span = self.span.clone();
        async move {
            self.check_environment()?;

            let origin_provider = Arc::new(
                RetryPolicy::port_wait()
                    .retry(&format!("connect to {}", self.origin_websocket), || async {
                        Ok(Provider::<Ws>::connect(self.origin_websocket.as_str()).await?)
                    })
                    .await?,
            );
            let origin_chain_id = origin_provider.get_chainid().await?.as_u64();
            let origin = OriginChain::new(
                self.init.clone(),
                origin_provider.clone(),
                self.artifacts.clone(),
                self.chain_id,
            );
            let mut auxiliary = AuxiliaryChain::new(
                self.init.clone(),
                self.chain_id,
                self.directory.clone(),
                self.password_file.clone(),
                self.artifacts.clone(),
                self.keep_after_stop,
            );

            let accounts = auxiliary.generate_accounts().await?;
            self.advance(SagaState::AccountsGenerated);
            let generated = auxiliary.generate_chain().await?;
            self.advance(SagaState::ChainGenerated);
            auxiliary.start_sealer().await?;
            self.advance(SagaState::SealerRunning);

            let mut config = MosaicConfig::from_chain(&self.directory, &self.init.origin_chain)?;
            set_once(
                "originChain.simpleTokenAddress",
                &mut config.origin_chain.contract_addresses.simple_token_address,
                self.init.origin_ost_address,
            )?;
            {
                let entry = config.aux_chain_entry(self.chain_id);
                entry.sealer = Some(accounts.sealer);
                entry.deployer = Some(accounts.deployer);
                entry.boot_nodes = vec![generated.boot_node.clone()];
                entry.genesis = Some(generated.genesis.clone());
            }

            let aux_genesis = auxiliary
                .provider()?
                .get_block(0)
                .await?
                .ok_or_else(|| anyhow!("auxiliary chain {} has no genesis block", self.chain_id))?;
            let expected_co_gateway = expected_ost_co_gateway_address(accounts.deployer)?;
            let origin_addresses = origin
                .deploy_contracts(aux_genesis.state_root, expected_co_gateway)
                .await?;
            config = origin_addresses.record(config, self.chain_id)?;
            config.write_to_mosaic_config_directory(&self.directory)?;
            self.advance(SagaState::OriginContractsDeployed);

            let secret = H256(rand::random());
            let beneficiary = accounts.deployer;
            let stake = origin
                .stake(origin_addresses.gateway, beneficiary, secret)
                .await?;
            self.advance(SagaState::OriginStaked);

            let aux_addresses = auxiliary
                .deploy_contracts(
                    origin_chain_id,
                    stake.block_number,
                    stake.state_root,
                    &origin_addresses,
                )
                .await?;
            config = aux_addresses.record(config, self.chain_id)?;
            config.write_to_mosaic_config_directory(&self.directory)?;
            self.advance(SagaState::AuxContractsDeployed);

            auxiliary
                .transfer_all_ost_into_ost_prime(aux_addresses.ost_prime)
                .await?;
            self.advance(SagaState::PrimeFunded);

            let balance_before = auxiliary.balance(beneficiary).await?;
            let proof = Proof::fetch(
                &origin_provider,
                origin_addresses.gateway,
                stake.message_hash,
                stake.block_number,
            )
            .await?;
            auxiliary
                .prove_stake(
                    aux_addresses.co_gateway,
                    self.init.origin_tx_options.from,
                    beneficiary,
                    &stake,
                    hash_lock(secret),
                    &proof,
                )
                .await?;
            self.advance(SagaState::StakeProven);

            tokio::try_join!(
                origin.progress_with_secret(
                    origin_addresses.gateway,
                    stake.message_hash,
                    secret
                ),
                auxiliary.progress_with_secret(
                    aux_addresses.co_gateway,
                    stake.message_hash,
                    secret
                ),
            )?;
            self.advance(SagaState::Progressed);

            let balance_after = auxiliary.balance(beneficiary).await?;
            check_minted(balance_before, balance_after, self.init.origin_stake_amount)?;

            let path = config.write_to_mosaic_config_directory(&self.directory)?;
            self.advance(SagaState::ConfigWritten);

            if !self.keep_after_stop {
                auxiliary.stop().await?;
            }
            println!(
                "{} auxiliary chain {} on {}: co-gateway {}, config {}",
                "Created".green(),
                self.chain_id.to_string().bold(),
                self.init.origin_chain.bold(),
                checksummed(&aux_addresses.co_gateway),
                path.display()
            );
            Ok(config)
        }
        .instrument(span)
        .await
    }
}

/// The beneficiary is also the facilitator on a chain with zero gas price, so its
/// balance grows by exactly the staked amount: the minted tokens plus the reward.
fn check_minted(before: U256, after: U256, staked: U256) -> Result<(), MosaicError> {
    let grown = after.saturating_sub(before);
    if grown != staked {
        return Err(MosaicError::mismatch(
            "beneficiary balance increase",
            staked,
            grown,
        ));
    }
    Ok(())
}
