use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow, bail};
use ethabi::Token;
use ethers::{
    providers::{Provider, Ws},
    types::{Address, H256, U256},
};
use fs_extra::dir::CopyOptions;
use k256::ecdsa::SigningKey;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tera::Tera;
use tracing::{Instrument, Span, debug, info, info_span};

use crate::{
    address::{checksummed, parse_address},
    commands::CommandBuilder,
    config::{Directory, InitConfig, MosaicConfig, set_once},
    contracts::{Artifacts, ContractKind},
    deployer::Deployer,
    error::MosaicError,
    node::{
        ChainNode, GETH_IMAGE, NodeDescription, NodePorts, SEALER_TARGET_GAS_LIMIT,
        docker_user_args,
    },
    origin::{OriginAddresses, StakeResult, deploy_organization},
    plan::{AUXILIARY_PLAN, Deployed, Role},
    proof::Proof,
    retry::RetryPolicy,
    utils,
};

const GENESIS_TEMPLATE: &str = include_str!("../resources/genesis-clique.tera.json");
const GENESIS_FILE: &str = "genesis.json";
const BOOT_NODES_FILE: &str = "bootnodes";
const BLOCK_PERIOD_SECONDS: u64 = 3;

/// Base token supply minted to the deployer in genesis and moved into OST prime.
pub fn ost_total_supply() -> U256 {
    U256::from(800_000_000u64) * U256::exp10(18)
}

/// Contracts deployed on an auxiliary chain for its gateway pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuxiliaryAddresses {
    pub anchor_organization: Address,
    pub anchor: Address,
    pub co_gateway_and_ost_prime_organization: Address,
    pub ost_prime: Address,
    pub merkle_patricia_proof: Address,
    pub message_bus: Address,
    pub gateway_lib: Address,
    pub co_gateway: Address,
}

impl AuxiliaryAddresses {
    pub fn record(&self, mut config: MosaicConfig, chain_id: u64) -> Result<MosaicConfig> {
        let aux = &mut config.aux_chain_entry(chain_id).contract_addresses.auxiliary;
        set_once(
            "auxiliary.anchorOrganizationAddress",
            &mut aux.anchor_organization_address,
            self.anchor_organization,
        )?;
        set_once("auxiliary.anchorAddress", &mut aux.anchor_address, self.anchor)?;
        set_once(
            "auxiliary.coGatewayAndOstPrimeOrganizationAddress",
            &mut aux.co_gateway_and_ost_prime_organization_address,
            self.co_gateway_and_ost_prime_organization,
        )?;
        set_once(
            "auxiliary.ostPrimeAddress",
            &mut aux.ost_prime_address,
            self.ost_prime,
        )?;
        set_once(
            "auxiliary.merklePatriciaLibAddress",
            &mut aux.merkle_patricia_lib_address,
            self.merkle_patricia_proof,
        )?;
        set_once(
            "auxiliary.messageBusAddress",
            &mut aux.message_bus_address,
            self.message_bus,
        )?;
        set_once(
            "auxiliary.gatewayLibAddress",
            &mut aux.gateway_lib_address,
            self.gateway_lib,
        )?;
        set_once(
            "auxiliary.eip20CoGatewayAddress",
            &mut aux.eip20_co_gateway_address,
            self.co_gateway,
        )?;
        Ok(config)
    }
}

/// The two accounts every new auxiliary chain starts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainAccounts {
    pub sealer: Address,
    pub deployer: Address,
}

/// Genesis and boot node of a freshly generated chain.
#[derive(Clone, Debug)]
pub struct GeneratedChain {
    pub genesis: Value,
    pub boot_node: String,
}

/// Where the co-gateway lands when a fresh `deployer` runs the auxiliary plan.
pub fn expected_ost_co_gateway_address(deployer: Address) -> Result<Address> {
    AUXILIARY_PLAN.expected_address(deployer, 0, Role::Eip20CoGateway)
}

pub struct AuxiliaryChain {
    init: InitConfig,
    chain_id: u64,
    directory: Directory,
    password_file: PathBuf,
    artifacts: Arc<Artifacts>,
    keep_after_stop: bool,
    accounts: Option<ChainAccounts>,
    node: Option<ChainNode>,
    deployer: Option<Deployer>,
    span: Span,
}

impl AuxiliaryChain {
    pub fn new(
        init: InitConfig,
        chain_id: u64,
        directory: Directory,
        password_file: PathBuf,
        artifacts: Arc<Artifacts>,
        keep_after_stop: bool,
    ) -> Self {
        let span = info_span!("auxiliary", chain = %init.origin_chain, chain_id);
        Self {
            init,
            chain_id,
            directory,
            password_file,
            artifacts,
            keep_after_stop,
            accounts: None,
            node: None,
            deployer: None,
            span,
        }
    }

    pub fn chain_dir(&self) -> PathBuf {
        self.directory
            .aux_chain_dir(&self.init.origin_chain, &self.chain_id.to_string())
    }

    pub fn accounts(&self) -> Result<ChainAccounts> {
        self.accounts
            .ok_or_else(|| anyhow!("auxiliary accounts have not been generated"))
    }

    fn deployer(&self) -> Result<&Deployer> {
        self.deployer
            .as_ref()
            .ok_or_else(|| anyhow!("the sealer of chain {} is not running", self.chain_id))
    }

    pub fn provider(&self) -> Result<&Arc<Provider<Ws>>> {
        Ok(self.deployer()?.provider())
    }

    /// Create the sealer and deployer keystores. A keystore that already exists means
    /// the deployer's nonces cannot be relied on.
    pub async fn generate_accounts(&mut self) -> Result<ChainAccounts> {
        let span = self.span.clone();
        async {
            let keystore = self.chain_dir().join("keystore");
            if keystore.exists() {
                return Err(MosaicError::EnvironmentNotClean(format!(
                    "keystore {} already exists",
                    keystore.display()
                ))
                .into());
            }
            let sealer = self.new_account().await?;
            let deployer = self.new_account().await?;
            info!(
                sealer = %checksummed(&sealer),
                deployer = %checksummed(&deployer),
                "accounts generated"
            );
            let accounts = ChainAccounts { sealer, deployer };
            self.accounts = Some(accounts);
            Ok(accounts)
        }
        .instrument(span)
        .await
    }

    async fn new_account(&self) -> Result<Address> {
        let chain_dir = self.chain_dir();
        tokio::fs::create_dir_all(&chain_dir).await?;
        let data_volume = format!("{}:/chain_data", utils::string_from_path(&chain_dir)?);
        let password_volume = format!(
            "{}:/password.txt",
            utils::string_from_path(&self.password_file)?
        );
        let output = CommandBuilder::new()
            .silent()
            .cmd("docker", &["run", "--rm"])
            .more_args(&docker_user_args(&chain_dir)?)
            .more_args(&[
                "-v",
                data_volume.as_str(),
                "-v",
                password_volume.as_str(),
                GETH_IMAGE,
                "account",
                "new",
                "--datadir",
                "/chain_data",
                "--password",
                "/password.txt",
            ])
            .run_for_output()
            .await?;
        parse_account_address(&output.sanitise_stdout())
    }

    /// Write the clique genesis and boot key, initialise the chain database and copy
    /// the result into the project directory.
    pub async fn generate_chain(&mut self) -> Result<GeneratedChain> {
        let span = self.span.clone();
        async {
            let accounts = self.accounts()?;
            let chain_dir = self.chain_dir();
            let genesis = render_genesis(self.chain_id, &accounts)?;
            tokio::fs::create_dir_all(&chain_dir).await?;
            tokio::fs::write(
                chain_dir.join(GENESIS_FILE),
                serde_json::to_string_pretty(&genesis)?,
            )
            .await?;

            // geth picks up <datadir>/geth/nodekey, so the sealer is the boot node.
            let (node_key, node_id) = generate_node_key();
            tokio::fs::create_dir_all(chain_dir.join("geth")).await?;
            tokio::fs::write(chain_dir.join("geth").join("nodekey"), &node_key).await?;

            let data_volume = format!("{}:/chain_data", utils::string_from_path(&chain_dir)?);
            CommandBuilder::new()
                .silent()
                .cmd("docker", &["run", "--rm"])
                .more_args(&docker_user_args(&chain_dir)?)
                .more_args(&[
                    "-v",
                    data_volume.as_str(),
                    GETH_IMAGE,
                    "--datadir",
                    "/chain_data",
                    "init",
                    "/chain_data/genesis.json",
                ])
                .run_for_output()
                .await?;

            let port = NodePorts::for_chain(&self.chain_id.to_string())?.port;
            let boot_node = format!("enode://{node_id}@127.0.0.1:{port}");

            self.copy_to_project(&chain_dir, &boot_node)?;
            info!(%boot_node, "chain generated");
            Ok(GeneratedChain { genesis, boot_node })
        }
        .instrument(span)
        .await
    }

    fn copy_to_project(&self, chain_dir: &Path, boot_node: &str) -> Result<()> {
        let target = self
            .directory
            .project_chain_dir(&self.init.origin_chain, &self.chain_id.to_string());
        std::fs::create_dir_all(&target)
            .with_context(|| format!("Cannot create {}", target.display()))?;
        std::fs::copy(chain_dir.join(GENESIS_FILE), target.join(GENESIS_FILE))?;
        std::fs::write(target.join(BOOT_NODES_FILE), format!("{boot_node}\n"))?;
        let options = CopyOptions::new().overwrite(true);
        fs_extra::dir::copy(chain_dir.join("geth"), &target, &options)
            .with_context(|| format!("Cannot copy chain state to {}", target.display()))?;
        // Every node started from the project gets its own key.
        let node_key = target.join("geth").join("nodekey");
        if node_key.exists() {
            std::fs::remove_file(node_key)?;
        }
        Ok(())
    }

    /// Start the sealer with both accounts unlocked and wait until the node reports
    /// them unlocked.
    pub async fn start_sealer(&mut self) -> Result<()> {
        let span = self.span.clone();
        async {
            let accounts = self.accounts()?;
            let mut description =
                NodeDescription::new(&self.chain_id.to_string(), self.directory.clone())?;
            description.origin_chain = Some(self.init.origin_chain.clone());
            description.keep_after_stop = self.keep_after_stop;
            description.unlock = Some(format!(
                "{},{}",
                checksummed(&accounts.sealer),
                checksummed(&accounts.deployer)
            ));
            description.password = Some(self.password_file.clone());
            description.sealer = Some(accounts.sealer);
            let node = ChainNode::new(description);
            node.start().await?;

            let provider = Arc::new(node.connect(RetryPolicy::port_wait()).await?);
            wait_for_unlock(
                &provider,
                &[accounts.sealer, accounts.deployer],
                RetryPolicy::account_unlock(),
            )
            .await?;
            info!("sealer running, accounts unlocked");

            self.deployer = Some(Deployer::new(
                provider,
                self.artifacts.clone(),
                accounts.deployer,
                U256::zero(),
            ));
            self.node = Some(node);
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Deploy the auxiliary half of the gateway pair, anchored at the origin block
    /// that carries the stake.
    pub async fn deploy_contracts(
        &self,
        origin_chain_id: u64,
        origin_block: u64,
        origin_state_root: H256,
        origin: &OriginAddresses,
    ) -> Result<AuxiliaryAddresses> {
        async {
            let init = &self.init;
            let d = self.deployer()?;
            let expected_co_gateway = expected_ost_co_gateway_address(d.from())?;
            let mut deployed = Deployed::default();
            for (nonce, role) in AUXILIARY_PLAN.steps() {
                d.ensure_nonce(nonce).await?;
                debug!(%role, nonce, "plan step");
                let address = match role {
                    Role::AnchorOrganization => Some(
                        deploy_organization(
                            d,
                            init.auxiliary_anchor_organization_owner,
                            init.auxiliary_anchor_organization_admin,
                        )
                        .await?,
                    ),
                    Role::Anchor => Some(
                        d.deploy(
                            ContractKind::Anchor,
                            &[
                                Token::Uint(origin_chain_id.into()),
                                Token::Uint(origin_block.into()),
                                Token::FixedBytes(origin_state_root.as_bytes().to_vec()),
                                Token::Uint(init.auxiliary_max_state_roots.into()),
                                Token::Address(deployed.get(Role::AnchorOrganization)?),
                            ],
                            &[],
                        )
                        .await?,
                    ),
                    Role::CoGatewayAndOstPrimeOrganization => Some(
                        deploy_organization(
                            d,
                            init.auxiliary_co_gateway_and_ost_prime_organization_owner,
                            d.from(),
                        )
                        .await?,
                    ),
                    Role::OstPrime => Some(
                        d.deploy(
                            ContractKind::OstPrime,
                            &[
                                Token::Address(init.origin_ost_address),
                                Token::Address(
                                    deployed.get(Role::CoGatewayAndOstPrimeOrganization)?,
                                ),
                            ],
                            &[],
                        )
                        .await?,
                    ),
                    Role::MerklePatriciaProof => {
                        Some(d.deploy(ContractKind::MerklePatriciaProof, &[], &[]).await?)
                    }
                    Role::MessageBus | Role::GatewayLib => Some(
                        d.deploy(
                            role.contract(),
                            &[],
                            &[(
                                ContractKind::MerklePatriciaProof,
                                deployed.get(Role::MerklePatriciaProof)?,
                            )],
                        )
                        .await?,
                    ),
                    Role::Eip20CoGateway => {
                        let co_gateway = d
                            .deploy(
                                ContractKind::Eip20CoGateway,
                                &[
                                    Token::Address(init.origin_ost_address),
                                    Token::Address(deployed.get(Role::OstPrime)?),
                                    Token::Address(deployed.get(Role::Anchor)?),
                                    Token::Uint(init.auxiliary_bounty),
                                    Token::Address(
                                        deployed.get(Role::CoGatewayAndOstPrimeOrganization)?,
                                    ),
                                    Token::Address(origin.gateway),
                                    Token::Address(init.auxiliary_burner),
                                ],
                                &[
                                    (ContractKind::MessageBus, deployed.get(Role::MessageBus)?),
                                    (ContractKind::GatewayLib, deployed.get(Role::GatewayLib)?),
                                ],
                            )
                            .await?;
                        if co_gateway != expected_co_gateway {
                            bail!(
                                "co-gateway deployed at {}, but origin was activated with {}",
                                checksummed(&co_gateway),
                                checksummed(&expected_co_gateway)
                            );
                        }
                        Some(co_gateway)
                    }
                    Role::SetCoGateway => {
                        d.call(
                            ContractKind::OstPrime,
                            deployed.get(Role::OstPrime)?,
                            "setCoGateway",
                            &[Token::Address(deployed.get(Role::Eip20CoGateway)?)],
                        )
                        .await?;
                        None
                    }
                    other => bail!("{other} is not an auxiliary deployment step"),
                };
                if let Some(address) = address {
                    deployed.record(role, address);
                }
            }

            Ok(AuxiliaryAddresses {
                anchor_organization: deployed.get(Role::AnchorOrganization)?,
                anchor: deployed.get(Role::Anchor)?,
                co_gateway_and_ost_prime_organization: deployed
                    .get(Role::CoGatewayAndOstPrimeOrganization)?,
                ost_prime: deployed.get(Role::OstPrime)?,
                merkle_patricia_proof: deployed.get(Role::MerklePatriciaProof)?,
                message_bus: deployed.get(Role::MessageBus)?,
                gateway_lib: deployed.get(Role::GatewayLib)?,
                co_gateway: deployed.get(Role::Eip20CoGateway)?,
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Move the whole base token supply into OST prime, which backs minted OST.
    pub async fn transfer_all_ost_into_ost_prime(&self, ost_prime: Address) -> Result<()> {
        async {
            self.deployer()?
                .call_with_value(
                    ContractKind::OstPrime,
                    ost_prime,
                    "initialize",
                    &[],
                    ost_total_supply(),
                )
                .await?;
            info!(ost_prime = %checksummed(&ost_prime), "OST prime funded");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Prove the origin gateway's storage at the anchored block, then confirm the
    /// stake intent against it. Only the hash of the secret is revealed here.
    pub async fn prove_stake(
        &self,
        co_gateway: Address,
        staker: Address,
        beneficiary: Address,
        stake: &StakeResult,
        hash_lock: H256,
        proof: &Proof,
    ) -> Result<()> {
        async {
            let init = &self.init;
            let d = self.deployer()?;
            d.call(
                ContractKind::Eip20CoGateway,
                co_gateway,
                "proveGateway",
                &[
                    Token::Uint(proof.block_number.into()),
                    Token::Bytes(proof.account_data.to_vec()),
                    Token::Bytes(proof.account_proof.to_vec()),
                ],
            )
            .await?;
            d.call(
                ContractKind::Eip20CoGateway,
                co_gateway,
                "confirmStakeIntent",
                &[
                    Token::Address(staker),
                    Token::Uint(stake.nonce),
                    Token::Address(beneficiary),
                    Token::Uint(init.origin_stake_amount),
                    Token::Uint(init.origin_stake_gas_price),
                    Token::Uint(init.origin_stake_gas_limit),
                    Token::FixedBytes(hash_lock.as_bytes().to_vec()),
                    Token::Uint(proof.block_number.into()),
                    Token::Bytes(proof.storage_proof()?.serialized_proof.to_vec()),
                ],
            )
            .await?;
            info!(message_hash = ?stake.message_hash, "stake intent confirmed");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn progress_with_secret(
        &self,
        co_gateway: Address,
        message_hash: H256,
        secret: H256,
    ) -> Result<()> {
        async {
            self.deployer()?
                .call(
                    ContractKind::Eip20CoGateway,
                    co_gateway,
                    "progressMint",
                    &[
                        Token::FixedBytes(message_hash.as_bytes().to_vec()),
                        Token::FixedBytes(secret.as_bytes().to_vec()),
                    ],
                )
                .await?;
            info!(?message_hash, "mint progressed");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn balance(&self, of: Address) -> Result<U256> {
        self.deployer()?.balance(of).await
    }

    pub async fn stop(&self) -> Result<()> {
        match &self.node {
            Some(node) => node.stop().await,
            None => Ok(()),
        }
    }
}

/// The address printed by `geth account new`.
pub fn parse_account_address(stdout: &str) -> Result<Address> {
    let re = Regex::new(
        r"(?:Public address of the key:\s*|Address:\s*\{)(?:0x)?([0-9a-fA-F]{40})",
    )?;
    let captures = re
        .captures(stdout)
        .ok_or_else(|| anyhow!("no address in geth output: {stdout}"))?;
    Ok(parse_address(&format!("0x{}", &captures[1]))?)
}

#[derive(Serialize)]
struct GenesisContext {
    chain_id: u64,
    block_period: u64,
    extra_data: String,
    gas_limit: String,
    deployer: String,
    deployer_balance: String,
}

/// Clique genesis sealed by `accounts.sealer` with the whole base token supply on
/// `accounts.deployer`.
pub fn render_genesis(chain_id: u64, accounts: &ChainAccounts) -> Result<Value> {
    // 32 vanity bytes, the signer list, 65 bytes for the seal.
    let extra_data = format!(
        "0x{}{}{}",
        "00".repeat(32),
        hex::encode(accounts.sealer.as_bytes()),
        "00".repeat(65)
    );
    let context = GenesisContext {
        chain_id,
        block_period: BLOCK_PERIOD_SECONDS,
        extra_data,
        gas_limit: format!("{SEALER_TARGET_GAS_LIMIT:#x}"),
        deployer: checksummed(&accounts.deployer),
        deployer_balance: ost_total_supply().to_string(),
    };
    let mut tera = Tera::default();
    tera.add_raw_template(GENESIS_FILE, GENESIS_TEMPLATE)?;
    let rendered = tera
        .render(GENESIS_FILE, &tera::Context::from_serialize(&context)?)
        .context("Whilst rendering genesis.json")?;
    Ok(serde_json::from_str(&rendered)?)
}

/// A fresh secp256k1 node key as geth stores it, and the node id it yields.
pub fn generate_node_key() -> (String, String) {
    let key = SigningKey::random(&mut rand::rngs::OsRng);
    let public = key.verifying_key().to_encoded_point(false);
    (
        hex::encode(key.to_bytes()),
        hex::encode(&public.as_bytes()[1..]),
    )
}

#[derive(Debug, Serialize, Deserialize)]
struct Wallet {
    status: String,
    #[serde(default)]
    accounts: Vec<WalletAccount>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WalletAccount {
    address: Address,
}

fn all_unlocked(wallets: &[Wallet], accounts: &[Address]) -> bool {
    accounts.iter().all(|account| {
        wallets.iter().any(|w| {
            w.status.eq_ignore_ascii_case("unlocked")
                && w.accounts.iter().any(|a| a.address == *account)
        })
    })
}

/// Poll `personal_listWallets` until every account in `accounts` is unlocked.
pub async fn wait_for_unlock(
    provider: &Provider<Ws>,
    accounts: &[Address],
    policy: RetryPolicy,
) -> Result<()> {
    let unlocked = policy
        .poll("account unlock", || async {
            let wallets: Vec<Wallet> = provider.request("personal_listWallets", ()).await?;
            Ok(all_unlocked(&wallets, accounts))
        })
        .await?;
    if !unlocked {
        return Err(MosaicError::AccountUnlockTimeout {
            accounts: accounts.to_vec(),
            attempts: policy.max_attempts,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> ChainAccounts {
        ChainAccounts {
            sealer: Address::repeat_byte(0x11),
            deployer: Address::repeat_byte(0x22),
        }
    }

    #[test]
    fn account_new_output() {
        let geth_19 = "Your new key was generated\n\n\
            Public address of the key:   0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\n\
            Path of the secret key file: /chain_data/keystore/UTC--...\n";
        assert_eq!(
            parse_account_address(geth_19).unwrap(),
            parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap()
        );
        let geth_18 = "Address: {5aaeb6053f3e94c9b9a09f33669435e7ef1beaed}";
        assert_eq!(
            parse_account_address(geth_18).unwrap(),
            parse_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap()
        );
        assert!(parse_account_address("Fatal: could not decrypt").is_err());
    }

    #[test]
    fn genesis() {
        let genesis = render_genesis(1405, &accounts()).unwrap();
        assert_eq!(genesis["config"]["chainId"], 1405);
        assert_eq!(genesis["config"]["clique"]["period"], 3);
        assert_eq!(genesis["gasLimit"], "0x59a5380");
        let extra = genesis["extraData"].as_str().unwrap();
        assert_eq!(extra.len(), 2 + 64 + 40 + 130);
        assert!(extra.contains(&"11".repeat(20)));
        let deployer = checksummed(&accounts().deployer);
        assert_eq!(
            genesis["alloc"][deployer.as_str()]["balance"],
            "800000000000000000000000000"
        );
    }

    #[test]
    fn node_keys() {
        let (secret, id) = generate_node_key();
        assert_eq!(secret.len(), 64);
        assert_eq!(id.len(), 128);
        assert_ne!(generate_node_key().0, secret);
    }

    #[test]
    fn unlock_check() {
        let wallets: Vec<Wallet> = serde_json::from_str(
            r#"[
                {"url": "keystore:///a", "status": "Unlocked",
                 "accounts": [{"address": "0x1111111111111111111111111111111111111111", "url": "keystore:///a"}]},
                {"url": "keystore:///b", "status": "Locked",
                 "accounts": [{"address": "0x2222222222222222222222222222222222222222", "url": "keystore:///b"}]}
            ]"#,
        )
        .unwrap();
        let a = accounts();
        assert!(all_unlocked(&wallets, &[a.sealer]));
        assert!(!all_unlocked(&wallets, &[a.sealer, a.deployer]));
    }

    #[test]
    fn co_gateway_address_follows_plan() {
        let deployer = accounts().deployer;
        assert_eq!(
            expected_ost_co_gateway_address(deployer).unwrap(),
            crate::address::contract_address(deployer, 7)
        );
    }

    #[test]
    fn record_into_config() {
        let addresses = AuxiliaryAddresses {
            anchor_organization: Address::repeat_byte(1),
            anchor: Address::repeat_byte(2),
            co_gateway_and_ost_prime_organization: Address::repeat_byte(3),
            ost_prime: Address::repeat_byte(4),
            merkle_patricia_proof: Address::repeat_byte(5),
            message_bus: Address::repeat_byte(6),
            gateway_lib: Address::repeat_byte(7),
            co_gateway: Address::repeat_byte(8),
        };
        let config = addresses.record(MosaicConfig::new("dev-origin"), 500).unwrap();
        let aux = &config.aux_chain("500").unwrap().contract_addresses.auxiliary;
        assert_eq!(aux.eip20_co_gateway_address, Some(Address::repeat_byte(8)));
        assert_eq!(aux.redeem_pool_address, None);
    }
}
