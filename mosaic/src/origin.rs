use std::{pin::pin, sync::Arc};

use anyhow::{Result, anyhow, bail};
use ethabi::Token;
use ethers::{
    providers::{Middleware, Provider, Ws},
    types::{Address, Block, H256, U256},
    utils::keccak256,
};
use futures::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use tracing::{Instrument, Span, debug, info, info_span};

use crate::{
    address::checksummed,
    config::{InitConfig, MosaicConfig, set_once},
    contracts::{Artifacts, ContractKind},
    deployer::{Deployer, as_uint, single, token_named},
    plan::{Deployed, ORIGIN_PLAN, Role},
};

/// Contracts deployed on origin for one auxiliary chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginAddresses {
    pub anchor_organization: Address,
    pub anchor: Address,
    pub merkle_patricia_proof: Address,
    pub message_bus: Address,
    pub gateway_lib: Address,
    pub gateway_organization: Address,
    pub gateway: Address,
}

impl OriginAddresses {
    /// Record the addresses in the origin section of `aux_chain_id`, refusing to
    /// replace anything recorded earlier.
    pub fn record(&self, mut config: MosaicConfig, aux_chain_id: u64) -> Result<MosaicConfig> {
        let origin = &mut config.aux_chain_entry(aux_chain_id).contract_addresses.origin;
        set_once(
            "origin.anchorOrganizationAddress",
            &mut origin.anchor_organization_address,
            self.anchor_organization,
        )?;
        set_once("origin.anchorAddress", &mut origin.anchor_address, self.anchor)?;
        set_once(
            "origin.merklePatriciaLibAddress",
            &mut origin.merkle_patricia_lib_address,
            self.merkle_patricia_proof,
        )?;
        set_once(
            "origin.messageBusAddress",
            &mut origin.message_bus_address,
            self.message_bus,
        )?;
        set_once(
            "origin.gatewayLibAddress",
            &mut origin.gateway_lib_address,
            self.gateway_lib,
        )?;
        set_once(
            "origin.gatewayOrganizationAddress",
            &mut origin.gateway_organization_address,
            self.gateway_organization,
        )?;
        set_once(
            "origin.eip20GatewayAddress",
            &mut origin.eip20_gateway_address,
            self.gateway,
        )?;
        Ok(config)
    }
}

/// Outcome of a stake on origin, pinned to the block whose state root gets proven.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeResult {
    pub block_number: u64,
    pub state_root: H256,
    pub message_hash: H256,
    pub nonce: U256,
}

pub struct OriginChain {
    init: InitConfig,
    deployer: Deployer,
    aux_chain_id: u64,
    span: Span,
}

impl OriginChain {
    pub fn new(
        init: InitConfig,
        provider: Arc<Provider<Ws>>,
        artifacts: Arc<Artifacts>,
        aux_chain_id: u64,
    ) -> Self {
        let span = info_span!("origin", chain = %init.origin_chain, chain_id = aux_chain_id);
        let deployer = Deployer::new(
            provider,
            artifacts,
            init.origin_tx_options.from,
            init.origin_tx_options.gas_price,
        );
        Self {
            init,
            deployer,
            aux_chain_id,
            span,
        }
    }

    pub fn provider(&self) -> &Arc<Provider<Ws>> {
        self.deployer.provider()
    }

    /// Deploy the origin half of the gateway pair and activate the gateway towards the
    /// co-gateway that will exist at `expected_co_gateway` once the auxiliary side runs.
    pub async fn deploy_contracts(
        &self,
        aux_state_root_zero: H256,
        expected_co_gateway: Address,
    ) -> Result<OriginAddresses> {
        async {
            let init = &self.init;
            let d = &self.deployer;
            let first_nonce = d.nonce().await?;
            let mut deployed = Deployed::default();
            for (offset, role) in ORIGIN_PLAN.steps() {
                d.ensure_nonce(first_nonce + offset).await?;
                debug!(%role, nonce = first_nonce + offset, "plan step");
                let address = match role {
                    Role::AnchorOrganization => Some(
                        deploy_organization(
                            d,
                            init.origin_anchor_organization_owner,
                            init.origin_anchor_organization_admin,
                        )
                        .await?,
                    ),
                    Role::Anchor => Some(
                        d.deploy(
                            ContractKind::Anchor,
                            &[
                                Token::Uint(self.aux_chain_id.into()),
                                Token::Uint(U256::zero()),
                                Token::FixedBytes(aux_state_root_zero.as_bytes().to_vec()),
                                Token::Uint(init.origin_max_state_roots.into()),
                                Token::Address(deployed.get(Role::AnchorOrganization)?),
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
                    // The deployer administers the gateway organization so it can
                    // activate the gateway below.
                    Role::GatewayOrganization => Some(
                        deploy_organization(d, init.origin_gateway_organization_owner, d.from())
                            .await?,
                    ),
                    Role::Eip20Gateway => Some(
                        d.deploy(
                            ContractKind::Eip20Gateway,
                            &[
                                Token::Address(init.origin_ost_address),
                                Token::Address(init.origin_ost_address),
                                Token::Address(deployed.get(Role::Anchor)?),
                                Token::Uint(init.origin_bounty),
                                Token::Address(deployed.get(Role::GatewayOrganization)?),
                                Token::Address(init.origin_burner),
                            ],
                            &[
                                (ContractKind::MessageBus, deployed.get(Role::MessageBus)?),
                                (ContractKind::GatewayLib, deployed.get(Role::GatewayLib)?),
                            ],
                        )
                        .await?,
                    ),
                    Role::ActivateGateway => {
                        d.call(
                            ContractKind::Eip20Gateway,
                            deployed.get(Role::Eip20Gateway)?,
                            "activateGateway",
                            &[Token::Address(expected_co_gateway)],
                        )
                        .await?;
                        None
                    }
                    other => bail!("{other} is not an origin deployment step"),
                };
                if let Some(address) = address {
                    deployed.record(role, address);
                }
            }

            let addresses = OriginAddresses {
                anchor_organization: deployed.get(Role::AnchorOrganization)?,
                anchor: deployed.get(Role::Anchor)?,
                merkle_patricia_proof: deployed.get(Role::MerklePatriciaProof)?,
                message_bus: deployed.get(Role::MessageBus)?,
                gateway_lib: deployed.get(Role::GatewayLib)?,
                gateway_organization: deployed.get(Role::GatewayOrganization)?,
                gateway: deployed.get(Role::Eip20Gateway)?,
            };
            info!(
                gateway = %checksummed(&addresses.gateway),
                co_gateway = %checksummed(&expected_co_gateway),
                "origin contracts deployed, gateway activated"
            );
            Ok(addresses)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Stake `origin_stake_amount` OST towards `beneficiary` on the auxiliary chain,
    /// locked by keccak256(`secret`). Returns once `origin_stake_blocks_to_wait` more
    /// blocks have been seen.
    pub async fn stake(
        &self,
        gateway: Address,
        beneficiary: Address,
        secret: H256,
    ) -> Result<StakeResult> {
        async {
            let init = &self.init;
            let d = &self.deployer;
            let lock = hash_lock(secret);
            let staker = d.from();

            d.call(
                ContractKind::Eip20Token,
                init.origin_ost_address,
                "approve",
                &[Token::Address(gateway), Token::Uint(init.stake_allowance())],
            )
            .await?;

            let nonce = as_uint(&single(
                d.view(
                    ContractKind::Eip20Gateway,
                    gateway,
                    "getNonce",
                    &[Token::Address(staker)],
                )
                .await?,
            )?)?;

            let receipt = d
                .call(
                    ContractKind::Eip20Gateway,
                    gateway,
                    "stake",
                    &[
                        Token::Uint(init.origin_stake_amount),
                        Token::Address(beneficiary),
                        Token::Uint(init.origin_stake_gas_price),
                        Token::Uint(init.origin_stake_gas_limit),
                        Token::Uint(nonce),
                        Token::FixedBytes(lock.as_bytes().to_vec()),
                    ],
                )
                .await?;
            let log = d.decode_event(ContractKind::Eip20Gateway, "StakeIntentDeclared", &receipt)?;
            let message_hash = fixed_bytes_32(token_named(&log, "_messageHash")?)?;
            info!(?message_hash, %nonce, "stake intent declared");

            let headers = d.provider().subscribe_blocks().await?;
            let block_number = wait_for_blocks(headers, init.origin_stake_blocks_to_wait).await?;
            let block = d
                .provider()
                .get_block(block_number)
                .await?
                .ok_or_else(|| anyhow!("origin block {block_number} not found"))?;
            info!(block_number, state_root = ?block.state_root, "origin state root");
            Ok(StakeResult {
                block_number,
                state_root: block.state_root,
                message_hash,
                nonce,
            })
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn progress_with_secret(
        &self,
        gateway: Address,
        message_hash: H256,
        secret: H256,
    ) -> Result<()> {
        async {
            self.deployer
                .call(
                    ContractKind::Eip20Gateway,
                    gateway,
                    "progressStake",
                    &[
                        Token::FixedBytes(message_hash.as_bytes().to_vec()),
                        Token::FixedBytes(secret.as_bytes().to_vec()),
                    ],
                )
                .await?;
            info!(?message_hash, "stake progressed");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }
}

/// An organization with no workers and no expiry.
pub(crate) async fn deploy_organization(
    d: &Deployer,
    owner: Address,
    admin: Address,
) -> Result<Address> {
    d.deploy(
        ContractKind::Organization,
        &[
            Token::Address(owner),
            Token::Address(admin),
            Token::Array(vec![]),
            Token::Uint(U256::zero()),
        ],
        &[],
    )
    .await
}

/// keccak256 of the hash-lock secret.
pub fn hash_lock(secret: H256) -> H256 {
    H256(keccak256(secret))
}

pub(crate) fn fixed_bytes_32(token: &Token) -> Result<H256> {
    match token {
        Token::FixedBytes(bytes) if bytes.len() == 32 => Ok(H256::from_slice(bytes)),
        other => Err(anyhow!("expected bytes32, got {other:?}")),
    }
}

/// Wait for `count` block headers from `headers` and return the number of the last
/// one. The stream ending early is an error; nothing is retried. Dropping a
/// subscription stream unsubscribes it.
pub async fn wait_for_blocks(headers: impl Stream<Item = Block<H256>>, count: u64) -> Result<u64> {
    let style = ProgressStyle::with_template("{msg} {wide_bar} {pos}/{len} ({elapsed})")?;
    let progress = ProgressBar::new(count)
        .with_style(style)
        .with_message("waiting for origin blocks")
        .with_finish(ProgressFinish::AndLeave);

    let mut headers = pin!(headers);
    let mut seen = 0;
    let mut last = None;
    while seen < count {
        let Some(block) = headers.next().await else {
            bail!("block subscription ended after {seen} of {count} blocks");
        };
        seen += 1;
        last = block.number;
        progress.inc(1);
    }
    progress.finish();
    last.map(|n| n.as_u64())
        .ok_or_else(|| anyhow!("block header without a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses() -> OriginAddresses {
        OriginAddresses {
            anchor_organization: Address::repeat_byte(1),
            anchor: Address::repeat_byte(2),
            merkle_patricia_proof: Address::repeat_byte(3),
            message_bus: Address::repeat_byte(4),
            gateway_lib: Address::repeat_byte(5),
            gateway_organization: Address::repeat_byte(6),
            gateway: Address::repeat_byte(7),
        }
    }

    #[test]
    fn record_into_config() {
        let config = addresses().record(MosaicConfig::new("dev-origin"), 1000).unwrap();
        let origin = &config.aux_chain("1000").unwrap().contract_addresses.origin;
        assert_eq!(origin.eip20_gateway_address, Some(Address::repeat_byte(7)));
        assert_eq!(origin.merkle_patricia_lib_address, Some(Address::repeat_byte(3)));

        // Same addresses again is a no-op, different ones are refused.
        let config = addresses().record(config, 1000).unwrap();
        let mut other = addresses();
        other.gateway = Address::repeat_byte(8);
        assert!(other.record(config, 1000).is_err());
    }

    #[test]
    fn bytes32_tokens() {
        let hash = H256::repeat_byte(0x42);
        assert_eq!(
            fixed_bytes_32(&Token::FixedBytes(hash.as_bytes().to_vec())).unwrap(),
            hash
        );
        assert!(fixed_bytes_32(&Token::FixedBytes(vec![1; 31])).is_err());
        assert!(fixed_bytes_32(&Token::Uint(1.into())).is_err());
    }

    fn header(number: u64) -> Block<H256> {
        Block {
            number: Some(number.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn waits_for_exactly_count_headers() {
        let headers = futures::stream::iter((41..50).map(header));
        assert_eq!(wait_for_blocks(headers, 3).await.unwrap(), 43);

        let headers = futures::stream::iter([header(7)]);
        assert_eq!(wait_for_blocks(headers, 1).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn subscription_ending_early_is_an_error() {
        let headers = futures::stream::iter((41..43).map(header));
        let err = wait_for_blocks(headers, 3).await.unwrap_err();
        assert!(err.to_string().contains("after 2 of 3 blocks"), "{err}");

        let headers = futures::stream::iter([Block::<H256>::default()]);
        assert!(wait_for_blocks(headers, 1).await.is_err());
    }
}
