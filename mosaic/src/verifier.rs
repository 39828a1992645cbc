//! Read-only checks that the contracts recorded for a gateway pair are the ones on
//! chain and are wired to each other.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethabi::Token;
use ethers::{
    providers::{Middleware, Provider, Ws},
    types::{Address, TransactionRequest, transaction::eip2718::TypedTransaction},
};
use tracing::{debug, info};

use crate::{
    address::checksummed,
    config::{AuxiliaryContracts, MosaicConfig, OriginContracts, required},
    contracts::{Artifacts, ContractKind},
    deployer::{as_address, as_bool, single},
    error::MosaicError,
    plan::{AUXILIARY_PLAN, Role},
    utils::hex_prefixed,
};

/// The two chain reads verification needs.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_call` of `data` against `to` at the latest block.
    async fn read(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>>;
    async fn code_at(&self, at: Address) -> Result<Vec<u8>>;
}

#[async_trait]
impl ChainReader for Provider<Ws> {
    async fn read(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        Ok(Middleware::call(self, &tx, None).await?.to_vec())
    }

    async fn code_at(&self, at: Address) -> Result<Vec<u8>> {
        Ok(self.get_code(at, None).await?.to_vec())
    }
}

/// Addresses of one gateway pair, each one required to be recorded.
struct Recorded {
    origin_anchor: Address,
    origin_anchor_organization: Address,
    gateway: Address,
    gateway_organization: Address,
    aux_anchor: Address,
    aux_anchor_organization: Address,
    co_gateway: Address,
    co_gateway_organization: Address,
    ost_prime: Address,
}

impl Recorded {
    fn new(origin: &OriginContracts, aux: &AuxiliaryContracts) -> Result<Self> {
        Ok(Self {
            origin_anchor: required("origin.anchorAddress", origin.anchor_address)?,
            origin_anchor_organization: required(
                "origin.anchorOrganizationAddress",
                origin.anchor_organization_address,
            )?,
            gateway: required("origin.eip20GatewayAddress", origin.eip20_gateway_address)?,
            gateway_organization: required(
                "origin.gatewayOrganizationAddress",
                origin.gateway_organization_address,
            )?,
            aux_anchor: required("auxiliary.anchorAddress", aux.anchor_address)?,
            aux_anchor_organization: required(
                "auxiliary.anchorOrganizationAddress",
                aux.anchor_organization_address,
            )?,
            co_gateway: required("auxiliary.eip20CoGatewayAddress", aux.eip20_co_gateway_address)?,
            co_gateway_organization: required(
                "auxiliary.coGatewayAndOstPrimeOrganizationAddress",
                aux.co_gateway_and_ost_prime_organization_address,
            )?,
            ost_prime: required("auxiliary.ostPrimeAddress", aux.ost_prime_address)?,
        })
    }
}

/// Where a contract-creating step of the auxiliary plan is recorded.
fn recorded_for(role: Role, aux: &AuxiliaryContracts) -> Option<(&'static str, Option<Address>)> {
    let slot = match role {
        Role::AnchorOrganization => (
            "auxiliary.anchorOrganizationAddress",
            aux.anchor_organization_address,
        ),
        Role::Anchor => ("auxiliary.anchorAddress", aux.anchor_address),
        Role::CoGatewayAndOstPrimeOrganization => (
            "auxiliary.coGatewayAndOstPrimeOrganizationAddress",
            aux.co_gateway_and_ost_prime_organization_address,
        ),
        Role::OstPrime => ("auxiliary.ostPrimeAddress", aux.ost_prime_address),
        Role::MerklePatriciaProof => (
            "auxiliary.merklePatriciaLibAddress",
            aux.merkle_patricia_lib_address,
        ),
        Role::MessageBus => ("auxiliary.messageBusAddress", aux.message_bus_address),
        Role::GatewayLib => ("auxiliary.gatewayLibAddress", aux.gateway_lib_address),
        Role::Eip20CoGateway => (
            "auxiliary.eip20CoGatewayAddress",
            aux.eip20_co_gateway_address,
        ),
        _ => return None,
    };
    Some(slot)
}

/// Gateway libraries are optional in the config; only the recorded ones are checked.
fn recorded_libraries(
    merkle_patricia_proof: Option<Address>,
    message_bus: Option<Address>,
    gateway_lib: Option<Address>,
) -> impl Iterator<Item = (ContractKind, Address)> {
    [
        (ContractKind::MerklePatriciaProof, merkle_patricia_proof),
        (ContractKind::MessageBus, message_bus),
        (ContractKind::GatewayLib, gateway_lib),
    ]
    .into_iter()
    .filter_map(|(kind, at)| Some((kind, at?)))
}

/// Does deployed `code` carry the artifact's runtime `prefix`? Library code starts
/// with `PUSH20 <own address>`, which is zero in the artifact.
fn code_matches(code: &[u8], prefix: &[u8], library: bool) -> bool {
    const PUSH20: u8 = 0x73;
    if library && prefix.len() >= 21 && prefix[0] == PUSH20 {
        return code.len() >= prefix.len()
            && code[0] == PUSH20
            && code[21..].starts_with(&prefix[21..]);
    }
    code.starts_with(prefix)
}

pub struct ChainVerifier<'a> {
    origin: &'a dyn ChainReader,
    auxiliary: &'a dyn ChainReader,
    artifacts: &'a Artifacts,
    config: &'a MosaicConfig,
    aux_chain_id: u64,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(
        origin: &'a dyn ChainReader,
        auxiliary: &'a dyn ChainReader,
        artifacts: &'a Artifacts,
        config: &'a MosaicConfig,
        aux_chain_id: u64,
    ) -> Self {
        Self {
            origin,
            auxiliary,
            artifacts,
            config,
            aux_chain_id,
        }
    }

    async fn view(
        &self,
        reader: &dyn ChainReader,
        kind: ContractKind,
        at: Address,
        method: &str,
    ) -> Result<Token> {
        let function = self.artifacts.get(kind)?.function(method)?;
        let output = reader
            .read(at, function.encode_input(&[])?)
            .await
            .with_context(|| format!("{kind}.{method} at {}", checksummed(&at)))?;
        single(function.decode_output(&output)?)
    }

    async fn expect_address(
        &self,
        reader: &dyn ChainReader,
        kind: ContractKind,
        at: Address,
        method: &str,
        expected: Address,
    ) -> Result<()> {
        let actual = as_address(&self.view(reader, kind, at, method).await?)?;
        debug!(contract = %kind, %method, actual = %checksummed(&actual), "checked");
        if actual != expected {
            return Err(MosaicError::mismatch(
                format!("{kind}.{method}"),
                checksummed(&expected),
                checksummed(&actual),
            )
            .into());
        }
        Ok(())
    }

    async fn expect_code(
        &self,
        reader: &dyn ChainReader,
        kind: ContractKind,
        at: Address,
    ) -> Result<()> {
        let prefix = self.artifacts.get(kind)?.runtime_prefix()?;
        let code = reader.code_at(at).await?;
        if !code_matches(&code, &prefix, kind.is_library()) {
            let shown = code.len().min(prefix.len()).min(16);
            return Err(MosaicError::mismatch(
                format!("{kind} code at {}", checksummed(&at)),
                format!("{}..", hex_prefixed(&prefix[..prefix.len().min(16)])),
                format!("{}..", hex_prefixed(&code[..shown])),
            )
            .into());
        }
        Ok(())
    }

    /// Run every check in order, failing on the first mismatch.
    pub async fn verify(&self) -> Result<()> {
        let aux_config = self
            .config
            .require_aux_chain(&self.aux_chain_id.to_string())?;
        let origin = &aux_config.contract_addresses.origin;
        let aux = &aux_config.contract_addresses.auxiliary;
        let r = Recorded::new(origin, aux)?;

        self.expect_address(
            self.origin,
            ContractKind::Anchor,
            r.origin_anchor,
            "organization",
            r.origin_anchor_organization,
        )
        .await?;
        self.expect_address(
            self.origin,
            ContractKind::Eip20Gateway,
            r.gateway,
            "organization",
            r.gateway_organization,
        )
        .await?;
        let activated = as_bool(
            &self
                .view(self.origin, ContractKind::Eip20Gateway, r.gateway, "activated")
                .await?,
        )?;
        if !activated {
            return Err(MosaicError::mismatch("EIP20Gateway.activated", true, false).into());
        }
        self.expect_address(
            self.origin,
            ContractKind::Eip20Gateway,
            r.gateway,
            "remoteGateway",
            r.co_gateway,
        )
        .await?;

        self.expect_address(
            self.auxiliary,
            ContractKind::Anchor,
            r.aux_anchor,
            "organization",
            r.aux_anchor_organization,
        )
        .await?;
        self.expect_address(
            self.auxiliary,
            ContractKind::Eip20CoGateway,
            r.co_gateway,
            "organization",
            r.co_gateway_organization,
        )
        .await?;
        self.expect_address(
            self.auxiliary,
            ContractKind::Eip20CoGateway,
            r.co_gateway,
            "remoteGateway",
            r.gateway,
        )
        .await?;
        self.expect_address(
            self.auxiliary,
            ContractKind::OstPrime,
            r.ost_prime,
            "coGateway",
            r.co_gateway,
        )
        .await?;

        if let Some(deployer) = aux_config.deployer {
            for (role, planned) in AUXILIARY_PLAN.expected_addresses(deployer, 0) {
                let Some((field, recorded)) = recorded_for(role, aux) else {
                    continue;
                };
                let recorded = required(field, recorded)?;
                if recorded != planned {
                    return Err(MosaicError::mismatch(
                        field,
                        checksummed(&planned),
                        checksummed(&recorded),
                    )
                    .into());
                }
            }
        }

        let mut origin_code = vec![
            (ContractKind::Organization, r.origin_anchor_organization),
            (ContractKind::Anchor, r.origin_anchor),
            (ContractKind::Organization, r.gateway_organization),
            (ContractKind::Eip20Gateway, r.gateway),
        ];
        origin_code.extend(recorded_libraries(
            origin.merkle_patricia_lib_address,
            origin.message_bus_address,
            origin.gateway_lib_address,
        ));
        for (kind, at) in origin_code {
            self.expect_code(self.origin, kind, at).await?;
        }
        let mut aux_code = vec![
            (ContractKind::Organization, r.aux_anchor_organization),
            (ContractKind::Anchor, r.aux_anchor),
            (ContractKind::Organization, r.co_gateway_organization),
            (ContractKind::OstPrime, r.ost_prime),
            (ContractKind::Eip20CoGateway, r.co_gateway),
        ];
        aux_code.extend(recorded_libraries(
            aux.merkle_patricia_lib_address,
            aux.message_bus_address,
            aux.gateway_lib_address,
        ));
        for (kind, at) in aux_code {
            self.expect_code(self.auxiliary, kind, at).await?;
        }

        info!(
            chain = %self.config.origin_chain.chain,
            chain_id = self.aux_chain_id,
            "gateway pair verified"
        );
        Ok(())
    }
}
