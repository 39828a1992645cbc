use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use ethabi::{Log as DecodedLog, RawLog, Token};
use ethers::{
    providers::{Middleware, Provider, Ws},
    types::{
        Address, BlockNumber, TransactionReceipt, TransactionRequest, U64, U256,
        transaction::eip2718::TypedTransaction,
    },
};
use tracing::{debug, info};

use crate::{
    address::checksummed,
    contracts::{Artifacts, ContractKind},
    error::MosaicError,
};

/// Issues contract creations and calls from one account that is unlocked on the node
/// it talks to. Every transaction is awaited until mined; a failed status is a
/// [`MosaicError::TransactionReverted`].
#[derive(Clone)]
pub struct Deployer {
    provider: Arc<Provider<Ws>>,
    artifacts: Arc<Artifacts>,
    from: Address,
    gas_price: U256,
}

impl Deployer {
    pub fn new(
        provider: Arc<Provider<Ws>>,
        artifacts: Arc<Artifacts>,
        from: Address,
        gas_price: U256,
    ) -> Self {
        Self {
            provider,
            artifacts,
            from,
            gas_price,
        }
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn provider(&self) -> &Arc<Provider<Ws>> {
        &self.provider
    }

    /// Nonce of the next transaction, counting pending ones.
    pub async fn nonce(&self) -> Result<u64> {
        let count = self
            .provider
            .get_transaction_count(self.from, Some(BlockNumber::Pending.into()))
            .await?;
        Ok(count.as_u64())
    }

    /// Fail unless the next transaction of the deployer will use `expected`.
    pub async fn ensure_nonce(&self, expected: u64) -> Result<()> {
        let actual = self.nonce().await?;
        if actual != expected {
            return Err(anyhow!(
                "deployer {} is at nonce {actual}, the deployment plan expects {expected}",
                checksummed(&self.from)
            ));
        }
        Ok(())
    }

    /// Create `kind` with constructor `args`, linking `libraries` first.
    pub async fn deploy(
        &self,
        kind: ContractKind,
        args: &[Token],
        libraries: &[(ContractKind, Address)],
    ) -> Result<Address> {
        let artifact = self.artifacts.get(kind)?;
        let mut links = Vec::with_capacity(libraries.len());
        for (library, address) in libraries {
            links.push((self.artifacts.library_name(*library)?, *address));
        }
        let data = artifact.deploy_data(args, &links)?;

        let tx = TransactionRequest::new()
            .from(self.from)
            .gas_price(self.gas_price)
            .data(data);
        let receipt = self.send(tx, kind, "constructor").await?;
        let address = receipt
            .contract_address
            .ok_or_else(|| anyhow!("receipt of {kind} deployment has no contract address"))?;
        info!(contract = %kind, address = %checksummed(&address), "deployed");
        Ok(address)
    }

    pub async fn call(
        &self,
        kind: ContractKind,
        to: Address,
        method: &str,
        args: &[Token],
    ) -> Result<TransactionReceipt> {
        self.call_with_value(kind, to, method, args, U256::zero())
            .await
    }

    pub async fn call_with_value(
        &self,
        kind: ContractKind,
        to: Address,
        method: &str,
        args: &[Token],
        value: U256,
    ) -> Result<TransactionReceipt> {
        let function = self.artifacts.get(kind)?.function(method)?;
        let tx = TransactionRequest::new()
            .from(self.from)
            .to(to)
            .gas_price(self.gas_price)
            .value(value)
            .data(function.encode_input(args)?);
        let receipt = self.send(tx, kind, method).await?;
        info!(contract = %kind, %method, tx = ?receipt.transaction_hash, "called");
        Ok(receipt)
    }

    /// `eth_call` against the latest block.
    pub async fn view(
        &self,
        kind: ContractKind,
        to: Address,
        method: &str,
        args: &[Token],
    ) -> Result<Vec<Token>> {
        let function = self.artifacts.get(kind)?.function(method)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .from(self.from)
            .to(to)
            .data(function.encode_input(args)?)
            .into();
        let output = self
            .provider
            .call(&tx, None)
            .await
            .with_context(|| format!("{kind}.{method} call failed"))?;
        Ok(function.decode_output(&output)?)
    }

    pub async fn balance(&self, of: Address) -> Result<U256> {
        Ok(self.provider.get_balance(of, None).await?)
    }

    /// The first `event` emitted by `kind` in `receipt`.
    pub fn decode_event(
        &self,
        kind: ContractKind,
        event: &str,
        receipt: &TransactionReceipt,
    ) -> Result<DecodedLog> {
        let event = self.artifacts.get(kind)?.event(event)?;
        let signature = event.signature();
        let log = receipt
            .logs
            .iter()
            .find(|log| log.topics.first() == Some(&signature))
            .ok_or_else(|| {
                anyhow!(
                    "transaction {:?} emitted no {}",
                    receipt.transaction_hash,
                    event.name
                )
            })?;
        Ok(event.parse_log(RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        })?)
    }

    async fn send(
        &self,
        tx: TransactionRequest,
        kind: ContractKind,
        method: &str,
    ) -> Result<TransactionReceipt> {
        debug!(contract = %kind, %method, "sending transaction");
        let pending = self
            .provider
            .send_transaction(tx, None)
            .await
            .with_context(|| format!("Cannot send {kind}.{method}"))?;
        let tx_hash = pending.tx_hash();
        let receipt = pending
            .await?
            .ok_or_else(|| anyhow!("transaction {tx_hash:?} for {kind}.{method} was dropped"))?;
        if receipt.status != Some(U64::one()) {
            return Err(MosaicError::TransactionReverted {
                contract: kind.to_string(),
                method: method.to_owned(),
                tx: receipt.transaction_hash,
            }
            .into());
        }
        Ok(receipt)
    }
}

/// A single value out of a decoded log or call result.
pub fn token_named<'a>(log: &'a DecodedLog, name: &str) -> Result<&'a Token> {
    log.params
        .iter()
        .find(|p| p.name == name)
        .map(|p| &p.value)
        .ok_or_else(|| anyhow!("log has no parameter {name}"))
}

pub fn as_address(token: &Token) -> Result<Address> {
    token
        .clone()
        .into_address()
        .ok_or_else(|| anyhow!("expected an address, got {token:?}"))
}

pub fn as_uint(token: &Token) -> Result<U256> {
    token
        .clone()
        .into_uint()
        .ok_or_else(|| anyhow!("expected a uint, got {token:?}"))
}

pub fn as_bool(token: &Token) -> Result<bool> {
    token
        .clone()
        .into_bool()
        .ok_or_else(|| anyhow!("expected a bool, got {token:?}"))
}

/// First output of a view call.
pub fn single(tokens: Vec<Token>) -> Result<Token> {
    tokens
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("call returned nothing"))
}
