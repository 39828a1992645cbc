use anyhow::{Result, anyhow};
use ethers::{
    providers::{Middleware, Provider, Ws},
    types::{Address, BlockId, BlockNumber, Bytes, EIP1186ProofResponse, H256, U64, U256},
    utils::{keccak256, rlp::RlpStream},
};
use tracing::debug;

/// Storage slot of the gateway's outbox mapping (`messageHash => status`).
pub const OUTBOX_SLOT: u64 = 7;

/// Merkle proof of the origin gateway's account and of one outbox entry, all against
/// the state root of `block_number`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    pub block_number: u64,
    /// rlp([nonce, balance, storageHash, codeHash])
    pub account_data: Bytes,
    /// rlp list of the account trie nodes from the root down.
    pub account_proof: Bytes,
    pub storage_proofs: Vec<StorageProof>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageProof {
    pub key: H256,
    pub value: U256,
    pub serialized_proof: Bytes,
}

/// `keccak256(abi.encode(messageHash, OUTBOX_SLOT))`
pub fn outbox_storage_key(message_hash: H256) -> H256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(message_hash.as_bytes());
    U256::from(OUTBOX_SLOT).to_big_endian(&mut preimage[32..]);
    H256(keccak256(preimage))
}

fn slot_key(key: U256) -> H256 {
    let mut bytes = [0u8; 32];
    key.to_big_endian(&mut bytes);
    H256(bytes)
}

pub fn encode_account(nonce: U64, balance: U256, storage_hash: H256, code_hash: H256) -> Bytes {
    let mut stream = RlpStream::new_list(4);
    stream.append(&nonce);
    stream.append(&balance);
    stream.append(&storage_hash);
    stream.append(&code_hash);
    stream.out().freeze().into()
}

/// Nodes returned by `eth_getProof` are already rlp encoded; wrap them in a list.
pub fn serialize_nodes(nodes: &[Bytes]) -> Bytes {
    let mut stream = RlpStream::new_list(nodes.len());
    for node in nodes {
        stream.append_raw(node, 1);
    }
    stream.out().freeze().into()
}

impl Proof {
    pub fn from_response(block_number: u64, response: &EIP1186ProofResponse) -> Self {
        Self {
            block_number,
            account_data: encode_account(
                response.nonce,
                response.balance,
                response.storage_hash,
                response.code_hash,
            ),
            account_proof: serialize_nodes(&response.account_proof),
            storage_proofs: response
                .storage_proof
                .iter()
                .map(|p| StorageProof {
                    key: slot_key(p.key),
                    value: p.value,
                    serialized_proof: serialize_nodes(&p.proof),
                })
                .collect(),
        }
    }

    /// Proof of `gateway`'s outbox entry for `message_hash` at `block_number`.
    pub async fn fetch(
        provider: &Provider<Ws>,
        gateway: Address,
        message_hash: H256,
        block_number: u64,
    ) -> Result<Self> {
        let key = outbox_storage_key(message_hash);
        debug!(?key, block_number, "fetching outbox proof");
        let response = provider
            .get_proof(
                gateway,
                vec![key],
                Some(BlockId::Number(BlockNumber::Number(block_number.into()))),
            )
            .await?;
        let proof = Self::from_response(block_number, &response);
        if proof.storage_proofs.is_empty() {
            return Err(anyhow!("node returned no storage proof for {key:?}"));
        }
        Ok(proof)
    }

    pub fn storage_proof(&self) -> Result<&StorageProof> {
        self.storage_proofs
            .first()
            .ok_or_else(|| anyhow!("proof has no storage proof"))
    }
}
