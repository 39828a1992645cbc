use std::path::PathBuf;

use ethers::types::{Address, H256};

/// Failures that callers may want to match on. Everything else travels as a plain
/// `anyhow::Error` with context attached.
///
/// All of these are fatal to the running command; the only local recovery is the
/// bounded account-unlock poll, which ends in [`MosaicError::AccountUnlockTimeout`].
#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    #[error("config file {0} is missing or blank")]
    MissingConfigFile(PathBuf),
    #[error("config file {path} does not match its schema: {reason}")]
    InvalidConfigSchema { path: PathBuf, reason: String },
    #[error("invalid address {0:?}")]
    InvalidAddressFormat(String),
    #[error("init config field `{field}` must be set and non-zero")]
    InvalidInitConfig { field: &'static str },
    #[error("environment is not clean: {0}")]
    EnvironmentNotClean(String),
    #[error("chain verification failed for {field}: expected {expected}, found {actual}")]
    ChainVerificationMismatch {
        field: String,
        expected: String,
        actual: String,
    },
    #[error("transaction {tx:?} calling {contract}.{method} reverted")]
    TransactionReverted {
        contract: String,
        method: String,
        tx: H256,
    },
    #[error("accounts {accounts:?} still locked after {attempts} attempts")]
    AccountUnlockTimeout {
        accounts: Vec<Address>,
        attempts: u32,
    },
    #[error("{what} did not succeed after {attempts} attempts")]
    RetryExhausted { what: String, attempts: u32 },
}

impl MosaicError {
    pub fn mismatch(
        field: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        MosaicError::ChainVerificationMismatch {
            field: field.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
