use std::path::Path;

use anyhow::Result;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use super::read_config_file;
use crate::serde_util::checksummed;

/// The value token on origin and its utility token on the auxiliary chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenConfig {
    #[serde(with = "checksummed")]
    pub value_token_address: Address,
    #[serde(with = "checksummed")]
    pub utility_token_address: Address,
}

impl TokenConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(read_config_file(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MosaicError;

    #[test]
    fn parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token-config.json");
        std::fs::write(
            &path,
            r#"{
                "valueTokenAddress": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
                "utilityTokenAddress": "0x6666666666666666666666666666666666666666"
            }"#,
        )
        .unwrap();
        let config = TokenConfig::from_file(&path).unwrap();
        assert_eq!(config.utility_token_address, Address::repeat_byte(0x66));

        // Wrong EIP-55 casing.
        std::fs::write(
            &path,
            r#"{
                "valueTokenAddress": "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
                "utilityTokenAddress": "0x6666666666666666666666666666666666666666"
            }"#,
        )
        .unwrap();
        let err = TokenConfig::from_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MosaicError>(),
            Some(MosaicError::InvalidConfigSchema { .. })
        ));
    }
}
