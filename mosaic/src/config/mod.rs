//! The config store: JSON descriptors of deployment parameters and of deployed contract
//! addresses, plus the derived address views used to configure one gateway pair.

mod addresses;
mod directory;
mod gateway_config;
mod init_config;
mod mosaic_config;
mod token_config;

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

pub use addresses::{GatewayAddresses, TokenAddresses};
pub use directory::Directory;
pub use gateway_config::{AuxiliaryGatewayContracts, GatewayConfig, OriginGatewayContracts};
pub use init_config::{InitConfig, TxOptions};
pub use mosaic_config::{
    AuxiliaryChainConfig, AuxiliaryContracts, ContractAddresses, MosaicConfig, OriginChainConfig,
    OriginChainContracts, OriginContracts, ensure_unset, required, set_once,
};
pub use token_config::TokenConfig;

#[cfg(test)]
pub(crate) use init_config::tests::sample_json as init_config_sample;

use crate::error::MosaicError;

/// Read and parse a JSON config file. A missing or blank file is
/// [`MosaicError::MissingConfigFile`]; anything that does not fit `T` is
/// [`MosaicError::InvalidConfigSchema`].
pub(crate) fn read_config_file<T: DeserializeOwned>(path: &Path) -> Result<T, MosaicError> {
    let contents = fs::read_to_string(path)
        .map_err(|_| MosaicError::MissingConfigFile(path.to_path_buf()))?;
    if contents.trim().is_empty() {
        return Err(MosaicError::MissingConfigFile(path.to_path_buf()));
    }
    serde_json::from_str(&contents).map_err(|e| MosaicError::InvalidConfigSchema {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Pretty-print `value` to `path`, replacing whatever was there.
pub(crate) fn write_config_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(())
}
