use core::convert::AsRef;
use std::{env, path::Path, path::PathBuf};

use anyhow::{Result, anyhow};
use tracing::error;

pub async fn file_exists(file_name: impl AsRef<Path>) -> Result<bool> {
    Ok(tokio::fs::metadata(file_name).await.is_ok())
}

/// Get a string from a u8
pub fn string_or_empty_from_u8(in_val: &[u8]) -> String {
    let result: &str = if let Ok(val) = std::str::from_utf8(in_val) {
        val
    } else {
        "<not_representable>"
    };
    result.to_string()
}

/// Get string from path
pub fn string_from_path(in_path: &Path) -> Result<String> {
    Ok(in_path
        .as_os_str()
        .to_str()
        .ok_or(anyhow!("Cannot convert path to string"))?
        .to_string())
}

pub fn relative_home_path(val: &str) -> Result<PathBuf> {
    let mut home_path = home::home_dir().ok_or(anyhow!("Can't get your home directory"))?;
    home_path.push(val);
    Ok(home_path)
}

/// Log an error and re-propagate
pub fn with_error_logged<T>(result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("{err:#}");
            Err(err)
        }
    }
}

pub fn compute_log_string(log_level: &str, debug_modules: &[String]) -> String {
    // If there already was one, use that ..
    match env::var("RUST_LOG") {
        Ok(val) => val,
        _ => {
            let mut val = format!("mosaic={log_level},mosaiclib={log_level}");
            for i in debug_modules {
                val.push_str(&format!(",{i}=debug"));
            }
            val
        }
    }
}

/// Lower-case hex with a `0x` prefix.
pub fn hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
