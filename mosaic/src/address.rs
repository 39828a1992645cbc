use ethers::{
    types::Address,
    utils::{get_contract_address, to_checksum},
};

use crate::error::MosaicError;

/// Parse a `0x`-prefixed 20 byte hex address. Mixed-case input must carry a valid
/// EIP-55 checksum; all-lower or all-upper input is accepted as is.
pub fn parse_address(input: &str) -> Result<Address, MosaicError> {
    let invalid = || MosaicError::InvalidAddressFormat(input.to_owned());
    let hex_part = input.trim().strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 40 {
        return Err(invalid());
    }
    let bytes = hex::decode(hex_part).map_err(|_| invalid())?;
    let address = Address::from_slice(&bytes);

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None)[2..] != *hex_part {
        return Err(invalid());
    }
    Ok(address)
}

pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}

/// The address a `CREATE` from `deployer` at `nonce` will land on:
/// the rightmost 20 bytes of keccak256(rlp([deployer, nonce])).
pub fn contract_address(deployer: Address, nonce: u64) -> Address {
    get_contract_address(deployer, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let checked = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert_eq!(parse_address(lower).unwrap(), parse_address(checked).unwrap());
        assert_eq!(checksummed(&parse_address(lower).unwrap()), checked);

        // Broken checksum.
        assert!(parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD").is_err());
        assert!(parse_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
        assert!(parse_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1bea").is_err());
        assert!(parse_address("0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
    }

    #[test]
    fn create_address() {
        // First contract ever created by this account on mainnet.
        let deployer = parse_address("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            contract_address(deployer, 0),
            parse_address("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap()
        );
        assert_eq!(
            contract_address(deployer, 1),
            parse_address("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap()
        );
        assert_eq!(contract_address(deployer, 7), contract_address(deployer, 7));
    }
}
