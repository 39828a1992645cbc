/// Token amounts in config files are written as decimal strings, which is how the
/// contract tooling prints them. Hex strings and plain JSON numbers are accepted too.
pub mod u256_dec {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(U256::from(n)),
            Repr::Text(s) => parse(&s).map_err(de::Error::custom),
        }
    }

    pub fn parse(s: &str) -> Result<U256, String> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x") {
            U256::from_str_radix(hex, 16).map_err(|e| format!("{s}: {e}"))
        } else {
            U256::from_dec_str(s).map_err(|e| format!("{s}: {e}"))
        }
    }
}

/// Addresses are written back EIP-55 checksummed so the files stay diffable against
/// what block explorers show.
pub mod checksummed {
    use ethers::{types::Address, utils::to_checksum};
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::address::parse_address;

    pub fn serialize<S>(value: &Address, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_checksum(value, None))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_address(&s).map_err(de::Error::custom)
    }

    pub mod option {
        use ethers::{types::Address, utils::to_checksum};
        use serde::{Deserialize, Deserializer, Serializer, de};

        use crate::address::parse_address;

        pub fn serialize<S>(value: &Option<Address>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(a) => serializer.serialize_some(&to_checksum(a, None)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| parse_address(&s).map_err(de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use ethers::types::U256;

    use super::u256_dec::parse;

    #[test]
    fn amounts() {
        assert_eq!(parse("1000000000000000000").unwrap(), U256::exp10(18));
        assert_eq!(parse("0x10").unwrap(), U256::from(16));
        assert_eq!(parse(" 42 ").unwrap(), U256::from(42));
        assert!(parse("ten").is_err());
    }
}
