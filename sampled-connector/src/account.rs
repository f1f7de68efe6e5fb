//! Account references and their derivation from public keys.

use std::fmt;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConnectorError;

type Blake2b256 = Blake2b<U32>;

/// blake2b-256, the chain's address/deploy hash function.
pub(crate) fn blake2b256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// A 32-byte account reference, compared and rendered in normalized
/// lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses a hex account reference; case-insensitive.
    pub fn from_hex(s: &str) -> Result<Self, ConnectorError> {
        let raw: [u8; 32] = hex::decode(s)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| ConnectorError::Format(format!("invalid account reference: {s}")))?;
        Ok(Self(raw))
    }

    /// Derives the account reference for an algorithm-tagged public key hex
    /// string (`01…` ed25519, `02…` secp256k1).
    ///
    /// The reference is blake2b-256 over the lowercase algorithm name, a
    /// zero separator byte and the raw key bytes.
    pub fn from_public_key(public_key_hex: &str) -> Result<Self, ConnectorError> {
        let bytes = hex::decode(public_key_hex)
            .map_err(|_| ConnectorError::Format(format!("invalid public key: {public_key_hex}")))?;
        let (tag, key) = bytes
            .split_first()
            .ok_or_else(|| ConnectorError::Format("empty public key".into()))?;
        let algorithm: &[u8] = match tag {
            1 => b"ed25519",
            2 => b"secp256k1",
            other => {
                return Err(ConnectorError::Format(format!(
                    "unknown public key algorithm tag: {other}"
                )))
            }
        };
        Ok(Self(blake2b256(&[algorithm, &[0u8], key])))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AccountId::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_is_case_insensitive() {
        let lower = AccountId::from_hex(&"ab".repeat(32)).unwrap();
        let upper = AccountId::from_hex(&"AB".repeat(32)).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_hex(), "ab".repeat(32));
    }

    #[test]
    fn public_key_derivation_is_deterministic_and_algorithm_scoped() {
        let key = format!("01{}", "11".repeat(32));
        let a = AccountId::from_public_key(&key).unwrap();
        let b = AccountId::from_public_key(&key).unwrap();
        assert_eq!(a, b);

        let secp = format!("02{}", "11".repeat(32));
        assert_ne!(a, AccountId::from_public_key(&secp).unwrap());
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(AccountId::from_public_key("zz").is_err());
        assert!(AccountId::from_public_key("").is_err());
        assert!(AccountId::from_public_key(&format!("09{}", "11".repeat(32))).is_err());
        assert!(AccountId::from_hex("1234").is_err());
    }
}
