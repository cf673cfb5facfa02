//! Content identifiers for contracts, Nyms, accounts and notaries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::contract::ContractError;

/// A binary identifier, displayed as lowercase hex.
///
/// The empty identifier is a valid value: it is what an unset account or an
/// unparseable attribute turns into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Identifier(Vec<u8>);

impl Identifier {
    /// Identifier of `data`: its SHA-256 digest.
    pub fn digest(data: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(data.as_ref()).to_vec())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Random 32-byte identifier, used for fresh Nyms and accounts.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Lenient decode: anything that is not valid hex becomes the empty identifier.
    pub fn from_encoded(text: &str) -> Self {
        hex::decode(text.trim()).map(Self).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn release(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl FromStr for Identifier {
    type Err = ContractError;

    /// Strict decode, for user input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| ContractError::InvalidIdentifier(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}

impl From<String> for Identifier {
    fn from(text: String) -> Self {
        Self::from_encoded(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_sha256() {
        let id = Identifier::digest("abc");
        assert_eq!(
            id.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_lenient_decode() {
        assert!(Identifier::from_encoded("not hex").is_empty());
        assert!(Identifier::from_encoded("").is_empty());
        assert_eq!(Identifier::from_encoded("00ff").as_bytes(), &[0x00, 0xff]);
    }

    #[test]
    fn test_strict_decode() {
        assert!("zz".parse::<Identifier>().is_err());
        let id: Identifier = "0a0b".parse().unwrap();
        assert_eq!(id.to_string(), "0a0b");
    }

    #[test]
    fn test_empty_displays_as_empty_string() {
        assert_eq!(Identifier::default().to_string(), "");
    }
}
