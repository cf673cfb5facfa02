//! Curve transport keys.
//!
//! A notary publishes its static X25519 public key in its server contract.
//! Clients generate a fresh keypair for every socket they open.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};

use crate::channel::ChannelError;

pub const KEY_LEN: usize = 32;

/// A peer's public transport key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransportKey([u8; KEY_LEN]);

impl TransportKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub(crate) fn public_key(&self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Debug for TransportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransportKey({})", self)
    }
}

impl fmt::Display for TransportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for TransportKey {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| ChannelError::InvalidKey(e.to_string()))?;
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ChannelError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", b.len())))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for TransportKey {
    type Error = ChannelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransportKey> for String {
    fn from(key: TransportKey) -> Self {
        key.to_string()
    }
}

/// A secret key and its public half.
///
/// The secret is zeroized on drop by `x25519-dalek`.
#[derive(Clone)]
pub struct TransportKeypair {
    secret: StaticSecret,
    public: TransportKey,
}

impl TransportKeypair {
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(rand::rngs::OsRng))
    }

    pub fn from_secret_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self::from_secret(StaticSecret::from(bytes))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = TransportKey(PublicKey::from(&secret).to_bytes());
        Self { secret, public }
    }

    pub fn public(&self) -> TransportKey {
        self.public
    }

    /// X25519 agreement with `peer`; rejects low-order peer keys.
    pub(crate) fn agree(&self, peer: &TransportKey) -> Result<SharedSecret, ChannelError> {
        let shared = self.secret.diffie_hellman(&peer.public_key());
        if !shared.was_contributory() {
            return Err(ChannelError::Handshake("non-contributory key agreement".into()));
        }
        Ok(shared)
    }
}

impl fmt::Debug for TransportKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
