//! CRX ids: the stable identity of a signed package.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors parsing a CRX id from raw bytes or its string form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrxIdError {
    /// Raw id was not exactly 16 bytes.
    #[error("crx id must be 16 bytes, got {0}")]
    Length(usize),

    /// Text form was not 32 characters in `a..=p`.
    #[error("invalid crx id '{0}': expected 32 characters in a-p")]
    Text(String),
}

/// A 16-byte package identifier derived from a public key.
///
/// The text form maps every nibble to `a..=p`, high nibble first, giving the
/// 32-character ids browsers show for extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrxId([u8; CrxId::LEN]);

impl CrxId {
    /// Length of the raw id in bytes.
    pub const LEN: usize = 16;

    /// Derive the id of a DER-encoded `SubjectPublicKeyInfo`.
    pub fn from_public_key(public_key_der: &[u8]) -> Self {
        let digest = Sha256::digest(public_key_der);
        let mut raw = [0u8; Self::LEN];
        raw.copy_from_slice(&digest[..Self::LEN]);
        Self(raw)
    }

    /// Wrap raw id bytes, e.g. the `crx_id` field of `SignedData`.
    ///
    /// # Errors
    ///
    /// Returns [`CrxIdError::Length`] unless `bytes` is exactly 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CrxIdError> {
        let raw: [u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| CrxIdError::Length(bytes.len()))?;
        Ok(Self(raw))
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl std::fmt::Display for CrxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text: String = self
            .0
            .iter()
            .flat_map(|b| [b >> 4, b & 0x0f])
            .map(|nibble| char::from(b'a' + nibble))
            .collect();
        f.write_str(&text)
    }
}

impl std::str::FromStr for CrxId {
    type Err = CrxIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != Self::LEN * 2 || !bytes.iter().all(|c| (b'a'..=b'p').contains(c)) {
            return Err(CrxIdError::Text(s.to_string()));
        }

        let mut raw = [0u8; Self::LEN];
        for (slot, pair) in raw.iter_mut().zip(bytes.chunks_exact(2)) {
            *slot = ((pair[0] - b'a') << 4) | (pair[1] - b'a');
        }
        Ok(Self(raw))
    }
}

impl Serialize for CrxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CrxId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
