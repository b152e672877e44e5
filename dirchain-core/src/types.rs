//! Digest type and hashing functions

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

/// Directory block height (0 is genesis)
pub type BlockHeight = u64;

/// Timestamp in seconds since Unix epoch
pub type Timestamp = u64;

/// Length of every digest in bytes
pub const HASH_LENGTH: usize = 32;

/// 32-byte content digest.
///
/// The all-zero value is reserved as the "no hash" sentinel, e.g. a
/// `GetDirBlocks` request without a stop constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_LENGTH]);

impl Hash {
    /// Create a new hash from byte array
    pub const fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create hash from slice, rejecting anything that is not 32 bytes
    pub fn from_slice(slice: &[u8]) -> CoreResult<Self> {
        let bytes: [u8; HASH_LENGTH] = slice.try_into().map_err(|_| {
            CoreError::InvalidHash(format!(
                "expected {} bytes, got {}",
                HASH_LENGTH,
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Get the underlying byte array
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string
    pub fn from_hex(hex: &str) -> CoreResult<Self> {
        let bytes = hex::decode(hex)?;
        Self::from_slice(&bytes)
    }

    /// Zero hash (all bytes are 0)
    pub fn zero() -> Self {
        Self([0u8; HASH_LENGTH])
    }

    /// Whether this is the zero sentinel
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LENGTH]
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; HASH_LENGTH]> for Hash {
    fn from(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// SHA-256 of `data`
pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut bytes = [0u8; HASH_LENGTH];
    bytes.copy_from_slice(&digest);
    Hash(bytes)
}

/// First 32 bytes of SHA-512 of `data`
pub fn sha512_half(data: &[u8]) -> Hash {
    let full = Sha512::digest(data);
    let mut bytes = [0u8; HASH_LENGTH];
    bytes.copy_from_slice(&full[..HASH_LENGTH]);
    Hash(bytes)
}
