//! Inventory vectors: typed references to advertisable objects

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of object an [`InventoryVector`] refers to.
///
/// Encoded on the wire as a `u32`. Codes this node does not recognise decode
/// to [`InvType::Unknown`] instead of failing the whole message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum InvType {
    Error,
    DirBlock,
    EntryCreditBlock,
    NonDirBlock,
    FactoidBlock,
    EntryBlock,
    Unknown(u32),
}

impl From<u32> for InvType {
    fn from(code: u32) -> Self {
        match code {
            0 => InvType::Error,
            1 => InvType::DirBlock,
            2 => InvType::EntryCreditBlock,
            3 => InvType::NonDirBlock,
            4 => InvType::FactoidBlock,
            5 => InvType::EntryBlock,
            other => InvType::Unknown(other),
        }
    }
}

impl From<InvType> for u32 {
    fn from(kind: InvType) -> Self {
        match kind {
            InvType::Error => 0,
            InvType::DirBlock => 1,
            InvType::EntryCreditBlock => 2,
            InvType::NonDirBlock => 3,
            InvType::FactoidBlock => 4,
            InvType::EntryBlock => 5,
            InvType::Unknown(code) => code,
        }
    }
}

impl fmt::Display for InvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvType::Error => f.write_str("ERROR"),
            InvType::DirBlock => f.write_str("MSG_DIR_BLOCK"),
            InvType::EntryCreditBlock => f.write_str("MSG_EC_BLOCK"),
            InvType::NonDirBlock => f.write_str("MSG_NON_DIR_BLOCK"),
            InvType::FactoidBlock => f.write_str("MSG_FACTOID_BLOCK"),
            InvType::EntryBlock => f.write_str("MSG_ENTRY_BLOCK"),
            InvType::Unknown(code) => write!(f, "Unknown InvType ({})", code),
        }
    }
}

/// `(kind, hash)` pair identifying an object a peer may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryVector {
    pub kind: InvType,
    pub hash: Hash,
}

impl InventoryVector {
    pub fn new(kind: InvType, hash: Hash) -> Self {
        Self { kind, hash }
    }

    pub fn dir_block(hash: Hash) -> Self {
        Self::new(InvType::DirBlock, hash)
    }

    pub fn entry_credit_block(hash: Hash) -> Self {
        Self::new(InvType::EntryCreditBlock, hash)
    }
}

impl fmt::Display for InventoryVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.hash)
    }
}
