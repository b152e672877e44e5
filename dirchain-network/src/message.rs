//! Wire messages of the directory block sync protocol

use crate::{NetworkError, NetworkResult};
use dirchain_core::{BlockLocator, DirectoryBlock, EntryCreditBlock, Hash, InventoryVector};
use serde::{Deserialize, Serialize};

/// Protocol constants peers must agree on
pub mod limits {
    /// Maximum directory block hashes per range reply
    pub const MAX_BLOCKS_PER_MSG: usize = 500;
    /// Maximum inventory vectors in any inventory-bearing message
    pub const MAX_INV_PER_MSG: usize = 50_000;
    /// Signal-bearing sends allowed in flight while streaming
    pub const FLOW_CONTROL_WINDOW: usize = 3;
    /// Maximum encoded frame size (2 MiB)
    pub const MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;
}

/// Bounded list of inventory vectors carried by inventory-style messages.
///
/// The bound holds for decoded lists too, so a handler never sees more
/// than [`limits::MAX_INV_PER_MSG`] vectors from a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<InventoryVector>", into = "Vec<InventoryVector>")]
pub struct InvList {
    items: Vec<InventoryVector>,
}

impl InvList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(limits::MAX_INV_PER_MSG)),
        }
    }

    pub fn single(iv: InventoryVector) -> Self {
        Self { items: vec![iv] }
    }

    /// Build from vectors, failing past [`limits::MAX_INV_PER_MSG`]
    pub fn from_vec(items: Vec<InventoryVector>) -> NetworkResult<Self> {
        if items.len() > limits::MAX_INV_PER_MSG {
            return Err(NetworkError::TooManyInventory {
                max: limits::MAX_INV_PER_MSG,
            });
        }
        Ok(Self { items })
    }

    pub fn add(&mut self, iv: InventoryVector) -> NetworkResult<()> {
        if self.items.len() >= limits::MAX_INV_PER_MSG {
            return Err(NetworkError::TooManyInventory {
                max: limits::MAX_INV_PER_MSG,
            });
        }
        self.items.push(iv);
        Ok(())
    }

    pub fn items(&self) -> &[InventoryVector] {
        &self.items
    }

    pub fn into_items(self) -> Vec<InventoryVector> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl TryFrom<Vec<InventoryVector>> for InvList {
    type Error = NetworkError;

    fn try_from(items: Vec<InventoryVector>) -> NetworkResult<Self> {
        Self::from_vec(items)
    }
}

impl From<InvList> for Vec<InventoryVector> {
    fn from(list: InvList) -> Self {
        list.items
    }
}

/// Messages exchanged between two directly connected peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Full directory block payload
    DirBlock(Box<DirectoryBlock>),
    /// Full entry credit block payload
    EntryCreditBlock(Box<EntryCreditBlock>),
    /// Inventory announcement
    DirInv(InvList),
    /// Request for directory block payloads
    GetDirData(InvList),
    /// Request for sub-blocks referenced by a directory block
    GetNonDirData(InvList),
    /// Items of a previous request that could not be resolved
    NotFound(InvList),
    /// Request for a historical range of directory block hashes
    GetDirBlocks {
        locator: BlockLocator,
        /// Last hash wanted; zero means "up to the tip"
        hash_stop: Hash,
    },
}

impl Message {
    /// Short command name, used in logs
    pub fn command(&self) -> &'static str {
        match self {
            Message::DirBlock(_) => "dirblock",
            Message::EntryCreditBlock(_) => "ecblock",
            Message::DirInv(_) => "dirinv",
            Message::GetDirData(_) => "getdirdata",
            Message::GetNonDirData(_) => "getnondirdata",
            Message::NotFound(_) => "notfound",
            Message::GetDirBlocks { .. } => "getdirblocks",
        }
    }

    pub fn dir_block(block: DirectoryBlock) -> Self {
        Message::DirBlock(Box::new(block))
    }

    pub fn entry_credit_block(block: EntryCreditBlock) -> Self {
        Message::EntryCreditBlock(Box::new(block))
    }

    pub fn get_dir_blocks(locator: BlockLocator, hash_stop: Hash) -> Self {
        Message::GetDirBlocks { locator, hash_stop }
    }
}
