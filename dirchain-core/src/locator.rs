//! Block locators used to find a common ancestor between two peers

use crate::{BlockStore, CoreError, CoreResult, Hash};
use serde::{Deserialize, Serialize};

/// Maximum number of hashes a locator may carry
pub const MAX_BLOCK_LOCATORS_PER_MSG: usize = 500;

/// Number of most recent blocks listed one by one before the step widens
const DENSE_PREFIX: usize = 10;

/// Ordered list of directory block hashes, most recent first.
///
/// An empty locator means the sender knows no common block, so the
/// responder starts from the block after genesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Hash>", into = "Vec<Hash>")]
pub struct BlockLocator {
    hashes: Vec<Hash>,
}

impl BlockLocator {
    pub fn new(hashes: Vec<Hash>) -> CoreResult<Self> {
        if hashes.len() > MAX_BLOCK_LOCATORS_PER_MSG {
            return Err(CoreError::LocatorTooLong {
                max: MAX_BLOCK_LOCATORS_PER_MSG,
            });
        }
        Ok(Self { hashes })
    }

    /// Build a locator from the local chain: the ten most recent hashes,
    /// then exponentially widening gaps, always ending with genesis.
    pub fn from_chain(store: &dyn BlockStore) -> Self {
        let height = store.height();
        if height == 0 {
            return Self::default();
        }

        let mut hashes = Vec::new();
        let mut step = 1u64;
        let mut current = height - 1;
        loop {
            if let Some(hash) = store.dir_block_hash_at(current) {
                hashes.push(hash);
            }
            if current == 0 || hashes.len() >= MAX_BLOCK_LOCATORS_PER_MSG {
                break;
            }
            if hashes.len() >= DENSE_PREFIX {
                step *= 2;
            }
            current = current.saturating_sub(step);
        }
        Self { hashes }
    }

    /// Most recent hash, used to filter duplicate range requests
    pub fn begin(&self) -> Option<&Hash> {
        self.hashes.first()
    }

    pub fn hashes(&self) -> &[Hash] {
        &self.hashes
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl TryFrom<Vec<Hash>> for BlockLocator {
    type Error = CoreError;

    fn try_from(hashes: Vec<Hash>) -> CoreResult<Self> {
        Self::new(hashes)
    }
}

impl From<BlockLocator> for Vec<Hash> {
    fn from(locator: BlockLocator) -> Self {
        locator.hashes
    }
}
