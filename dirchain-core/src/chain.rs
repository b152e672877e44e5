//! Chain lookup interface and the in-memory local chain

use crate::{BlockHeight, CoreError, CoreResult, DirectoryBlock, EntryCreditBlock, Hash};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of the node's directory chain.
///
/// Shared by every peer session; implementations must give consistent
/// answers to concurrent height and index queries.
pub trait BlockStore: Send + Sync {
    /// Number of directory blocks stored; the next block lands at this height
    fn height(&self) -> BlockHeight;

    /// Hash of the directory block at `height`
    fn dir_block_hash_at(&self, height: BlockHeight) -> Option<Hash>;

    /// Height of the directory block with `hash`
    fn dir_block_height(&self, hash: &Hash) -> Option<BlockHeight>;

    fn fetch_dir_block_by_hash(&self, hash: &Hash) -> Option<DirectoryBlock>;

    fn fetch_ec_block_by_hash(&self, hash: &Hash) -> Option<EntryCreditBlock>;
}

/// Shared chain reference
pub type SharedBlockStore = Arc<dyn BlockStore>;

#[derive(Debug, Default)]
struct ChainState {
    blocks: Vec<(Hash, DirectoryBlock)>,
    index: HashMap<Hash, BlockHeight>,
    ec_blocks: HashMap<Hash, EntryCreditBlock>,
}

/// Append-only directory chain held in memory
#[derive(Debug, Default)]
pub struct LocalChain {
    state: RwLock<ChainState>,
}

impl LocalChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next directory block, returning its hash.
    ///
    /// The block's height must equal the current chain height.
    pub fn append_dir_block(&self, block: DirectoryBlock) -> CoreResult<Hash> {
        let hash = block.hash()?;
        let mut state = self.state.write();
        let expected = state.blocks.len() as BlockHeight;
        if block.height() != expected {
            return Err(CoreError::HeightGap {
                expected,
                got: block.height(),
            });
        }
        state.index.insert(hash, expected);
        state.blocks.push((hash, block));
        Ok(hash)
    }

    /// Store an entry credit block, returning its hash
    pub fn insert_ec_block(&self, block: EntryCreditBlock) -> CoreResult<Hash> {
        let hash = block.hash()?;
        self.state.write().ec_blocks.insert(hash, block);
        Ok(hash)
    }
}

impl BlockStore for LocalChain {
    fn height(&self) -> BlockHeight {
        self.state.read().blocks.len() as BlockHeight
    }

    fn dir_block_hash_at(&self, height: BlockHeight) -> Option<Hash> {
        let index = usize::try_from(height).ok()?;
        self.state.read().blocks.get(index).map(|(hash, _)| *hash)
    }

    fn dir_block_height(&self, hash: &Hash) -> Option<BlockHeight> {
        self.state.read().index.get(hash).copied()
    }

    fn fetch_dir_block_by_hash(&self, hash: &Hash) -> Option<DirectoryBlock> {
        let state = self.state.read();
        let height = *state.index.get(hash)?;
        state
            .blocks
            .get(height as usize)
            .map(|(_, block)| block.clone())
    }

    fn fetch_ec_block_by_hash(&self, hash: &Hash) -> Option<EntryCreditBlock> {
        self.state.read().ec_blocks.get(hash).cloned()
    }
}
