//! Fixture chains for tests in this and downstream crates

use crate::{
    sha256, BlockHeight, DirBlockEntry, DirBlockHeader, DirectoryBlock, LocalChain,
    ENTRY_CREDIT_CHAIN_ID, FACTOID_CHAIN_ID,
};

/// Network id used by fixture blocks
pub const TEST_NETWORK_ID: u32 = 0x0fac_70e5;

/// Deterministic directory block at `height` referencing one entry credit
/// block and one factoid block
pub fn dir_block_at(height: BlockHeight) -> DirectoryBlock {
    let seed = height.to_be_bytes();
    DirectoryBlock::new(
        DirBlockHeader {
            network_id: TEST_NETWORK_ID,
            prev_key_mr: sha256(&seed),
            timestamp: 1_440_000_000 + height * 600,
            height,
        },
        vec![
            DirBlockEntry::new(ENTRY_CREDIT_CHAIN_ID, sha256(&[&seed[..], &b"ec"[..]].concat())),
            DirBlockEntry::new(FACTOID_CHAIN_ID, sha256(&[&seed[..], &b"fct"[..]].concat())),
        ],
    )
}

/// Local chain holding blocks `0..count`
pub fn chain_of(count: BlockHeight) -> LocalChain {
    let chain = LocalChain::new();
    for height in 0..count {
        chain
            .append_dir_block(dir_block_at(height))
            .expect("fixture blocks are contiguous");
    }
    chain
}
