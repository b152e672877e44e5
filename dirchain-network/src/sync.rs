//! Historical range sync over `GetDirBlocks`
//!
//! A requester sends its block locator and an optional stop hash. The
//! responder finds the most recent locator hash it knows, advertises up to
//! `max_blocks_per_msg` following directory blocks in one `DirInv`, and, if
//! the range was cut short, remembers the last advertised hash. When the
//! peer later fetches that block, the responder advertises the next one so
//! the peer asks for the following batch.

use crate::message::{InvList, Message};
use crate::session::PeerSession;
use crate::NetworkResult;
use dirchain_core::{BlockHeight, BlockLocator, BlockStore, Hash, InventoryVector};

/// Remembers the last accepted `(locator begin, stop)` pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateFilter {
    last: Option<(Hash, Hash)>,
}

impl DuplicateFilter {
    /// Returns false for an exact repeat of the previous request; otherwise
    /// records the pair and returns true. Requests without a begin hash are
    /// always accepted and reset the filter.
    pub fn accept(&mut self, begin: Option<&Hash>, stop: &Hash) -> bool {
        match begin {
            Some(begin) => {
                let pair = (*begin, *stop);
                if self.last == Some(pair) {
                    return false;
                }
                self.last = Some(pair);
                true
            }
            None => {
                self.last = None;
                true
            }
        }
    }
}

/// Heights `[start, end)` of the directory blocks to advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBatch {
    pub start: BlockHeight,
    pub end: BlockHeight,
    /// The range was clamped to the batch size
    pub truncated: bool,
}

impl RangeBatch {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve a locator and stop hash against the local chain.
///
/// Unknown locators restart the walk just after genesis; an unknown or zero
/// stop hash means "up to the tip".
pub fn resolve_range(
    chain: &dyn BlockStore,
    locator: &BlockLocator,
    hash_stop: &Hash,
    max_blocks: usize,
) -> RangeBatch {
    let mut end = chain.height();
    if !hash_stop.is_zero() {
        if let Some(height) = chain.dir_block_height(hash_stop) {
            end = height + 1;
        }
    }

    let start = locator
        .hashes()
        .iter()
        .find_map(|hash| chain.dir_block_height(hash))
        .map_or(1, |height| height + 1);

    let max_blocks = max_blocks as u64;
    let mut truncated = false;
    if end.saturating_sub(start) > max_blocks {
        end = start + max_blocks;
        truncated = true;
    }

    RangeBatch {
        start,
        end,
        truncated,
    }
}

/// Directory block inventory for every height in `batch`, ascending
pub fn collect_inventory(chain: &dyn BlockStore, batch: &RangeBatch) -> Vec<InventoryVector> {
    (batch.start..batch.end)
        .map_while(|height| chain.dir_block_hash_at(height))
        .map(InventoryVector::dir_block)
        .collect()
}

impl PeerSession {
    /// Answer a `GetDirBlocks` request with one bounded `DirInv`
    pub async fn handle_get_dir_blocks(
        &mut self,
        locator: BlockLocator,
        hash_stop: Hash,
    ) -> NetworkResult<()> {
        if !self
            .inbound_range_filter
            .accept(locator.begin(), &hash_stop)
        {
            tracing::trace!(
                peer = %self.peer,
                stop = %hash_stop,
                "Filtering duplicate [getdirblocks]"
            );
            return Ok(());
        }

        let batch = resolve_range(
            self.chain.as_ref(),
            &locator,
            &hash_stop,
            self.config.max_blocks_per_msg,
        );
        let inventory = collect_inventory(self.chain.as_ref(), &batch);
        tracing::debug!(
            peer = %self.peer,
            tip = self.chain.height(),
            start = batch.start,
            end = batch.end,
            truncated = batch.truncated,
            "Resolved directory block range"
        );

        if inventory.is_empty() {
            return Ok(());
        }

        if batch.truncated {
            self.continue_hash = inventory.last().map(|iv| iv.hash);
        }
        self.outbound
            .queue_message(Message::DirInv(InvList::from_vec(inventory)?), None)
            .await
    }

    /// Ask the peer for directory block hashes after our locator, skipping
    /// a request identical to the previous one
    pub async fn push_get_dir_blocks(
        &mut self,
        locator: BlockLocator,
        hash_stop: Hash,
    ) -> NetworkResult<()> {
        if !self
            .outbound_range_filter
            .accept(locator.begin(), &hash_stop)
        {
            tracing::trace!(
                peer = %self.peer,
                stop = %hash_stop,
                "Not resending duplicate [getdirblocks]"
            );
            return Ok(());
        }

        self.outbound
            .queue_message(Message::get_dir_blocks(locator, hash_stop), None)
            .await
    }

    /// Hash of the block after `hash` in the local chain
    pub(crate) fn next_dir_block_hash(&self, hash: &Hash) -> Option<Hash> {
        let height = self.chain.dir_block_height(hash)?;
        self.chain.dir_block_hash_at(height + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use dirchain_core::test_support::chain_of;
    use dirchain_core::InvType;
    use proptest::prelude::*;

    fn locator_at(chain: &dyn BlockStore, heights: &[u64]) -> BlockLocator {
        BlockLocator::new(
            heights
                .iter()
                .map(|h| chain.dir_block_hash_at(*h).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_filter() {
        let mut filter = DuplicateFilter::default();
        let a = Hash::new([1u8; 32]);
        let b = Hash::new([2u8; 32]);

        assert!(filter.accept(Some(&a), &Hash::zero()));
        assert!(!filter.accept(Some(&a), &Hash::zero()));
        assert!(filter.accept(Some(&a), &b));
        assert!(filter.accept(Some(&a), &Hash::zero()));

        assert!(filter.accept(None, &Hash::zero()));
        assert!(filter.accept(None, &Hash::zero()));
        assert!(filter.accept(Some(&a), &Hash::zero()));
    }

    #[test]
    fn test_start_follows_first_known_locator_hash() {
        let chain = chain_of(20);
        let unknown = Hash::new([0xee; 32]);
        let mut hashes = vec![unknown];
        hashes.extend(locator_at(&chain, &[7, 3]).hashes());
        let locator = BlockLocator::new(hashes).unwrap();

        let batch = resolve_range(&chain, &locator, &Hash::zero(), 500);
        assert_eq!(batch.start, 8);
        assert_eq!(batch.end, 20);
        assert!(!batch.truncated);
    }

    #[test]
    fn test_unknown_locator_restarts_after_genesis() {
        let chain = chain_of(10);
        let locator = BlockLocator::new(vec![Hash::new([0xab; 32])]).unwrap();
        let batch = resolve_range(&chain, &locator, &Hash::zero(), 500);
        assert_eq!(batch.start, 1);

        let batch = resolve_range(&chain, &BlockLocator::default(), &Hash::zero(), 500);
        assert_eq!(batch.start, 1);
    }

    #[test]
    fn test_stop_hash_bounds_range() {
        let chain = chain_of(30);
        let stop = chain.dir_block_hash_at(12).unwrap();
        let batch = resolve_range(&chain, &locator_at(&chain, &[4]), &stop, 500);
        assert_eq!((batch.start, batch.end), (5, 13));

        let unknown_stop = Hash::new([0x55; 32]);
        let batch = resolve_range(&chain, &BlockLocator::default(), &unknown_stop, 500);
        assert_eq!((batch.start, batch.end), (1, 30));
    }

    #[test]
    fn test_range_is_clamped() {
        let chain = chain_of(50);
        let batch = resolve_range(&chain, &BlockLocator::default(), &Hash::zero(), 10);
        assert_eq!((batch.start, batch.end), (1, 11));
        assert!(batch.truncated);
        assert_eq!(collect_inventory(&chain, &batch).len(), 10);

        let exact = resolve_range(&chain, &locator_at(&chain, &[39]), &Hash::zero(), 10);
        assert_eq!(exact.len(), 10);
        assert!(!exact.truncated);
    }

    #[test]
    fn test_range_behind_locator_is_empty() {
        let chain = chain_of(10);
        let stop = chain.dir_block_hash_at(2).unwrap();
        let batch = resolve_range(&chain, &locator_at(&chain, &[6]), &stop, 500);
        assert!(batch.is_empty());
        assert!(collect_inventory(&chain, &batch).is_empty());
    }

    proptest! {
        #[test]
        fn prop_start_is_locator_height_plus_one(height in 1u64..60, k_seed in 0u64..1000) {
            let chain = chain_of(height);
            let k = k_seed % height;
            let batch = resolve_range(&chain, &locator_at(&chain, &[k]), &Hash::zero(), 500);
            prop_assert_eq!(batch.start, k + 1);
            prop_assert_eq!(batch.end, height);
        }
    }

    #[tokio::test]
    async fn test_truncated_reply_records_continuation() {
        let mut h = Harness::new(40, |c| c.with_max_blocks_per_msg(10));

        h.session
            .handle_get_dir_blocks(BlockLocator::default(), Hash::zero())
            .await
            .unwrap();
        let messages = h.drain().await;

        assert_eq!(messages.len(), 1);
        let Message::DirInv(inv) = &messages[0] else {
            panic!("expected dirinv, got {:?}", messages[0]);
        };
        assert_eq!(inv.len(), 10);
        assert!(inv.items().iter().all(|iv| iv.kind == InvType::DirBlock));
        assert_eq!(inv.items()[0].hash, h.hash_at(1));
        assert_eq!(h.session.continue_hash(), Some(h.hash_at(10)));
    }

    #[tokio::test]
    async fn test_untruncated_reply_has_no_continuation() {
        let mut h = Harness::new(8, |c| c.with_max_blocks_per_msg(10));
        let locator = BlockLocator::new(vec![h.hash_at(2)]).unwrap();

        h.session
            .handle_get_dir_blocks(locator, Hash::zero())
            .await
            .unwrap();
        let messages = h.drain().await;

        let expected: Vec<InventoryVector> =
            (3..8).map(|n| InventoryVector::dir_block(h.hash_at(n))).collect();
        assert_eq!(
            messages,
            vec![Message::DirInv(InvList::from_vec(expected).unwrap())]
        );
        assert!(h.session.continue_hash().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_request_is_dropped() {
        let mut h = Harness::new(20, |c| c);
        let locator = BlockLocator::new(vec![h.hash_at(4)]).unwrap();

        h.session
            .handle_get_dir_blocks(locator.clone(), Hash::zero())
            .await
            .unwrap();
        h.session
            .handle_get_dir_blocks(locator.clone(), Hash::zero())
            .await
            .unwrap();
        assert_eq!(h.drain().await.len(), 1);

        let stop = h.hash_at(10);
        h.session
            .handle_get_dir_blocks(locator, stop)
            .await
            .unwrap();
        assert_eq!(h.drain().await.len(), 1);
    }

    #[tokio::test]
    async fn test_caught_up_peer_gets_nothing() {
        let mut h = Harness::new(5, |c| c);
        let locator = BlockLocator::new(vec![h.hash_at(4)]).unwrap();
        h.session
            .handle_get_dir_blocks(locator, Hash::zero())
            .await
            .unwrap();
        assert!(h.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_push_get_dir_blocks_filters_repeats() {
        let mut h = Harness::new(5, |c| c);
        let locator = BlockLocator::from_chain(h.chain.as_ref());

        h.session
            .push_get_dir_blocks(locator.clone(), Hash::zero())
            .await
            .unwrap();
        h.session
            .push_get_dir_blocks(locator.clone(), Hash::zero())
            .await
            .unwrap();

        assert_eq!(
            h.drain().await,
            vec![Message::get_dir_blocks(locator, Hash::zero())]
        );
    }
}
