//! Sub-block requests derived from a resolved directory block

use crate::message::{InvList, Message};
use crate::session::PeerSession;
use crate::NetworkResult;
use dirchain_core::{
    DirectoryBlock, InvType, InventoryVector, ADMIN_CHAIN_ID, ENTRY_CREDIT_CHAIN_ID,
    FACTOID_CHAIN_ID,
};

/// Inventory for the non-directory blocks referenced by `block`.
///
/// The admin chain is never requested.
pub fn non_dir_inventory(block: &DirectoryBlock) -> Vec<InventoryVector> {
    block
        .entries
        .iter()
        .filter_map(|entry| {
            let kind = if entry.chain_id == ADMIN_CHAIN_ID {
                return None;
            } else if entry.chain_id == ENTRY_CREDIT_CHAIN_ID {
                InvType::EntryCreditBlock
            } else if entry.chain_id == FACTOID_CHAIN_ID {
                InvType::FactoidBlock
            } else {
                InvType::EntryBlock
            };
            Some(InventoryVector::new(kind, entry.key_mr))
        })
        .collect()
}

impl PeerSession {
    /// Ask the peer for the sub-blocks of a directory block it sent us
    pub async fn push_get_non_dir_data(&mut self, block: &DirectoryBlock) -> NetworkResult<()> {
        let vectors = non_dir_inventory(block);
        if vectors.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            peer = %self.peer,
            height = block.height(),
            count = vectors.len(),
            "Requesting non-directory blocks"
        );
        self.outbound
            .queue_message(Message::GetNonDirData(InvList::from_vec(vectors)?), None)
            .await
    }
}
