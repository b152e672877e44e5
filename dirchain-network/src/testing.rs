//! Session harness for unit tests: a fixture chain, a session whose write
//! task feeds an in-memory wire, and the block manager's event queue.

use crate::message::Message;
use crate::pipeline::{spawn_writer, OutboundQueue};
use crate::session::{BlockManagerEvent, PeerSession};
use crate::{NetworkError, SyncConfig};
use dirchain_core::test_support::chain_of;
use dirchain_core::{BlockStore, Hash, LocalChain};
use futures::channel::mpsc as fmpsc;
use futures::SinkExt;
use libp2p::PeerId;
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) struct Harness {
    pub session: PeerSession,
    pub chain: Arc<LocalChain>,
    pub wire: fmpsc::UnboundedReceiver<Message>,
    pub events: mpsc::UnboundedReceiver<BlockManagerEvent>,
}

impl Harness {
    pub fn new(blocks: u64, configure: impl FnOnce(SyncConfig) -> SyncConfig) -> Self {
        let config = configure(SyncConfig::default());
        let chain = Arc::new(chain_of(blocks));
        let peer = PeerId::random();

        let (outbound, receiver) = OutboundQueue::new(peer, config.outbound_queue_capacity);
        let (wire_tx, wire) = fmpsc::unbounded();
        let sink = wire_tx.sink_map_err(|e| NetworkError::PeerDisconnected(e.to_string()));
        spawn_writer(receiver, sink);

        let (events_tx, events) = mpsc::unbounded_channel();
        let session = PeerSession::new(peer, chain.clone(), config, outbound, events_tx);
        Self {
            session,
            chain,
            wire,
            events,
        }
    }

    pub fn hash_at(&self, height: u64) -> Hash {
        self.chain
            .dir_block_hash_at(height)
            .expect("height within fixture chain")
    }

    /// Everything written to the wire so far
    pub async fn drain(&mut self) -> Vec<Message> {
        self.session
            .outbound()
            .flush()
            .await
            .expect("writer is running");
        let mut messages = Vec::new();
        while let Ok(Some(message)) = self.wire.try_next() {
            messages.push(message);
        }
        messages
    }
}
