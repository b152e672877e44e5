//! Per-peer protocol session
//!
//! A [`PeerSession`] owns everything one connection needs on its receive
//! path: the outbound queue handle, the continuation marker and duplicate
//! filters, and the known-inventory cache. The node's chain and block
//! manager are injected; no state is shared between sessions.

use crate::codec::MessageCodec;
use crate::known::KnownInventory;
use crate::message::{InvList, Message};
use crate::pipeline::{spawn_writer, OutboundQueue};
use crate::sync::DuplicateFilter;
use crate::{NetworkError, NetworkResult, SyncConfig};
use dirchain_core::{DirectoryBlock, EntryCreditBlock, Hash, SharedBlockStore};
use futures::{Stream, StreamExt};
use libp2p::PeerId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

/// Events handed to the node's block manager for acceptance decisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockManagerEvent {
    DirInv {
        peer: PeerId,
        inventory: InvList,
    },
    DirBlock {
        peer: PeerId,
        block: Box<DirectoryBlock>,
    },
    EntryCreditBlock {
        peer: PeerId,
        block: Box<EntryCreditBlock>,
    },
    NotFound {
        peer: PeerId,
        inventory: InvList,
    },
}

pub type BlockManagerSender = mpsc::UnboundedSender<BlockManagerEvent>;

pub struct PeerSession {
    pub(crate) peer: PeerId,
    pub(crate) chain: SharedBlockStore,
    pub(crate) config: SyncConfig,
    pub(crate) outbound: OutboundQueue,
    pub(crate) block_manager: BlockManagerSender,
    pub(crate) known_inventory: KnownInventory,
    /// Last hash of a truncated range reply still waiting to be requested
    pub(crate) continue_hash: Option<Hash>,
    /// Filters retransmitted `GetDirBlocks` received from the peer
    pub(crate) inbound_range_filter: DuplicateFilter,
    /// Filters back-to-back duplicate `GetDirBlocks` we send
    pub(crate) outbound_range_filter: DuplicateFilter,
}

impl PeerSession {
    pub fn new(
        peer: PeerId,
        chain: SharedBlockStore,
        config: SyncConfig,
        outbound: OutboundQueue,
        block_manager: BlockManagerSender,
    ) -> Self {
        let known_inventory = KnownInventory::new(config.max_known_inventory);
        Self {
            peer,
            chain,
            config,
            outbound,
            block_manager,
            known_inventory,
            continue_hash: None,
            inbound_range_filter: DuplicateFilter::default(),
            outbound_range_filter: DuplicateFilter::default(),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn continue_hash(&self) -> Option<Hash> {
        self.continue_hash
    }

    pub fn known_inventory(&self) -> &KnownInventory {
        &self.known_inventory
    }

    /// Dispatch one inbound message to its handler
    pub async fn handle_message(&mut self, message: Message) -> NetworkResult<()> {
        tracing::trace!(peer = %self.peer, command = message.command(), "Received message");
        match message {
            Message::GetDirData(inventory) => self.handle_get_dir_data(inventory).await,
            Message::GetNonDirData(inventory) => self.handle_get_non_dir_data(inventory).await,
            Message::GetDirBlocks { locator, hash_stop } => {
                self.handle_get_dir_blocks(locator, hash_stop).await
            }
            Message::DirInv(inventory) => self.handle_dir_inv(inventory),
            Message::DirBlock(block) => self.handle_dir_block(*block).await,
            Message::EntryCreditBlock(block) => self.handle_ec_block(*block),
            Message::NotFound(inventory) => self.handle_not_found(inventory),
        }
    }

    pub(crate) fn forward(&self, event: BlockManagerEvent) -> NetworkResult<()> {
        self.block_manager
            .send(event)
            .map_err(|_| NetworkError::Sync("block manager is not running".to_string()))
    }

    /// Process inbound messages until the stream ends or the write path
    /// goes away. Handler errors other than a lost connection are logged
    /// and the session carries on.
    pub async fn run<St>(mut self, mut inbound: St) -> NetworkResult<()>
    where
        St: Stream<Item = NetworkResult<Message>> + Unpin,
    {
        tracing::debug!(peer = %self.peer, "Peer session started");
        while let Some(frame) = inbound.next().await {
            let message = frame?;
            let command = message.command();
            match self.handle_message(message).await {
                Ok(()) => {}
                Err(e @ NetworkError::PeerDisconnected(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(peer = %self.peer, command, error = %e, "Failed to handle message");
                }
            }
        }
        tracing::debug!(peer = %self.peer, "Peer closed its side");
        self.outbound.flush().await
    }
}

/// Run a full session over a byte stream: a framed reader on this task and
/// a write task draining the outbound queue.
pub async fn serve_connection<T>(
    peer: PeerId,
    io: T,
    chain: SharedBlockStore,
    config: SyncConfig,
    block_manager: BlockManagerSender,
) -> NetworkResult<()>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    config.validate()?;
    let (read_half, write_half) = tokio::io::split(io);
    let reader = FramedRead::new(read_half, MessageCodec::new(config.max_message_size));
    let writer = FramedWrite::new(write_half, MessageCodec::new(config.max_message_size));

    let (outbound, receiver) = OutboundQueue::new(peer, config.outbound_queue_capacity);
    let write_task = spawn_writer(receiver, writer);

    let session = PeerSession::new(peer, chain, config, outbound, block_manager);
    let result = session.run(reader).await;

    match write_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(peer = %peer, error = %e, "Write task ended with error"),
        Err(e) => tracing::warn!(peer = %peer, error = %e, "Write task panicked"),
    }
    result
}
