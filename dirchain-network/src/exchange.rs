//! Inventory exchange: serving block payloads and routing announcements

use crate::message::{InvList, Message};
use crate::pipeline::{completion, Completion};
use crate::session::{BlockManagerEvent, PeerSession};
use crate::window::{SendWindow, WindowSlot};
use crate::NetworkResult;
use dirchain_core::{DirectoryBlock, EntryCreditBlock, Hash, InvType, InventoryVector};

/// Outcome of pushing one requested item
enum Push {
    Sent(Option<Completion>),
    NotFound,
}

impl PeerSession {
    /// Serve a `GetDirData` request
    pub async fn handle_get_dir_data(&mut self, inventory: InvList) -> NetworkResult<()> {
        self.serve_inventory(inventory).await
    }

    /// Serve a `GetNonDirData` request coming from the peer's fan-out
    pub async fn handle_get_non_dir_data(&mut self, inventory: InvList) -> NetworkResult<()> {
        self.serve_inventory(inventory).await
    }

    /// Stream every resolvable item, then one `NotFound` for the rest.
    ///
    /// Only directory and entry credit blocks are served. Factoid and entry
    /// blocks belong to other services and are skipped without a `NotFound`
    /// entry, as are kinds this node does not know.
    ///
    /// Returns after the last queued message has been written, so the
    /// caller does not read further requests while the peer is still being
    /// fed.
    async fn serve_inventory(&mut self, inventory: InvList) -> NetworkResult<()> {
        let requests: Vec<InventoryVector> = inventory
            .into_items()
            .into_iter()
            .filter(|iv| match iv.kind {
                InvType::DirBlock | InvType::EntryCreditBlock => true,
                InvType::Unknown(code) => {
                    tracing::warn!(peer = %self.peer, code, "Unknown type in inventory request");
                    false
                }
                kind => {
                    tracing::debug!(peer = %self.peer, %kind, "Not serving inventory kind");
                    false
                }
            })
            .collect();

        let mut window = SendWindow::from_config(requests.len(), &self.config);
        let mut not_found = InvList::new();
        let mut last_completion = None;

        for (index, iv) in requests.iter().enumerate() {
            let checkpoint = window.is_checkpoint(index);
            let push = if iv.kind == InvType::DirBlock {
                self.push_dir_block(&iv.hash, &mut window, checkpoint).await?
            } else {
                self.push_ec_block(&iv.hash, &mut window, checkpoint).await?
            };

            match push {
                Push::Sent(Some(done)) => last_completion = Some(done),
                Push::Sent(None) => {}
                Push::NotFound => not_found.add(*iv)?,
            }
        }

        if !not_found.is_empty() {
            tracing::debug!(peer = %self.peer, missing = not_found.len(), "Sending notfound");
            let (signal, done) = completion();
            self.outbound
                .queue_message(Message::NotFound(not_found), Some(signal))
                .await?;
            last_completion = Some(done);
        }

        match last_completion {
            Some(done) => done.wait().await,
            None => Ok(()),
        }
    }

    /// Queue `message`, attaching a completion when it holds a window slot
    async fn queue_checkpointed(
        &self,
        message: Message,
        slot: Option<WindowSlot>,
    ) -> NetworkResult<Option<Completion>> {
        match slot {
            Some(slot) => {
                let (signal, done) = completion();
                self.outbound
                    .queue_with_slot(message, Some(signal), Some(slot))
                    .await?;
                Ok(Some(done))
            }
            None => {
                self.outbound.queue_message(message, None).await?;
                Ok(None)
            }
        }
    }

    async fn push_dir_block(
        &mut self,
        hash: &Hash,
        window: &mut SendWindow,
        checkpoint: bool,
    ) -> NetworkResult<Push> {
        let Some(block) = self.chain.fetch_dir_block_by_hash(hash) else {
            tracing::trace!(peer = %self.peer, %hash, "Unable to fetch requested dir block");
            return Ok(Push::NotFound);
        };

        let continuing = self.continue_hash.as_ref() == Some(hash);
        let follow_up = if continuing {
            self.next_dir_block_hash(hash)
        } else {
            None
        };

        // Payload is in hand; only now wait for room in the window.
        let slot = if checkpoint {
            Some(window.acquire().await?)
        } else {
            None
        };

        let done = match follow_up {
            Some(next) => {
                // The signal moves to the inventory sent right after.
                self.outbound
                    .queue_message(Message::dir_block(block), None)
                    .await?;
                tracing::debug!(peer = %self.peer, %next, "Advertising next batch start");
                let inv = InvList::single(InventoryVector::dir_block(next));
                self.queue_checkpointed(Message::DirInv(inv), slot).await?
            }
            None => {
                self.queue_checkpointed(Message::dir_block(block), slot)
                    .await?
            }
        };

        if continuing {
            self.continue_hash = None;
        }
        Ok(Push::Sent(done))
    }

    async fn push_ec_block(
        &mut self,
        hash: &Hash,
        window: &mut SendWindow,
        checkpoint: bool,
    ) -> NetworkResult<Push> {
        let Some(block) = self.chain.fetch_ec_block_by_hash(hash) else {
            tracing::trace!(peer = %self.peer, %hash, "Unable to fetch requested entry credit block");
            return Ok(Push::NotFound);
        };

        let slot = if checkpoint {
            Some(window.acquire().await?)
        } else {
            None
        };
        let done = self
            .queue_checkpointed(Message::entry_credit_block(block), slot)
            .await?;
        Ok(Push::Sent(done))
    }

    /// Hand an inventory announcement to the block manager
    pub fn handle_dir_inv(&mut self, inventory: InvList) -> NetworkResult<()> {
        for iv in inventory.items() {
            self.known_inventory.add(*iv);
        }
        self.forward(BlockManagerEvent::DirInv {
            peer: self.peer,
            inventory,
        })
    }

    /// A directory block arrived: remember it, pass it on, and request
    /// its sub-blocks
    pub async fn handle_dir_block(&mut self, block: DirectoryBlock) -> NetworkResult<()> {
        let hash = block.hash()?;
        tracing::debug!(peer = %self.peer, %hash, height = block.height(), "Received dir block");
        self.known_inventory.add(InventoryVector::dir_block(hash));

        self.push_get_non_dir_data(&block).await?;
        self.forward(BlockManagerEvent::DirBlock {
            peer: self.peer,
            block: Box::new(block),
        })
    }

    pub fn handle_ec_block(&mut self, block: EntryCreditBlock) -> NetworkResult<()> {
        let hash = block.hash()?;
        tracing::debug!(peer = %self.peer, %hash, "Received entry credit block");
        self.known_inventory
            .add(InventoryVector::entry_credit_block(hash));
        self.forward(BlockManagerEvent::EntryCreditBlock {
            peer: self.peer,
            block: Box::new(block),
        })
    }

    pub fn handle_not_found(&mut self, inventory: InvList) -> NetworkResult<()> {
        tracing::debug!(peer = %self.peer, count = inventory.len(), "Peer reported notfound");
        self.forward(BlockManagerEvent::NotFound {
            peer: self.peer,
            inventory,
        })
    }

    /// Advertise inventory the peer is not already known to have.
    /// Returns the number of vectors sent.
    pub async fn queue_inventory(&mut self, vectors: &[InventoryVector]) -> NetworkResult<usize> {
        let mut fresh = InvList::new();
        for iv in vectors {
            if self.known_inventory.add(*iv) {
                fresh.add(*iv)?;
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }
        let count = fresh.len();
        self.outbound
            .queue_message(Message::DirInv(fresh), None)
            .await?;
        Ok(count)
    }
}
