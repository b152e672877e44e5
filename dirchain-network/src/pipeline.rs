//! Outbound delivery pipeline
//!
//! Every peer has one [`OutboundQueue`] feeding a single write task. The
//! task transmits in FIFO order and, after transmitting a message queued
//! with a [`DoneSignal`], fires that signal exactly once with the result.
//! Completion means the message left the queue, not that the remote peer
//! acknowledged it.
//!
//! When the write task stops, every entry still queued is dropped, which
//! resolves its [`Completion`] with [`NetworkError::PeerDisconnected`].

use crate::message::Message;
use crate::window::WindowSlot;
use crate::{NetworkError, NetworkResult};
use futures::{Sink, SinkExt};
use libp2p::PeerId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Sending half of a completion pair, handed to the write task
#[derive(Debug)]
pub struct DoneSignal {
    tx: oneshot::Sender<NetworkResult<()>>,
}

impl DoneSignal {
    fn fire(self, result: NetworkResult<()>) {
        // The waiter may have given up; nothing to do then.
        let _ = self.tx.send(result);
    }
}

/// Resolves once the associated message has been written or dropped
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<NetworkResult<()>>,
}

impl Completion {
    pub async fn wait(self) -> NetworkResult<()> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::PeerDisconnected(
                "outbound queue closed before delivery".to_string(),
            )),
        }
    }
}

/// Create a linked signal / completion pair
pub fn completion() -> (DoneSignal, Completion) {
    let (tx, rx) = oneshot::channel();
    (DoneSignal { tx }, Completion { rx })
}

#[derive(Debug)]
enum Outbound {
    Message {
        message: Message,
        done: Option<DoneSignal>,
        slot: Option<WindowSlot>,
    },
    /// Fires once everything queued before it has been written
    Flush(DoneSignal),
}

/// Cloneable handle used by producers to queue messages for one peer
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    peer: PeerId,
    tx: mpsc::Sender<Outbound>,
    sent: Arc<AtomicU64>,
}

/// Consumer half, driven by [`run_writer`]
#[derive(Debug)]
pub struct OutboundReceiver {
    peer: PeerId,
    rx: mpsc::Receiver<Outbound>,
    sent: Arc<AtomicU64>,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` pending entries
    pub fn new(peer: PeerId, capacity: usize) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sent = Arc::new(AtomicU64::new(0));
        (
            Self {
                peer,
                tx,
                sent: Arc::clone(&sent),
            },
            OutboundReceiver { peer, rx, sent },
        )
    }

    /// Queue a message, optionally with a signal fired after it is written
    pub async fn queue_message(
        &self,
        message: Message,
        done: Option<DoneSignal>,
    ) -> NetworkResult<()> {
        self.queue_with_slot(message, done, None).await
    }

    pub(crate) async fn queue_with_slot(
        &self,
        message: Message,
        done: Option<DoneSignal>,
        slot: Option<WindowSlot>,
    ) -> NetworkResult<()> {
        self.push(Outbound::Message {
            message,
            done,
            slot,
        })
        .await
    }

    /// Queue a message and wait until it has been written
    pub async fn send(&self, message: Message) -> NetworkResult<()> {
        let (signal, completion) = completion();
        self.queue_message(message, Some(signal)).await?;
        completion.wait().await
    }

    /// Wait until everything queued so far has been written
    pub async fn flush(&self) -> NetworkResult<()> {
        let (signal, completion) = completion();
        self.push(Outbound::Flush(signal)).await?;
        completion.wait().await
    }

    async fn push(&self, entry: Outbound) -> NetworkResult<()> {
        // A rejected entry is dropped here, which resolves its completion.
        self.tx.send(entry).await.map_err(|_| {
            NetworkError::PeerDisconnected(format!("write path for {} is closed", self.peer))
        })
    }

    /// Entries queued but not yet taken by the write task
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Messages written to the wire so far
    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Drain `receiver` into `sink` until every queue handle is dropped.
///
/// A transmit failure resolves the failing message's signal with an error
/// and stops the writer; the remaining entries are dropped with it.
pub async fn run_writer<S>(mut receiver: OutboundReceiver, mut sink: S) -> NetworkResult<()>
where
    S: Sink<Message, Error = NetworkError> + Unpin,
{
    while let Some(entry) = receiver.rx.recv().await {
        let (message, done, slot) = match entry {
            Outbound::Message {
                message,
                done,
                slot,
            } => (message, done, slot),
            Outbound::Flush(done) => {
                done.fire(Ok(()));
                continue;
            }
        };

        let command = message.command();
        let result = sink.send(message).await;
        drop(slot);

        match result {
            Ok(()) => {
                receiver.sent.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(peer = %receiver.peer, command, "Sent message");
                if let Some(done) = done {
                    done.fire(Ok(()));
                }
            }
            Err(e) => {
                tracing::warn!(peer = %receiver.peer, command, error = %e, "Failed to send message");
                if let Some(done) = done {
                    done.fire(Err(NetworkError::PeerDisconnected(format!(
                        "failed to send {}: {}",
                        command, e
                    ))));
                }
                return Err(e);
            }
        }
    }

    tracing::debug!(peer = %receiver.peer, "Outbound queue closed");
    sink.close().await
}

/// Spawn [`run_writer`] on the tokio runtime
pub fn spawn_writer<S>(receiver: OutboundReceiver, sink: S) -> JoinHandle<NetworkResult<()>>
where
    S: Sink<Message, Error = NetworkError> + Unpin + Send + 'static,
{
    tokio::spawn(run_writer(receiver, sink))
}
