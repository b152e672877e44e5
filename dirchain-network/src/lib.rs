//! Directory block synchronization protocol
//!
//! This crate implements the peer-to-peer side of directory chain sync:
//! inventory exchange, historical range requests driven by block locators,
//! and windowed streaming of block payloads through a per-peer outbound
//! queue.

pub mod codec;
pub mod config;
pub mod error;
pub mod exchange;
pub mod fanout;
pub mod known;
pub mod message;
pub mod pipeline;
pub mod session;
pub mod sync;
pub mod window;

#[cfg(test)]
mod testing;

pub use codec::MessageCodec;
pub use config::SyncConfig;
pub use error::{NetworkError, NetworkResult};
pub use message::{InvList, Message};
pub use pipeline::{completion, spawn_writer, Completion, DoneSignal, OutboundQueue};
pub use session::{serve_connection, BlockManagerEvent, BlockManagerSender, PeerSession};
pub use window::SendWindow;

/// Re-export commonly used types
pub use libp2p::PeerId;
