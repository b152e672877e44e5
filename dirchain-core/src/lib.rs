//! Core directory chain data structures
//!
//! This crate provides the building blocks shared by the sync protocol:
//! - The `Hash` digest type and SHA-256 / truncated SHA-512 hashing
//! - Inventory vectors and block locators
//! - Directory and entry credit blocks with binary marshaling
//! - The `BlockStore` lookup trait and an in-memory `LocalChain`

pub mod block;
pub mod chain;
pub mod error;
pub mod inventory;
pub mod locator;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export commonly used types
pub use block::*;
pub use chain::*;
pub use error::*;
pub use inventory::*;
pub use locator::*;
pub use types::*;
