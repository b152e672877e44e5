//! Network error types

use dirchain_core::CoreError;
use thiserror::Error;

pub type NetworkResult<T> = Result<T, NetworkError>;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Message encoding error: {0}")]
    Encoding(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Peer disconnected: {0}")]
    PeerDisconnected(String),

    #[error("Message too large: {size} exceeds {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Inventory list exceeds {max} entries")]
    TooManyInventory { max: usize },

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::error::EncodeError> for NetworkError {
    fn from(err: bincode::error::EncodeError) -> Self {
        NetworkError::Encoding(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for NetworkError {
    fn from(err: bincode::error::DecodeError) -> Self {
        NetworkError::Encoding(err.to_string())
    }
}

impl From<toml::de::Error> for NetworkError {
    fn from(err: toml::de::Error) -> Self {
        NetworkError::Config(err.to_string())
    }
}
