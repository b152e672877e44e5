//! Sync protocol configuration

use crate::message::limits;
use crate::{NetworkError, NetworkResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum directory block hashes advertised per range reply
    pub max_blocks_per_msg: usize,

    /// Maximum signal-bearing sends outstanding while streaming
    pub flow_control_window: usize,

    /// A completion signal is attached to every n-th streamed item
    pub checkpoint_interval: usize,

    /// Capacity of each peer's outbound message queue
    pub outbound_queue_capacity: usize,

    /// Inventory remembered per peer to avoid re-advertising
    pub max_known_inventory: usize,

    /// Maximum encoded frame size
    pub max_message_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_blocks_per_msg: limits::MAX_BLOCKS_PER_MSG,
            flow_control_window: limits::FLOW_CONTROL_WINDOW,
            checkpoint_interval: limits::FLOW_CONTROL_WINDOW,
            outbound_queue_capacity: 256,
            max_known_inventory: 1000,
            max_message_size: limits::MAX_MESSAGE_SIZE,
        }
    }
}

impl SyncConfig {
    /// Create a new sync configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the range reply batch size
    pub fn with_max_blocks_per_msg(mut self, max: usize) -> Self {
        self.max_blocks_per_msg = max;
        self
    }

    /// Set the outbound queue capacity
    pub fn with_outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity;
        self
    }

    /// Set the known inventory cache size
    pub fn with_max_known_inventory(mut self, max: usize) -> Self {
        self.max_known_inventory = max;
        self
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(input: &str) -> NetworkResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> NetworkResult<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Validate configuration
    pub fn validate(&self) -> NetworkResult<()> {
        if self.max_blocks_per_msg == 0 || self.max_blocks_per_msg > limits::MAX_INV_PER_MSG {
            return Err(NetworkError::Config(format!(
                "max_blocks_per_msg must be within 1..={}",
                limits::MAX_INV_PER_MSG
            )));
        }

        if self.flow_control_window == 0 || self.checkpoint_interval == 0 {
            return Err(NetworkError::Config(
                "Flow control window and checkpoint interval must be greater than 0".to_string(),
            ));
        }

        if self.outbound_queue_capacity == 0 {
            return Err(NetworkError::Config(
                "Outbound queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_message_size < 1024 {
            return Err(NetworkError::Config(
                "Maximum message size must be at least 1 KiB".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_blocks_per_msg, 500);
        assert_eq!(config.flow_control_window, 3);
        assert_eq!(config.checkpoint_interval, 3);
    }

    #[test]
    fn test_config_builder() {
        let config = SyncConfig::new()
            .with_max_blocks_per_msg(16)
            .with_outbound_queue_capacity(8);

        assert_eq!(config.max_blocks_per_msg, 16);
        assert_eq!(config.outbound_queue_capacity, 8);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        config.max_blocks_per_msg = 0;
        assert!(config.validate().is_err());

        config.max_blocks_per_msg = 10;
        config.flow_control_window = 0;
        assert!(config.validate().is_err());

        config.flow_control_window = 3;
        config.outbound_queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_fills_defaults() {
        let config = SyncConfig::from_toml_str("max_blocks_per_msg = 64\n").unwrap();
        assert_eq!(config.max_blocks_per_msg, 64);
        assert_eq!(config.max_known_inventory, 1000);

        assert!(SyncConfig::from_toml_str("max_blocks_per_msg = 0\n").is_err());
        assert!(SyncConfig::from_toml_str("max_blocks_per_msg = \"many\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "outbound_queue_capacity = 32").unwrap();
        writeln!(file, "max_known_inventory = 50").unwrap();

        let config = SyncConfig::load(file.path()).unwrap();
        assert_eq!(config.outbound_queue_capacity, 32);
        assert_eq!(config.max_known_inventory, 50);
    }
}
