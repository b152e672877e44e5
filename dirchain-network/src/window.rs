//! Windowed flow control for streamed responses
//!
//! While streaming `N` items a completion signal rides on every
//! `checkpoint_interval`-th item and always on the last one. Each
//! signal-bearing send holds a [`WindowSlot`] until the write task has put
//! it on the wire, so at most `capacity` of them are ever outstanding.

use crate::{NetworkError, NetworkResult, SyncConfig};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Credit held by a queued signal-bearing message; released on transmit
#[derive(Debug)]
pub struct WindowSlot {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug)]
pub struct SendWindow {
    permits: Arc<Semaphore>,
    capacity: usize,
    checkpoint_interval: usize,
    total: usize,
    signals_issued: usize,
}

impl SendWindow {
    pub fn new(total: usize, capacity: usize, checkpoint_interval: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            checkpoint_interval: checkpoint_interval.max(1),
            total,
            signals_issued: 0,
        }
    }

    pub fn from_config(total: usize, config: &SyncConfig) -> Self {
        Self::new(total, config.flow_control_window, config.checkpoint_interval)
    }

    /// Whether item `index` (zero based) carries a completion signal
    pub fn is_checkpoint(&self, index: usize) -> bool {
        index + 1 == self.total || (index + 1) % self.checkpoint_interval == 0
    }

    /// Wait for a free slot. Call after the payload has been fetched.
    pub async fn acquire(&mut self) -> NetworkResult<WindowSlot> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| NetworkError::Sync("send window closed".to_string()))?;
        self.signals_issued += 1;
        Ok(WindowSlot { _permit: permit })
    }

    /// Signal-bearing sends queued but not yet transmitted
    pub fn outstanding(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    pub fn signals_issued(&self) -> usize {
        self.signals_issued
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use proptest::prelude::*;

    #[test]
    fn test_checkpoint_schedule() {
        let window = SendWindow::new(7, 3, 3);
        let checkpoints: Vec<usize> = (0..7).filter(|i| window.is_checkpoint(*i)).collect();
        assert_eq!(checkpoints, vec![2, 5, 6]);

        let window = SendWindow::new(1, 3, 3);
        assert!(window.is_checkpoint(0));
    }

    #[tokio::test]
    async fn test_window_blocks_at_capacity() {
        let mut window = SendWindow::new(10, 3, 3);
        let a = window.acquire().await.unwrap();
        let _b = window.acquire().await.unwrap();
        let _c = window.acquire().await.unwrap();
        assert_eq!(window.outstanding(), 3);

        assert!(window.acquire().now_or_never().is_none());

        drop(a);
        assert_eq!(window.outstanding(), 2);
        let _d = window.acquire().now_or_never().unwrap().unwrap();
        assert_eq!(window.outstanding(), 3);
        assert_eq!(window.signals_issued(), 4);
    }

    proptest! {
        #[test]
        fn prop_signals_are_ceil_n_over_three(total in 1usize..2000) {
            let window = SendWindow::new(total, 3, 3);
            let signals = (0..total).filter(|i| window.is_checkpoint(*i)).count();
            prop_assert_eq!(signals, total.div_ceil(3));
            prop_assert!(window.is_checkpoint(total - 1));
        }
    }
}
