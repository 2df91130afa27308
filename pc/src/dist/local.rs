//! In-process broadcast group over tokio channels

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use super::{BroadcastError, DistributedContext};

/// Broadcasts the chief may run ahead of the slowest worker
const CHANNEL_CAPACITY: usize = 1024;

/// Builder for a group of [`LocalContext`]s sharing one broadcast channel
pub struct LocalGroup;

impl LocalGroup {
    /// Create contexts for ranks `0..size`
    ///
    /// Receivers are subscribed up front, so no broadcast is missed by a rank
    /// that starts late.
    pub fn new(size: usize) -> Vec<LocalContext> {
        debug!(size, "LocalGroup::new: called");
        let size = size.max(1);
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        let mut contexts = Vec::with_capacity(size);
        for rank in 1..size {
            contexts.push(LocalContext {
                rank,
                size,
                tx: None,
                rx: Some(Mutex::new(tx.subscribe())),
                broadcasts: AtomicUsize::new(0),
            });
        }
        contexts.insert(
            0,
            LocalContext {
                rank: 0,
                size,
                tx: Some(tx),
                rx: None,
                broadcasts: AtomicUsize::new(0),
            },
        );
        contexts
    }

    /// A group of one: this process is the chief and broadcasts are local
    pub fn single() -> LocalContext {
        let mut contexts = Self::new(1);
        contexts.remove(0)
    }
}

/// One rank's view of a [`LocalGroup`]
pub struct LocalContext {
    rank: usize,
    size: usize,
    tx: Option<broadcast::Sender<bool>>,
    rx: Option<Mutex<broadcast::Receiver<bool>>>,
    broadcasts: AtomicUsize,
}

impl LocalContext {
    /// Number of broadcast calls this rank has made
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DistributedContext for LocalContext {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn broadcast(&self, value: Option<bool>) -> Result<bool, BroadcastError> {
        debug!(rank = self.rank, ?value, "LocalContext::broadcast: called");
        self.broadcasts.fetch_add(1, Ordering::SeqCst);

        if let Some(tx) = &self.tx {
            let value = value.ok_or(BroadcastError::MissingValue)?;
            if self.size > 1 && tx.send(value).is_err() {
                return Err(BroadcastError::Closed);
            }
            return Ok(value);
        }

        let Some(rx) = &self.rx else {
            return Err(BroadcastError::Closed);
        };
        let mut rx = rx.lock().await;
        match rx.recv().await {
            Ok(value) => Ok(value),
            Err(broadcast::error::RecvError::Closed) => Err(BroadcastError::Closed),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(BroadcastError::Lagged {
                rank: self.rank,
                skipped,
            }),
        }
    }
}
