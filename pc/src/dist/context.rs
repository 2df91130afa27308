//! DistributedContext trait definition

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the broadcast barrier
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("Broadcast group closed")]
    Closed,

    #[error("Rank {rank} fell {skipped} broadcasts behind the chief")]
    Lagged { rank: usize, skipped: u64 },

    #[error("Chief must supply a value to broadcast")]
    MissingValue,
}

/// This process's place in the worker group
///
/// `broadcast` is collective and blocking: every rank must call it once per
/// logical step, in the same order, or the others wait forever.
#[async_trait]
pub trait DistributedContext: Send + Sync {
    /// Position in the worker group; rank 0 is the chief
    fn rank(&self) -> usize;

    /// Number of ranks in the group
    fn size(&self) -> usize;

    fn is_chief(&self) -> bool {
        self.rank() == 0
    }

    /// Send the chief's value to every rank
    ///
    /// The chief passes `Some(value)`; other ranks pass `None`. Every rank,
    /// the chief included, gets back the chief's value.
    async fn broadcast(&self, value: Option<bool>) -> Result<bool, BroadcastError>;
}
