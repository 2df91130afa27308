//! Preemption error types

use thiserror::Error;

use crate::dist::BroadcastError;
use crate::master::SignalError;
use crate::watcher::WatcherError;

/// Errors returned by [`Preemption`](super::Preemption) operations
///
/// Lifecycle and mode violations are programming errors in the caller;
/// network trouble while polling never surfaces here.
#[derive(Debug, Error)]
pub enum PreemptionError {
    #[error("you cannot call Preemption::start() multiple times")]
    AlreadyStarted,

    #[error("you cannot call Preemption::should_preempt() before Preemption::start()")]
    NotStarted,

    #[error(
        "Preemption was configured with preempt_mode=ChiefOnly but should_preempt() was called from non-chief worker of rank={rank}"
    )]
    ChiefOnly { rank: usize },

    #[error("configured rank={configured} does not match the group's rank={actual}")]
    RankMismatch { configured: usize, actual: usize },

    #[error("Broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("Master error: {0}")]
    Master(#[from] SignalError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] WatcherError),
}

impl PreemptionError {
    /// Check if this error is caller misuse rather than a runtime failure
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            PreemptionError::AlreadyStarted
                | PreemptionError::NotStarted
                | PreemptionError::ChiefOnly { .. }
                | PreemptionError::RankMismatch { .. }
        )
    }
}
