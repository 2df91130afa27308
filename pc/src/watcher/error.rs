//! Watcher error types

use thiserror::Error;

/// Misuse of the SignalWatcher lifecycle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatcherError {
    #[error("SignalWatcher::start() cannot be called more than once")]
    AlreadyStarted,

    #[error("SignalWatcher::should_preempt() called before start()")]
    NotStarted,
}
