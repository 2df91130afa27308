//! Watcher module for the master's preemption signal
//!
//! The SignalWatcher long-polls the master from a background task and
//! publishes what it learns through a monotonic tri-state, so the training
//! loop can check for preemption without waiting on the network.

mod config;
mod error;
mod signal_watcher;
mod state;

pub use config::WatcherConfig;
pub use error::WatcherError;
pub use signal_watcher::SignalWatcher;
pub use state::{PreemptState, SignalState};
