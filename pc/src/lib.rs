//! Preemption - preemption-signal coordination for distributed training
//!
//! A fleet of cooperating worker processes (rank 0 is the "chief") learns,
//! with one consistent decision across the fleet, that the scheduler wants
//! the task to yield its resources, and tells the master it is exiting due
//! to preemption so the task gets rescheduled instead of marked complete.
//!
//! # Modules
//!
//! - [`watcher`] - Background long-poll of the preemption signal
//! - [`preemption`] - Coordinator, null coordinator and synchronization modes
//! - [`master`] - Control-plane client trait and HTTP implementation
//! - [`dist`] - Rank provider and broadcast barrier
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use preemption::{Config, LocalGroup, create_preemption};
//!
//! let config = Config::load(None)?;
//! let mut preemption = create_preemption(&config, Arc::new(LocalGroup::single()))?;
//! preemption.start()?;
//! for step in 0..steps {
//!     train_step(step);
//!     if preemption.should_preempt(true).await? {
//!         save_checkpoint(step);
//!         break;
//!     }
//! }
//! preemption.close().await;
//! ```

pub mod cli;
pub mod config;
pub mod dist;
pub mod master;
pub mod preemption;
pub mod watcher;

// Re-export commonly used types
pub use config::{Config, MasterConfig};
pub use dist::{BroadcastError, DistributedContext, LocalContext, LocalGroup};
pub use master::{ControlPlane, HttpControlPlane, SignalError};
pub use preemption::{
    NullCoordinator, PreemptMode, Preemption, PreemptionCoordinator, PreemptionError, create_preemption,
};
pub use watcher::{PreemptState, SignalState, SignalWatcher, WatcherConfig, WatcherError};
