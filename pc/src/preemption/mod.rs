//! Preemption API for distributed training tasks
//!
//! Two implementations of one [`Preemption`] trait, chosen at construction:
//! [`PreemptionCoordinator`] for tasks a master manages, and
//! [`NullCoordinator`] for unmanaged runs. Both synchronize ranks the same
//! way for a given [`PreemptMode`].

use std::sync::Arc;

use tracing::debug;

mod coordinator;
mod error;
mod mode;
mod null;
mod traits;

pub use coordinator::PreemptionCoordinator;
pub use error::PreemptionError;
pub use mode::PreemptMode;
pub use null::NullCoordinator;
pub use traits::Preemption;

use crate::config::Config;
use crate::dist::DistributedContext;
use crate::master::{HttpControlPlane, SignalError};

/// Create the Preemption implementation that matches the configuration
///
/// Managed tasks get a [`PreemptionCoordinator`] talking to the configured
/// master over HTTP; unmanaged ones get a [`NullCoordinator`]. The configured
/// rank must match the rank the group assigned to this process.
pub fn create_preemption(
    config: &Config,
    dist: Arc<dyn DistributedContext>,
) -> Result<Box<dyn Preemption>, PreemptionError> {
    debug!(managed = config.managed, mode = %config.mode, rank = dist.rank(), "create_preemption: called");
    if config.rank != dist.rank() {
        return Err(PreemptionError::RankMismatch {
            configured: config.rank,
            actual: dist.rank(),
        });
    }
    if !config.managed {
        return Ok(Box::new(NullCoordinator::new(dist, config.mode)));
    }

    if config.allocation_id.is_empty() {
        return Err(SignalError::NotConfigured("allocation id is empty".to_string()).into());
    }
    let master = Arc::new(HttpControlPlane::from_config(&config.master)?);
    Ok(Box::new(PreemptionCoordinator::new(
        master,
        config.allocation_id.clone(),
        dist,
        config.mode,
        config.watcher.clone(),
    )))
}
