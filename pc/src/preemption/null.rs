//! Preemption API for tasks no master manages

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{PreemptMode, Preemption, PreemptionError};
use crate::dist::DistributedContext;

/// A [`Preemption`] that never contacts a master and never says yes
///
/// Broadcast participation under [`PreemptMode::WorkersAskChief`] is kept,
/// and so is the ChiefOnly check, so code written against the managed
/// coordinator behaves the same when run unmanaged.
pub struct NullCoordinator {
    dist: Arc<dyn DistributedContext>,
    mode: PreemptMode,
    started: bool,
}

impl NullCoordinator {
    pub fn new(dist: Arc<dyn DistributedContext>, mode: PreemptMode) -> Self {
        debug!(rank = dist.rank(), %mode, "NullCoordinator::new: called");
        Self {
            dist,
            mode,
            started: false,
        }
    }
}

#[async_trait]
impl Preemption for NullCoordinator {
    fn mode(&self) -> PreemptMode {
        self.mode
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn is_managed(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), PreemptionError> {
        if self.started {
            return Err(PreemptionError::AlreadyStarted);
        }
        self.started = true;
        Ok(())
    }

    async fn close(&mut self) {}

    async fn should_preempt(&mut self, _auto_ack: bool) -> Result<bool, PreemptionError> {
        if !self.started {
            return Err(PreemptionError::NotStarted);
        }

        let rank = self.dist.rank();
        if rank == 0 {
            if self.mode.broadcasts() {
                self.dist.broadcast(Some(false)).await?;
            }
        } else {
            if self.mode == PreemptMode::ChiefOnly {
                return Err(PreemptionError::ChiefOnly { rank });
            }
            if self.mode.broadcasts() {
                self.dist.broadcast(None).await?;
            }
        }
        Ok(false)
    }

    async fn acknowledge_preemption_signal(&self) -> Result<(), PreemptionError> {
        Ok(())
    }
}
