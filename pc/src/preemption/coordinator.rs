//! Preemption coordinator backed by the master

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{PreemptMode, Preemption, PreemptionError};
use crate::dist::DistributedContext;
use crate::master::ControlPlane;
use crate::watcher::{SignalWatcher, WatcherConfig};

/// Per-process preemption API for a task managed by a master
///
/// Whether this process runs a [`SignalWatcher`] is decided once, from rank
/// and mode: the chief always does, other ranks only under
/// [`PreemptMode::WorkersAskMaster`]. Everyone else learns the decision from
/// the chief's broadcast.
pub struct PreemptionCoordinator {
    master: Arc<dyn ControlPlane>,
    allocation_id: String,
    dist: Arc<dyn DistributedContext>,
    mode: PreemptMode,
    watcher: Option<SignalWatcher>,
    started: bool,
    ack_sent: bool,
}

impl PreemptionCoordinator {
    pub fn new(
        master: Arc<dyn ControlPlane>,
        allocation_id: impl Into<String>,
        dist: Arc<dyn DistributedContext>,
        mode: PreemptMode,
        watcher_config: WatcherConfig,
    ) -> Self {
        let allocation_id = allocation_id.into();
        let rank = dist.rank();
        debug!(%allocation_id, rank, %mode, "PreemptionCoordinator::new: called");

        let watcher = mode
            .has_watcher(rank)
            .then(|| SignalWatcher::new(master.clone(), allocation_id.clone(), watcher_config));

        Self {
            master,
            allocation_id,
            dist,
            mode,
            watcher,
            started: false,
            ack_sent: false,
        }
    }

    pub fn rank(&self) -> usize {
        self.dist.rank()
    }

    pub fn allocation_id(&self) -> &str {
        &self.allocation_id
    }

    pub fn has_watcher(&self) -> bool {
        self.watcher.is_some()
    }

    /// Whether the automatic acknowledgment has gone out
    pub fn ack_sent(&self) -> bool {
        self.ack_sent
    }

    async fn auto_ack(&mut self) {
        if self.ack_sent {
            return;
        }
        // Errors are swallowed: the broadcast that follows must still happen.
        match self.acknowledge_preemption_signal().await {
            Ok(()) => self.ack_sent = true,
            Err(e) => warn!(error = %e, "Failed to acknowledge preemption signal (will retry on next check)"),
        }
    }
}

#[async_trait]
impl Preemption for PreemptionCoordinator {
    fn mode(&self) -> PreemptMode {
        self.mode
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn is_managed(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<(), PreemptionError> {
        if self.started {
            return Err(PreemptionError::AlreadyStarted);
        }
        self.started = true;
        if let Some(watcher) = &mut self.watcher {
            watcher.start()?;
        }
        info!(rank = self.rank(), mode = %self.mode, has_watcher = self.has_watcher(), "Preemption started");
        Ok(())
    }

    async fn close(&mut self) {
        debug!(rank = self.rank(), "PreemptionCoordinator::close: called");
        if let Some(watcher) = &mut self.watcher {
            watcher.close().await;
        }
    }

    async fn should_preempt(&mut self, auto_ack: bool) -> Result<bool, PreemptionError> {
        if !self.started {
            return Err(PreemptionError::NotStarted);
        }
        let rank = self.rank();

        let observed = match &self.watcher {
            Some(watcher) => Some(watcher.should_preempt().await?),
            None => None,
        };

        let out = match observed {
            // The chief, or any rank under WorkersAskMaster
            Some(out) => {
                if out && auto_ack {
                    self.auto_ack().await;
                }
                if self.mode.broadcasts() {
                    self.dist.broadcast(Some(out)).await?
                } else {
                    out
                }
            }
            None => {
                if self.mode == PreemptMode::ChiefOnly {
                    return Err(PreemptionError::ChiefOnly { rank });
                }
                self.dist.broadcast(None).await?
            }
        };

        debug!(rank, out, "should_preempt() -> {}", out);
        Ok(out)
    }

    async fn acknowledge_preemption_signal(&self) -> Result<(), PreemptionError> {
        debug!(allocation_id = %self.allocation_id, "acknowledge_preemption_signal()");
        self.master.ack_preemption(&self.allocation_id).await?;
        info!(allocation_id = %self.allocation_id, "Acknowledged preemption signal");
        Ok(())
    }
}
