//! ControlPlane trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::SignalError;

/// Access to the preemption endpoints of the master
///
/// Implementations must be safe to share between the background watcher task
/// and the foreground caller, since acknowledgments are sent from the latter.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Ask the master whether the allocation should be preempted
    ///
    /// `timeout_secs == 0` returns the current state immediately; a positive
    /// value lets the master hold the request open up to that many seconds
    /// waiting for a change. `request_timeout` bounds the whole request on the
    /// client side and must exceed the server-side wait.
    async fn get_preemption(
        &self,
        allocation_id: &str,
        timeout_secs: u64,
        request_timeout: Duration,
    ) -> Result<bool, SignalError>;

    /// Tell the master the task is exiting due to preemption and expects to
    /// be rescheduled
    async fn ack_preemption(&self, allocation_id: &str) -> Result<(), SignalError>;
}
