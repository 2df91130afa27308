//! Preemption trait definition

use async_trait::async_trait;

use super::{PreemptMode, PreemptionError};

/// Preemption-signal API used by the training loop
///
/// Lifecycle is `start()` once, any number of `should_preempt()` calls, then
/// `close()`. Under [`PreemptMode::WorkersAskChief`] every rank must call
/// `should_preempt()` the same number of times in the same order, since each
/// call is a collective broadcast.
#[async_trait]
pub trait Preemption: Send + Sync {
    /// The synchronization mode, fixed at construction
    fn mode(&self) -> PreemptMode;

    fn is_started(&self) -> bool;

    /// Whether this implementation talks to a master
    fn is_managed(&self) -> bool;

    /// Begin watching for the preemption signal
    fn start(&mut self) -> Result<(), PreemptionError>;

    /// Stop watching; a no-op if never started
    async fn close(&mut self);

    /// Whether the task should yield its resources now
    ///
    /// Only blocking behavior is supported, so this is not cheap enough to
    /// call every batch.
    ///
    /// With `auto_ack`, the acknowledgment is sent to the master the first
    /// time this returns true. Pass `false` to look at the signal without
    /// committing to exit; call
    /// [`acknowledge_preemption_signal`](Self::acknowledge_preemption_signal)
    /// yourself before exiting if you later comply.
    async fn should_preempt(&mut self, auto_ack: bool) -> Result<bool, PreemptionError>;

    /// Tell the master this task is shutting down before finishing its work
    /// and expects to be rescheduled
    ///
    /// A plain zero exit would otherwise be read as completion.
    async fn acknowledge_preemption_signal(&self) -> Result<(), PreemptionError>;
}
