//! Background long-poll of the master's preemption signal

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::WatcherConfig;
use super::error::WatcherError;
use super::state::{PreemptState, SignalState};
use crate::master::ControlPlane;

/// The SignalWatcher asks the master whether the allocation should yield
///
/// After `start()`, a background task makes one immediate poll to learn the
/// current state and then long-polls until a preemption signal arrives or the
/// watcher is closed. `should_preempt()` waits only for that first answer.
pub struct SignalWatcher {
    master: Arc<dyn ControlPlane>,
    allocation_id: String,
    config: WatcherConfig,
    state: Arc<SignalState>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    started: bool,
}

impl SignalWatcher {
    /// Create a watcher for an allocation; nothing is polled until `start()`
    pub fn new(master: Arc<dyn ControlPlane>, allocation_id: impl Into<String>, config: WatcherConfig) -> Self {
        let allocation_id = allocation_id.into();
        debug!(%allocation_id, ?config, "SignalWatcher::new: called");
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            master,
            allocation_id,
            config,
            state: Arc::new(SignalState::new()),
            shutdown_tx,
            task: None,
            started: false,
        }
    }

    /// Spawn the poll loop
    pub fn start(&mut self) -> Result<(), WatcherError> {
        if self.started {
            return Err(WatcherError::AlreadyStarted);
        }
        self.started = true;

        let poll_loop = PollLoop {
            master: self.master.clone(),
            allocation_id: self.allocation_id.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            shutdown_rx: self.shutdown_tx.subscribe(),
        };
        self.task = Some(tokio::spawn(poll_loop.run()));

        info!(allocation_id = %self.allocation_id, "SignalWatcher started");
        Ok(())
    }

    /// Whether the master has asked the allocation to yield
    ///
    /// Waits for the first poll to resolve; every later call returns at once.
    pub async fn should_preempt(&self) -> Result<bool, WatcherError> {
        if !self.started {
            return Err(WatcherError::NotStarted);
        }
        Ok(self.state.wait_known().await.should_preempt())
    }

    /// Current tri-state, without waiting
    pub fn state(&self) -> PreemptState {
        self.state.load()
    }

    pub fn allocation_id(&self) -> &str {
        &self.allocation_id
    }

    /// Stop the poll loop and wait for it to exit
    ///
    /// Any in-flight poll is cancelled. A no-op if never started.
    pub async fn close(&mut self) {
        debug!(allocation_id = %self.allocation_id, "SignalWatcher::close: called");
        self.shutdown_tx.send_replace(true);

        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(e) = task.await {
            warn!(error = %e, "SignalWatcher task ended abnormally");
        }
        debug!(state = %self.state.load(), "SignalWatcher closed");
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Everything the background task owns
struct PollLoop {
    master: Arc<dyn ControlPlane>,
    allocation_id: String,
    config: WatcherConfig,
    state: Arc<SignalState>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PollLoop {
    fn keep_polling(&self) -> bool {
        self.state.load() == PreemptState::NotPreempted && !*self.shutdown_rx.borrow()
    }

    async fn run(mut self) {
        // A rapid check for the current value; never retried, failures default to not preempted.
        let request_timeout = self.config.request_timeout(0);
        let initial = tokio::select! {
            result = self.master.get_preemption(&self.allocation_id, 0, request_timeout) => match result {
                Ok(preempt) => PreemptState::from_signal(preempt),
                Err(e) if e.is_timeout() => {
                    warn!(error = %e, "Timeout during initial preemption check (continuing)");
                    PreemptState::NotPreempted
                }
                Err(e) => {
                    warn!(error = %e, "Failure during initial preemption check (continuing)");
                    PreemptState::NotPreempted
                }
            },
            _ = self.shutdown_rx.changed() => PreemptState::NotPreempted,
        };
        let state = self.state.record(initial);
        debug!(%state, "Initial preemption state");

        // If the master stays unreachable, either user code fails on a more
        // critical API call or the task gets killed; keep retrying here.
        let wait_secs = self.config.longpoll_timeout_secs;
        let request_timeout = self.config.request_timeout(wait_secs);
        while self.keep_polling() {
            tokio::select! {
                result = self.master.get_preemption(&self.allocation_id, wait_secs, request_timeout) => match result {
                    Ok(preempt) => {
                        let state = self.state.record(PreemptState::from_signal(preempt));
                        debug!(%state, "Preemption long-poll returned");
                    }
                    Err(e) if e.is_timeout() => {
                        debug!(error = %e, "Timeout communicating with preemption API (retrying)");
                    }
                    Err(e) => {
                        let delay = self.config.retry_delay();
                        warn!(error = %e, ?delay, "Failure communicating with preemption API (retrying)");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.shutdown_rx.changed() => break,
                        }
                    }
                },
                _ = self.shutdown_rx.changed() => break,
            }
        }

        if self.state.load().should_preempt() {
            info!(allocation_id = %self.allocation_id, "Preemption signal received");
        }
        debug!("SignalWatcher poll loop exited");
    }
}
