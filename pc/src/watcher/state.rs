//! Tri-state preemption flag shared between the poll loop and its readers

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;
use tokio::sync::Notify;

/// What is known about the preemption signal
///
/// Variants are ordered: the state only ever moves forward, from `Unknown`
/// to `NotPreempted` to `Preempted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum PreemptState {
    /// The first poll has not resolved yet
    Unknown = 0,
    NotPreempted = 1,
    Preempted = 2,
}

impl PreemptState {
    /// Map a signal returned by the master
    pub fn from_signal(preempt: bool) -> Self {
        if preempt { Self::Preempted } else { Self::NotPreempted }
    }

    /// True once the first poll has resolved
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Coerce to the boolean callers act on
    pub fn should_preempt(self) -> bool {
        self == Self::Preempted
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::NotPreempted,
            _ => Self::Preempted,
        }
    }
}

impl fmt::Display for PreemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::NotPreempted => write!(f, "not-preempted"),
            Self::Preempted => write!(f, "preempted"),
        }
    }
}

/// Single-writer, multi-reader cell holding a [`PreemptState`]
///
/// Reads are a plain atomic load. Only readers that arrive while the state is
/// still `Unknown` park on the notifier.
#[derive(Debug, Default)]
pub struct SignalState {
    value: AtomicU8,
    resolved: Notify,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, without waiting
    pub fn load(&self) -> PreemptState {
        PreemptState::from_u8(self.value.load(Ordering::Acquire))
    }

    /// Record a poll outcome and return the resulting state
    ///
    /// Never moves backwards: recording `NotPreempted` after `Preempted`
    /// leaves the state `Preempted`.
    pub(crate) fn record(&self, state: PreemptState) -> PreemptState {
        let prev = PreemptState::from_u8(self.value.fetch_max(state as u8, Ordering::AcqRel));
        if !prev.is_known() && state.is_known() {
            self.resolved.notify_waiters();
        }
        prev.max(state)
    }

    /// Wait until the state leaves `Unknown`, then return it
    pub async fn wait_known(&self) -> PreemptState {
        let state = self.load();
        if state.is_known() {
            return state;
        }

        loop {
            let notified = self.resolved.notified();
            tokio::pin!(notified);
            // Register before re-checking so a concurrent record() cannot slip between.
            notified.as_mut().enable();

            let state = self.load();
            if state.is_known() {
                return state;
            }
            notified.await;
        }
    }
}
