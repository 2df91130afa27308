//! Synchronization modes for should_preempt()

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who may call `should_preempt()` and how ranks agree on the answer
///
/// - `WorkersAskChief` (default): every rank calls `should_preempt()` in step.
///   Only the chief talks to the master, then broadcasts its decision, so all
///   ranks decide to preempt on the same call.
/// - `ChiefOnly`: only the chief may call `should_preempt()`; informing the
///   workers is up to the caller.
/// - `WorkersAskMaster`: every rank asks the master on its own. Ranks see the
///   signal at roughly the same time, and the caller must tolerate some ranks
///   exiting before others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreemptMode {
    #[default]
    WorkersAskChief,
    ChiefOnly,
    WorkersAskMaster,
}

impl PreemptMode {
    /// Whether a process of this rank runs its own watcher
    pub fn has_watcher(self, rank: usize) -> bool {
        rank == 0 || self == Self::WorkersAskMaster
    }

    /// Whether each check is a broadcast round-trip across the group
    pub fn broadcasts(self) -> bool {
        self == Self::WorkersAskChief
    }
}

impl std::str::FromStr for PreemptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "workers_ask_chief" | "workersaskchief" => Ok(Self::WorkersAskChief),
            "chief_only" | "chiefonly" => Ok(Self::ChiefOnly),
            "workers_ask_master" | "workersaskmaster" => Ok(Self::WorkersAskMaster),
            _ => Err(format!(
                "Unknown preempt mode: {}. Use: workers-ask-chief, chief-only, or workers-ask-master",
                s
            )),
        }
    }
}

impl fmt::Display for PreemptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkersAskChief => write!(f, "WORKERS_ASK_CHIEF"),
            Self::ChiefOnly => write!(f, "CHIEF_ONLY"),
            Self::WorkersAskMaster => write!(f, "WORKERS_ASK_MASTER"),
        }
    }
}
