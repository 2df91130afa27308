//! Rank provider and broadcast barrier
//!
//! Chief-mediated preemption needs two things from the worker group: this
//! process's rank, and a collective broadcast from rank 0 to every rank. The
//! cross-process transport lives outside this crate; [`LocalGroup`] provides
//! an in-process group for single-process runs and simulations.

mod context;
mod local;

pub use context::{BroadcastError, DistributedContext};
pub use local::{LocalContext, LocalGroup};
