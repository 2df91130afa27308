//! Control-plane (master) client
//!
//! The master exposes two allocation-scoped endpoints: a long-poll that
//! reports whether the scheduler wants the allocation to yield its resources,
//! and a one-way acknowledgment telling it the task is exiting because of
//! preemption rather than completion.

pub mod client;
mod error;
mod http;

pub use client::ControlPlane;
pub use error::SignalError;
pub use http::{HttpControlPlane, parse_preemption};
