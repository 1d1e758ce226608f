// src/exec/mod.rs

//! Action execution layer.
//!
//! - [`task_runner`] runs one command or callback for one triggering file and
//!   logs its failure.
//! - [`backend`] provides the `DispatchBackend` trait and the concrete
//!   `RealDispatcher` the engine uses in production, and which tests can
//!   replace with a recording implementation.

pub mod backend;
pub mod task_runner;

use tokio::task::JoinHandle;

pub use backend::{DispatchBackend, DispatchFuture, RealDispatcher};

/// Whether the caller waits for the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Wait until the action settled (initial pass).
    Await,
    /// Start it and move on (live changes).
    Detach,
}

/// Result of a dispatch as seen by the engine.
#[derive(Debug)]
pub enum DispatchOutcome {
    Succeeded,
    /// The action failed; already logged. Carries the error text.
    Failed(String),
    /// Started in the background; the handle finishes when the action does.
    Detached(JoinHandle<()>),
}

impl DispatchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }
}
