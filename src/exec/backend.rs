// src/exec/backend.rs

//! Pluggable dispatcher abstraction.
//!
//! The engine talks to a `DispatchBackend` instead of spawning processes
//! itself. Production code uses [`RealDispatcher`]; tests can provide their
//! own implementation that records invocations without running anything.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::error;

use crate::engine::DEFAULT_PATH_ENV;
use crate::exec::task_runner::run_action;
use crate::exec::{DispatchMode, DispatchOutcome};
use crate::types::WatchRule;

pub type DispatchFuture = Pin<Box<dyn Future<Output = DispatchOutcome> + Send + 'static>>;

/// Trait abstracting how a rule's action is executed for one file.
pub trait DispatchBackend: Send + Sync {
    /// Start the action for `path`.
    ///
    /// - `Await`: the returned future resolves once the action settled.
    /// - `Detach`: the action is already running when this returns; the
    ///   future resolves immediately to [`DispatchOutcome::Detached`].
    fn run(&self, rule: &WatchRule, path: &Path, mode: DispatchMode) -> DispatchFuture;
}

/// Dispatcher that runs shell commands and callbacks on the tokio runtime.
#[derive(Debug, Clone)]
pub struct RealDispatcher {
    path_env: String,
}

impl RealDispatcher {
    /// `path_env` is the environment variable carrying the triggering path
    /// into command actions.
    pub fn new(path_env: impl Into<String>) -> Self {
        Self {
            path_env: path_env.into(),
        }
    }

    pub fn path_env(&self) -> &str {
        &self.path_env
    }
}

impl Default for RealDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_ENV)
    }
}

impl DispatchBackend for RealDispatcher {
    fn run(&self, rule: &WatchRule, path: &Path, mode: DispatchMode) -> DispatchFuture {
        let name = rule.display_name();
        let job = run_action(
            name.clone(),
            rule.action().clone(),
            path.to_path_buf(),
            self.path_env.clone(),
        );

        // Spawned in both modes so a panicking callback is contained in its
        // own task.
        let handle = tokio::spawn(job);

        match mode {
            DispatchMode::Await => {
                let path = path.to_path_buf();
                Box::pin(async move {
                    match handle.await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            error!(rule = %name, path = ?path, error = %err, "action panicked");
                            DispatchOutcome::Failed(format!("action panicked: {err}"))
                        }
                    }
                })
            }
            DispatchMode::Detach => {
                let handle = tokio::spawn(async move {
                    // The outcome is logged by `run_action`; only panics are left.
                    if let Err(err) = handle.await {
                        error!(rule = %name, error = %err, "detached action panicked");
                    }
                });
                Box::pin(async move { DispatchOutcome::Detached(handle) })
            }
        }
    }
}
