// src/engine/mod.rs

//! Orchestration engine for rulewatch.
//!
//! This module ties together:
//! - the initial pass run before the host's first build
//! - the live watch loop that reacts to settled filesystem changes
//! - the shared-action debounce gates
//! - loop detection and action dispatch
//!
//! The per-event decision logic lives in [`core`]; the async loop around it
//! is implemented in [`runtime`]; [`lifecycle`] owns the engine state machine
//! and the host-facing hooks.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::HostMode;

pub mod core;
pub mod debounce;
pub mod lifecycle;
pub mod runtime;

pub use core::{Decision, RuleCore};
pub use debounce::DebounceGate;
pub use lifecycle::RuleEngine;
pub use runtime::{InFlight, LiveRuntime};

/// Window within which a shared-action rule accepts only one trigger.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Quiet period before a live change is considered fully written.
pub const DEFAULT_SETTLE_MS: u64 = 50;

/// Environment variable carrying the triggering path into commands.
pub const DEFAULT_PATH_ENV: &str = "WATCH_FILE";

/// How long shutdown waits for in-flight detached actions.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2000;

/// Engine lifecycle.
///
/// `Uninitialized -> InitialPass -> Watching -> ShuttingDown -> Stopped`;
/// in build mode `Watching` and `ShuttingDown` are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    InitialPass,
    Watching,
    ShuttingDown,
    Stopped,
}

/// Options for a [`RuleEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Base directory for relative patterns.
    pub cwd: PathBuf,
    pub mode: HostMode,
    pub debounce_window: Duration,
    pub settle_delay: Duration,
    pub cycle_detection: bool,
    pub path_env: String,
    pub shutdown_grace: Duration,
}

impl EngineOptions {
    pub fn new(cwd: impl Into<PathBuf>, mode: HostMode) -> Self {
        Self {
            cwd: cwd.into(),
            mode,
            debounce_window: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
            cycle_detection: true,
            path_env: DEFAULT_PATH_ENV.to_string(),
            shutdown_grace: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS),
        }
    }
}

/// Summary of an initial pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitialPassReport {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Counters collected by the live loop, returned at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveStats {
    /// Raw events received from the watcher.
    pub events_seen: usize,
    /// Changes released after settling.
    pub settled: usize,
    pub unmatched: usize,
    pub debounced: usize,
    pub dispatched: usize,
    pub loops_flagged: usize,
    /// Detached actions still running when the shutdown grace expired.
    pub abandoned: usize,
}
