#![allow(dead_code)]

pub use rulewatch_test_utils::builders;
pub use rulewatch_test_utils::recording::{Dispatched, RecordingDispatcher};
pub use rulewatch_test_utils::{init_tracing, with_timeout, write_file};

use std::path::{Path, PathBuf};
use std::time::Duration;

use rulewatch::engine::EngineOptions;
use rulewatch::types::HostMode;

/// Engine options for tests: fast settling, short shutdown grace.
pub fn test_options(cwd: impl Into<PathBuf>, mode: HostMode) -> EngineOptions {
    let mut options = EngineOptions::new(cwd, mode);
    options.settle_delay = Duration::from_millis(30);
    options.shutdown_grace = Duration::from_millis(500);
    options
}

/// Canonical form of a tempdir path, as the engine and notify report it.
pub fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
