use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rulewatch::exec::{DispatchBackend, DispatchFuture, DispatchMode, DispatchOutcome};
use rulewatch::WatchRule;

/// One recorded `DispatchBackend::run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub rule: String,
    pub path: PathBuf,
    pub mode: DispatchMode,
}

/// A fake dispatcher that:
/// - records every dispatch at the moment it is started
/// - runs nothing, and reports failure for rules listed in `failing`.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    dispatched: Arc<Mutex<Vec<Dispatched>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every dispatch of the rule with this display name fail.
    pub fn fail_rule(&self, rule: &str) {
        self.failing.lock().unwrap().push(rule.to_string());
    }

    /// Snapshot of everything dispatched so far, in call order.
    pub fn dispatched(&self) -> Vec<Dispatched> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.dispatched().into_iter().map(|d| d.path).collect()
    }

    pub fn count(&self) -> usize {
        self.dispatched.lock().unwrap().len()
    }
}

impl DispatchBackend for RecordingDispatcher {
    fn run(&self, rule: &WatchRule, path: &Path, mode: DispatchMode) -> DispatchFuture {
        let name = rule.display_name();
        let fails = self.failing.lock().unwrap().contains(&name);
        self.dispatched.lock().unwrap().push(Dispatched {
            rule: name.clone(),
            path: path.to_path_buf(),
            mode,
        });

        match mode {
            DispatchMode::Await => Box::pin(async move {
                if fails {
                    DispatchOutcome::Failed(format!("{name} failed"))
                } else {
                    DispatchOutcome::Succeeded
                }
            }),
            DispatchMode::Detach => {
                let handle = tokio::spawn(async {});
                Box::pin(async move { DispatchOutcome::Detached(handle) })
            }
        }
    }
}
