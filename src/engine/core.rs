// src/engine/core.rs

//! Per-event decision logic.
//!
//! [`RuleCore`] answers one question for every settled change: should rule
//! `i` dispatch for this path? It owns the resolved matchers, the debounce
//! gates and the cycle detector, and has no channels, no tasks and no
//! process handling, so it can be driven directly from tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::engine::debounce::DebounceGate;
use crate::errors::Result;
use crate::types::WatchRule;
use crate::watch::cycle::{CycleCheck, CycleDetector};
use crate::watch::patterns::ResolvedWatch;

/// Outcome of [`RuleCore::on_change`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No pattern of the rule accepts the path.
    NoMatch,
    /// Shared-action rule already fired within the debounce window.
    Debounced,
    /// Dispatch the rule's action for `path`.
    Dispatch { path: PathBuf, cycle: CycleCheck },
}

#[derive(Debug)]
pub struct RuleCore {
    rules: Arc<Vec<WatchRule>>,
    watches: Vec<ResolvedWatch>,
    gates: Vec<Option<DebounceGate>>,
    cycle: Option<CycleDetector>,
}

impl RuleCore {
    /// Resolve every rule's patterns against `cwd`.
    ///
    /// Fails on the first malformed pattern. `cycle` is `None` when loop
    /// detection is disabled.
    pub fn new(
        rules: Arc<Vec<WatchRule>>,
        cwd: &Path,
        debounce_window: Duration,
        cycle: Option<CycleDetector>,
    ) -> Result<Self> {
        let watches = rules
            .iter()
            .map(|rule| ResolvedWatch::resolve(rule.patterns(), cwd))
            .collect::<Result<Vec<_>>>()?;

        let gates = rules
            .iter()
            .map(|rule| {
                rule.is_shared_action()
                    .then(|| DebounceGate::new(debounce_window))
            })
            .collect();

        Ok(Self {
            rules,
            watches,
            gates,
            cycle,
        })
    }

    pub fn rules(&self) -> &Arc<Vec<WatchRule>> {
        &self.rules
    }

    pub fn watch(&self, rule: usize) -> Option<&ResolvedWatch> {
        self.watches.get(rule)
    }

    pub fn watches(&self) -> &[ResolvedWatch] {
        &self.watches
    }

    pub fn cycle_detector(&self) -> Option<&CycleDetector> {
        self.cycle.as_ref()
    }

    /// Run loop detection for `path` (no-op when disabled).
    pub fn check_cycle(&mut self, path: &Path) -> CycleCheck {
        match self.cycle.as_mut() {
            Some(detector) => detector.check(path),
            None => CycleCheck::Skipped,
        }
    }

    /// Filter a settled change for rule `rule`, observed at `now`.
    ///
    /// Order: matcher, debounce gate, loop detection. Loop detection never
    /// turns a dispatch into a drop.
    pub fn on_change(&mut self, rule: usize, path: &Path, now: Instant) -> Decision {
        let Some(watch) = self.watches.get(rule) else {
            return Decision::NoMatch;
        };

        if !watch.matches(path) {
            return Decision::NoMatch;
        }

        if let Some(Some(gate)) = self.gates.get_mut(rule) {
            if !gate.admit(now) {
                debug!(
                    rule = %self.rules[rule].display_name(),
                    path = ?path,
                    "within debounce window of shared action; dropping"
                );
                return Decision::Debounced;
            }
        }

        let cycle = self.check_cycle(path);
        Decision::Dispatch {
            path: path.to_path_buf(),
            cycle,
        }
    }
}
