// src/engine/lifecycle.rs

//! The engine as seen by the host build tool.
//!
//! The host drives three hooks:
//! - [`RuleEngine::before_first_run`] / [`RuleEngine::before_run`]: awaited
//!   before a build; only the first call of either does anything (initial
//!   pass, then live watching in interactive mode).
//! - [`RuleEngine::on_shutdown`]: closes every subscription.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::engine::core::RuleCore;
use crate::engine::runtime::LiveRuntime;
use crate::engine::{EngineOptions, EngineState, InitialPassReport, LiveStats};
use crate::errors::{Result, RulewatchError};
use crate::exec::{DispatchBackend, DispatchMode, RealDispatcher};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{HostMode, WatchRule};
use crate::watch::cycle::CycleDetector;
use crate::watch::patterns::{expand, ResolvedWatch};
use crate::watch::watcher::{subscribe, Subscription};

/// Resources owned while in `Watching`.
struct LiveSession {
    subscriptions: Vec<Subscription>,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<LiveStats>,
}

/// Orchestrator owning the rules, their resolved watches, the hash histories
/// and (while watching) the subscriptions.
pub struct RuleEngine<D: DispatchBackend = RealDispatcher> {
    rules: Arc<Vec<WatchRule>>,
    options: EngineOptions,
    fs: Arc<dyn FileSystem>,
    dispatcher: Arc<D>,
    core: Option<RuleCore>,
    state: EngineState,
    started: bool,
    session: Option<LiveSession>,
}

impl<D: DispatchBackend> fmt::Debug for RuleEngine<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.len())
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RuleEngine<RealDispatcher> {
    /// Engine backed by the real filesystem and the process/callback
    /// dispatcher.
    pub fn from_rules(rules: Vec<WatchRule>, options: EngineOptions) -> Result<Self> {
        let dispatcher = RealDispatcher::new(options.path_env.clone());
        Self::new(rules, options, Arc::new(RealFileSystem), dispatcher)
    }
}

impl<D: DispatchBackend + 'static> RuleEngine<D> {
    /// Build an engine; every pattern is resolved here so malformed patterns
    /// are reported before anything runs.
    pub fn new(
        rules: Vec<WatchRule>,
        mut options: EngineOptions,
        fs: Arc<dyn FileSystem>,
        dispatcher: D,
    ) -> Result<Self> {
        if fs.is_dir(&options.cwd) {
            if let Ok(canonical) = options.cwd.canonicalize() {
                options.cwd = canonical;
            }
        }

        let rules = Arc::new(rules);
        let cycle = options
            .cycle_detection
            .then(|| CycleDetector::new(Arc::clone(&fs)));
        let core = RuleCore::new(
            Arc::clone(&rules),
            &options.cwd,
            options.debounce_window,
            cycle,
        )?;

        debug!(rules = rules.len(), cwd = ?options.cwd, "rule engine created");

        Ok(Self {
            rules,
            options,
            fs,
            dispatcher: Arc::new(dispatcher),
            core: Some(core),
            state: EngineState::Uninitialized,
            started: false,
            session: None,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Resolved watch roots and matchers of rule `rule`, while the engine
    /// still owns them (before live watching starts).
    pub fn resolved(&self, rule: usize) -> Option<&ResolvedWatch> {
        self.core.as_ref().and_then(|c| c.watch(rule))
    }

    /// Host hook: before the first build.
    pub async fn before_first_run(&mut self) -> Result<()> {
        self.start_once().await
    }

    /// Host hook: before every rebuild. Only the first signal after process
    /// start (from either hook) is acted upon.
    pub async fn before_run(&mut self) -> Result<()> {
        self.start_once().await
    }

    /// Host hook: shutdown.
    pub async fn on_shutdown(&mut self) -> Option<LiveStats> {
        self.shutdown().await
    }

    async fn start_once(&mut self) -> Result<()> {
        if self.started {
            debug!("engine already started; ignoring lifecycle signal");
            return Ok(());
        }
        self.started = true;

        let report = self.initial_pass().await;
        info!(?report, "initial pass complete");

        match self.options.mode {
            HostMode::Interactive => self.start_watching(),
            HostMode::Build => {
                info!("build mode: not watching for changes");
                self.state = EngineState::Stopped;
                Ok(())
            }
        }
    }

    /// Files the initial pass will dispatch for, as `(rule index, path)`.
    ///
    /// Rules in declared order, patterns in declared order. A shared-action
    /// rule contributes only its first match. A file matched by several
    /// patterns of one rule is dispatched once.
    pub fn plan_initial_pass(&self) -> Vec<(usize, PathBuf)> {
        let mut plan = Vec::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            if !rule.runs_on_first_compilation() {
                continue;
            }

            let mut files: Vec<PathBuf> = Vec::new();
            for pattern in rule.patterns() {
                match expand(pattern, &self.options.cwd, self.fs.as_ref()) {
                    Ok(matched) => {
                        for path in matched {
                            if !files.contains(&path) {
                                files.push(path);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(
                            rule = %rule.display_name(),
                            pattern = %pattern,
                            error = %err,
                            "could not expand pattern for initial pass"
                        );
                    }
                }
                if rule.is_shared_action() && !files.is_empty() {
                    break;
                }
            }

            if rule.is_shared_action() {
                files.truncate(1);
            }
            plan.extend(files.into_iter().map(|path| (idx, path)));
        }

        plan
    }

    /// Run every planned invocation concurrently and wait for all of them.
    ///
    /// A failing invocation does not affect its siblings.
    pub async fn initial_pass(&mut self) -> InitialPassReport {
        self.state = EngineState::InitialPass;
        let plan = self.plan_initial_pass();
        let mut report = InitialPassReport::default();

        if plan.is_empty() {
            debug!("initial pass: nothing to run");
            return report;
        }

        info!(invocations = plan.len(), "running initial pass");

        let mut set = JoinSet::new();
        for (idx, path) in plan {
            if let Some(core) = self.core.as_mut() {
                core.check_cycle(&path);
            }
            let rule = &self.rules[idx];
            set.spawn(self.dispatcher.run(rule, &path, DispatchMode::Await));
            report.dispatched += 1;
        }

        while let Some(res) = set.join_next().await {
            match res {
                Ok(outcome) if outcome.is_failed() => report.failed += 1,
                Ok(_) => report.succeeded += 1,
                Err(err) => {
                    warn!(error = %err, "initial pass invocation panicked");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Subscribe every rule to its watch roots and start the live loop.
    pub fn start_watching(&mut self) -> Result<()> {
        match self.state {
            EngineState::Watching => return Ok(()),
            EngineState::ShuttingDown | EngineState::Stopped => {
                return Err(RulewatchError::Lifecycle(
                    "cannot start watching after shutdown".to_string(),
                ));
            }
            EngineState::Uninitialized | EngineState::InitialPass => {}
        }

        let targets: Vec<_> = match self.core.as_ref() {
            Some(core) => core
                .watches()
                .iter()
                .map(|w| w.subscription_targets(self.fs.as_ref()))
                .collect(),
            None => {
                return Err(RulewatchError::Lifecycle(
                    "rule state already handed to a live loop".to_string(),
                ));
            }
        };

        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let mut subscriptions = Vec::with_capacity(targets.len());
        for (idx, rule_targets) in targets.into_iter().enumerate() {
            // Subscriptions created so far are dropped (closed) on error.
            let sub = subscribe(idx, rule_targets, change_tx.clone())?;
            debug!(
                rule = %self.rules[sub.rule()].display_name(),
                targets = ?sub.targets(),
                "rule subscribed"
            );
            subscriptions.push(sub);
        }
        drop(change_tx);

        let core = self.core.take().ok_or_else(|| {
            RulewatchError::Lifecycle("rule state already handed to a live loop".to_string())
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let runtime = LiveRuntime::new(
            core,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.fs),
            self.options.settle_delay,
            change_rx,
            shutdown_rx,
            self.options.shutdown_grace,
        );
        let handle = tokio::spawn(runtime.run());

        info!(subscriptions = subscriptions.len(), "watching for changes");
        self.session = Some(LiveSession {
            subscriptions,
            shutdown_tx,
            handle,
        });
        self.state = EngineState::Watching;
        Ok(())
    }

    /// Close every subscription and stop the live loop.
    ///
    /// Idempotent; returns the live loop's counters the first time it stops a
    /// running loop.
    pub async fn shutdown(&mut self) -> Option<LiveStats> {
        let Some(session) = self.session.take() else {
            if self.state != EngineState::Stopped {
                debug!("shutdown with no active subscriptions");
            }
            self.state = EngineState::Stopped;
            return None;
        };

        self.state = EngineState::ShuttingDown;
        info!("shutting down watchers");

        for sub in session.subscriptions {
            sub.close();
        }
        // The loop may already have exited on its own.
        let _ = session.shutdown_tx.send(());

        let stats = match session.handle.await {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!(error = %err, "live loop ended abnormally");
                None
            }
        };

        self.state = EngineState::Stopped;
        stats
    }
}
