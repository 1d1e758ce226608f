// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::core::{Decision, RuleCore};
use crate::engine::LiveStats;
use crate::exec::{DispatchBackend, DispatchMode, DispatchOutcome};
use crate::fs::FileSystem;
use crate::watch::settle::{SettleBuffer, SettledChange};
use crate::watch::watcher::RawChange;

/// Detached actions started by the live loop.
///
/// Finished handles are reaped as the loop goes; whatever is still running at
/// shutdown gets a grace period and is then abandoned (not killed).
#[derive(Debug, Default)]
pub struct InFlight {
    handles: Vec<JoinHandle<()>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drop handles of actions that already finished.
    pub fn reap(&mut self) {
        self.handles.retain(|h| !h.is_finished());
    }

    /// Wait up to `grace` for every action; returns how many were abandoned.
    pub async fn join(&mut self, grace: Duration) -> usize {
        self.reap();
        if self.handles.is_empty() {
            return 0;
        }

        debug!(count = self.handles.len(), ?grace, "waiting for in-flight actions");
        let deadline = tokio::time::Instant::now() + grace;
        for handle in self.handles.iter_mut() {
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                break;
            }
        }

        self.reap();
        let abandoned = self.handles.len();
        if abandoned > 0 {
            warn!(abandoned, "in-flight actions still running at shutdown; leaving them behind");
        }
        self.handles.clear();
        abandoned
    }
}

/// Async loop driving a [`RuleCore`] from watcher events.
///
/// Events are processed one at a time: settle, match, debounce, loop check,
/// detached dispatch. Nothing in here is shared with other tasks, so the
/// debounce gates and hash histories need no locking.
pub struct LiveRuntime<D: DispatchBackend> {
    core: RuleCore,
    dispatcher: Arc<D>,
    fs: Arc<dyn FileSystem>,
    settle: SettleBuffer,
    change_rx: mpsc::UnboundedReceiver<RawChange>,
    shutdown_rx: oneshot::Receiver<()>,
    in_flight: InFlight,
    grace: Duration,
    stats: LiveStats,
}

impl<D: DispatchBackend> fmt::Debug for LiveRuntime<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveRuntime")
            .field("core", &self.core)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<D: DispatchBackend + 'static> LiveRuntime<D> {
    pub fn new(
        core: RuleCore,
        dispatcher: Arc<D>,
        fs: Arc<dyn FileSystem>,
        settle_delay: Duration,
        change_rx: mpsc::UnboundedReceiver<RawChange>,
        shutdown_rx: oneshot::Receiver<()>,
        grace: Duration,
    ) -> Self {
        Self {
            core,
            dispatcher,
            fs,
            settle: SettleBuffer::new(settle_delay),
            change_rx,
            shutdown_rx,
            in_flight: InFlight::new(),
            grace,
            stats: LiveStats::default(),
        }
    }

    /// Main event loop.
    ///
    /// Runs until the shutdown signal fires (or its sender is dropped), or
    /// every subscription is gone. Changes still settling at that point are
    /// discarded.
    pub async fn run(mut self) -> LiveStats {
        info!("live watch loop started");

        let tick = (self.settle.delay() / 2).max(Duration::from_millis(10));
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    debug!("shutdown signal received");
                    break;
                }

                change = self.change_rx.recv() => {
                    let Some(change) = change else {
                        info!("all subscriptions closed; leaving live loop");
                        break;
                    };
                    self.stats.events_seen += 1;
                    debug!(rule = change.rule, path = ?change.path, kind = ?change.kind, "raw change");
                    self.settle.observe(
                        change.rule,
                        change.path,
                        change.kind,
                        Instant::now(),
                        self.fs.as_ref(),
                    );
                }

                _ = ticker.tick() => {
                    if !self.settle.is_empty() {
                        let ready = self.settle.flush(Instant::now(), self.fs.as_ref());
                        for change in ready {
                            self.handle_settled(change).await;
                        }
                    }
                    self.in_flight.reap();
                }
            }
        }

        self.settle.clear();
        self.stats.abandoned = self.in_flight.join(self.grace).await;
        info!(stats = ?self.stats, "live watch loop finished");
        self.stats
    }

    /// Decide on and dispatch a single settled change.
    pub async fn handle_settled(&mut self, change: SettledChange) {
        self.stats.settled += 1;

        match self.core.on_change(change.rule, &change.path, Instant::now()) {
            Decision::NoMatch => {
                self.stats.unmatched += 1;
            }
            Decision::Debounced => {
                self.stats.debounced += 1;
            }
            Decision::Dispatch { path, cycle } => {
                if cycle.is_looping() {
                    self.stats.loops_flagged += 1;
                }
                let rule = &self.core.rules()[change.rule];
                debug!(
                    rule = %rule.display_name(),
                    path = ?path,
                    kind = ?change.kind,
                    "dispatching action"
                );
                self.stats.dispatched += 1;
                let outcome = self
                    .dispatcher
                    .run(rule, &path, DispatchMode::Detach)
                    .await;
                match outcome {
                    DispatchOutcome::Detached(handle) => self.in_flight.push(handle),
                    DispatchOutcome::Failed(err) => {
                        debug!(path = ?path, error = %err, "dispatch reported failure");
                    }
                    DispatchOutcome::Succeeded => {}
                }
            }
        }
    }
}
