// src/watch/watcher.rs

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::patterns::WatchTarget;
use crate::watch::settle::ChangeKind;

/// Raw filesystem change, tagged with the rule whose subscription saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub rule: usize,
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// One rule's set of OS watches.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping it (or calling [`Subscription::close`]) stops
/// the watches.
pub struct Subscription {
    rule: usize,
    targets: Vec<WatchTarget>,
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("rule", &self.rule)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn rule(&self) -> usize {
        self.rule
    }

    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    pub fn close(self) {
        debug!(rule = self.rule, "closing subscription");
    }
}

/// Start watching `targets` on behalf of rule `rule`.
///
/// Only changes happening after this call are reported; files that already
/// exist produce no events.
pub fn subscribe(
    rule: usize,
    targets: Vec<WatchTarget>,
    change_tx: mpsc::UnboundedSender<RawChange>,
) -> Result<Subscription> {
    // Called synchronously by notify on its own thread.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for (path, kind) in classify(&event) {
                    if change_tx.send(RawChange { rule, path, kind }).is_err() {
                        // Engine loop is gone; nothing left to notify.
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(rule, error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    for target in &targets {
        let mode = if target.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&target.path, mode)?;
        info!(rule, path = ?target.path, recursive = target.recursive, "watching");
    }

    Ok(Subscription {
        rule,
        targets,
        _inner: watcher,
    })
}

/// Map a notify event onto per-path add/change/remove kinds.
///
/// Access and metadata-only events are ignored.
pub fn classify(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Added,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Added,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((from.clone(), ChangeKind::Removed));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((to.clone(), ChangeKind::Added));
            }
            return out;
        }
        EventKind::Modify(_) | EventKind::Any => ChangeKind::Changed,
        EventKind::Access(_) | EventKind::Other => return Vec::new(),
    };

    event.paths.iter().map(|p| (p.clone(), kind)).collect()
}
