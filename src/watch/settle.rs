// src/watch/settle.rs

//! Write settling for live events.
//!
//! Raw notify events arrive in bursts while a file is being written (create,
//! several modifies, sometimes a rename). Events are parked here per
//! `(rule, path)` and released once no new event arrived for `delay` and the
//! file size did not move in between. This is what keeps a half-written file
//! from triggering an action.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::fs::FileSystem;

/// What happened to a path, after coalescing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// A change that is ready to be matched and dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledChange {
    pub rule: usize,
    pub path: PathBuf,
    pub kind: ChangeKind,
}

#[derive(Debug)]
struct Pending {
    seq: u64,
    first_kind: ChangeKind,
    last_event: Instant,
    size: Option<u64>,
}

#[derive(Debug)]
pub struct SettleBuffer {
    delay: Duration,
    next_seq: u64,
    pending: HashMap<(usize, PathBuf), Pending>,
}

impl SettleBuffer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_seq: 0,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Park an event; a repeated event for the same `(rule, path)` restarts
    /// its quiet period.
    pub fn observe(
        &mut self,
        rule: usize,
        path: PathBuf,
        kind: ChangeKind,
        now: Instant,
        fs: &dyn FileSystem,
    ) {
        let size = fs.file_len(&path);
        match self.pending.get_mut(&(rule, path.clone())) {
            Some(p) => {
                p.last_event = now;
                p.size = size;
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.pending.insert(
                    (rule, path),
                    Pending {
                        seq,
                        first_kind: kind,
                        last_event: now,
                        size,
                    },
                );
            }
        }
    }

    /// Release every change that has been quiet for the settle delay, in the
    /// order the changes were first observed.
    ///
    /// A file whose size moved since its last event gets another quiet
    /// period. A file that was created and removed again before settling is
    /// dropped, and so is any path that settles as a directory.
    pub fn flush(&mut self, now: Instant, fs: &dyn FileSystem) -> Vec<SettledChange> {
        let mut ready: Vec<(u64, SettledChange)> = Vec::new();
        let delay = self.delay;

        self.pending.retain(|(rule, path), p| {
            if now.saturating_duration_since(p.last_event) < delay {
                return true;
            }

            let exists = fs.exists(path);
            if exists && fs.is_dir(path) {
                return false;
            }
            if exists {
                let size = fs.file_len(path);
                if size != p.size {
                    p.size = size;
                    p.last_event = now;
                    return true;
                }
            }

            let kind = match (exists, p.first_kind) {
                (true, ChangeKind::Added) => Some(ChangeKind::Added),
                (true, _) => Some(ChangeKind::Changed),
                (false, ChangeKind::Added) => None,
                (false, _) => Some(ChangeKind::Removed),
            };
            if let Some(kind) = kind {
                ready.push((
                    p.seq,
                    SettledChange {
                        rule: *rule,
                        path: path.clone(),
                        kind,
                    },
                ));
            }
            false
        });

        ready.sort_by_key(|(seq, _)| *seq);
        ready.into_iter().map(|(_, change)| change).collect()
    }

    /// Forget everything still pending (used at shutdown).
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Whether `path` has a pending change for `rule`.
    pub fn is_pending(&self, rule: usize, path: &Path) -> bool {
        self.pending.contains_key(&(rule, path.to_path_buf()))
    }
}
