// src/watch/cycle.rs

//! Change-loop detection.
//!
//! Every time a watched file triggers an action, its content hash is appended
//! to a short per-path history. A file whose content keeps coming back to the
//! same value is most likely being rewritten by the very action it triggers
//! (a generator regenerating its own input, a formatter fighting another
//! tool, ...). We only warn; the action still runs.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Number of recent hashes kept per path.
pub const HISTORY_CAPACITY: usize = 5;

/// Occurrences of the current hash (within the history) that flag a loop.
pub const LOOP_THRESHOLD: usize = 3;

/// Bounded, oldest-first sequence of content hashes for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashHistory {
    digests: VecDeque<String>,
}

impl HashHistory {
    pub fn new() -> Self {
        Self {
            digests: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    /// Append a digest, evicting the oldest one past capacity.
    pub fn push(&mut self, digest: String) {
        self.digests.push_back(digest);
        while self.digests.len() > HISTORY_CAPACITY {
            self.digests.pop_front();
        }
    }

    pub fn occurrences(&self, digest: &str) -> usize {
        self.digests.iter().filter(|d| d.as_str() == digest).count()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.digests.iter().map(String::as_str)
    }
}

/// Result of a single [`CycleDetector::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleCheck {
    /// The file could not be hashed (missing, unreadable); nothing recorded.
    Skipped,
    /// Recorded; no loop suspected.
    Clear,
    /// Recorded; the current hash appears this many times in the history.
    Looping { occurrences: usize },
}

impl CycleCheck {
    pub fn is_looping(&self) -> bool {
        matches!(self, CycleCheck::Looping { .. })
    }
}

/// Per-path hash histories, shared by every rule.
///
/// Histories are created on the first observed change and never evicted, so
/// memory grows with the number of distinct files that ever changed.
#[derive(Debug)]
pub struct CycleDetector {
    fs: Arc<dyn FileSystem>,
    histories: HashMap<PathBuf, HashHistory>,
}

impl CycleDetector {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            histories: HashMap::new(),
        }
    }

    /// Hash `path`, record it and warn if the file looks stuck in a loop.
    pub fn check(&mut self, path: &Path) -> CycleCheck {
        if !self.fs.exists(path) {
            return CycleCheck::Skipped;
        }

        let digest = match compute_file_hash(self.fs.as_ref(), path) {
            Ok(d) => d,
            Err(err) => {
                debug!(path = ?path, error = %err, "could not hash file; skipping loop check");
                return CycleCheck::Skipped;
            }
        };

        let outcome = self.record(path, digest);
        if let CycleCheck::Looping { occurrences } = outcome {
            warn!(
                path = ?path,
                occurrences,
                window = HISTORY_CAPACITY,
                "file keeps settling on the same content; it may be stuck in a change loop"
            );
        }
        outcome
    }

    /// Record an already computed digest for `path`.
    pub fn record(&mut self, path: &Path, digest: String) -> CycleCheck {
        let history = self
            .histories
            .entry(path.to_path_buf())
            .or_insert_with(HashHistory::new);

        history.push(digest.clone());
        let occurrences = history.occurrences(&digest);

        if occurrences >= LOOP_THRESHOLD {
            CycleCheck::Looping { occurrences }
        } else {
            CycleCheck::Clear
        }
    }

    pub fn history(&self, path: &Path) -> Option<&HashHistory> {
        self.histories.get(path)
    }

    /// Number of distinct paths with a history.
    pub fn tracked_paths(&self) -> usize {
        self.histories.len()
    }
}
