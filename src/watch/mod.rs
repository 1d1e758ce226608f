// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Resolving rule patterns into watch roots, matchers and current matches.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Holding raw events until writes settle.
//! - Content hashing and change-loop detection.
//!
//! It does **not** know about actions or debouncing; those live in the engine.

pub mod cycle;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod settle;
pub mod watcher;

pub use cycle::{CycleCheck, CycleDetector, HashHistory, HISTORY_CAPACITY, LOOP_THRESHOLD};
pub use hash::compute_file_hash;
pub use patterns::{
    expand, has_wildcard, matcher_for, watch_root_of, Matcher, ResolvedWatch, WatchTarget,
};
pub use settle::{ChangeKind, SettleBuffer, SettledChange};
pub use watcher::{subscribe, RawChange, Subscription};
