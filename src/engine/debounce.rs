// src/engine/debounce.rs

use std::time::{Duration, Instant};

/// Time-window gate for a shared-action rule.
///
/// A trigger is accepted only if strictly more than `window` elapsed since the
/// last *accepted* trigger; dropped triggers do not extend the window. The
/// gate is per rule, not per path, so different files changing together
/// collapse into the first one.
///
/// A burst that lasts slightly longer than the window yields two accepted
/// triggers.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }

    /// Decide on a trigger arriving at `now`, recording it if accepted.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) <= self.window {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}
