// tests/property_windows.rs

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use rulewatch::engine::DebounceGate;
use rulewatch::fs::mock::MockFileSystem;
use rulewatch::watch::{
    has_wildcard, watch_root_of, CycleCheck, CycleDetector, HashHistory, HISTORY_CAPACITY,
    LOOP_THRESHOLD,
};

fn digest() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string)
}

fn pattern_segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        Just("*".to_string()),
        Just("**".to_string()),
        "[a-z]{1,3}\\*\\.[a-z]{2}",
        Just("{x,y}".to_string()),
    ]
}

proptest! {
    #[test]
    fn history_never_exceeds_capacity(digests in prop::collection::vec(digest(), 0..40)) {
        let mut history = HashHistory::new();
        for d in &digests {
            history.push(d.clone());
            prop_assert!(history.len() <= HISTORY_CAPACITY);
        }
        prop_assert_eq!(history.len(), digests.len().min(HISTORY_CAPACITY));

        let tail: Vec<&str> = digests
            .iter()
            .skip(digests.len().saturating_sub(HISTORY_CAPACITY))
            .map(String::as_str)
            .collect();
        prop_assert_eq!(history.iter().collect::<Vec<_>>(), tail);
    }

    #[test]
    fn loop_flag_matches_window_count(digests in prop::collection::vec(digest(), 1..40)) {
        let mut detector = CycleDetector::new(Arc::new(MockFileSystem::new()));
        let path = Path::new("/p/file");

        for (i, d) in digests.iter().enumerate() {
            let start = (i + 1).saturating_sub(HISTORY_CAPACITY);
            let count = digests[start..=i].iter().filter(|x| *x == d).count();

            let check = detector.record(path, d.clone());
            if count >= LOOP_THRESHOLD {
                prop_assert_eq!(check, CycleCheck::Looping { occurrences: count });
            } else {
                prop_assert_eq!(check, CycleCheck::Clear);
            }
        }
    }

    #[test]
    fn accepted_triggers_are_more_than_a_window_apart(
        window_ms in 1u64..200,
        gaps in prop::collection::vec(0u64..300, 1..50),
    ) {
        let window = Duration::from_millis(window_ms);
        let mut gate = DebounceGate::new(window);
        let start = Instant::now();
        let mut now = start;
        let mut accepted: Vec<Instant> = Vec::new();
        let first = start + Duration::from_millis(gaps[0]);

        for gap in gaps {
            now += Duration::from_millis(gap);
            if gate.admit(now) {
                accepted.push(now);
            }
        }

        prop_assert!(!accepted.is_empty());
        prop_assert_eq!(accepted[0], first);
        for pair in accepted.windows(2) {
            prop_assert!(pair[1] - pair[0] > window);
        }
    }

    #[test]
    fn watch_root_is_wildcard_free_ancestor(segments in prop::collection::vec(pattern_segment(), 1..6)) {
        let pattern = segments.join("/");
        let cwd = Path::new("/proj");
        let root = watch_root_of(&pattern, cwd);

        prop_assert!(!has_wildcard(&root.to_string_lossy()));
        if has_wildcard(&pattern) {
            prop_assert!(root.starts_with(cwd));
            let full = cwd.join(&pattern);
            prop_assert!(full.starts_with(&root));
        } else {
            prop_assert_eq!(root, cwd.join(&pattern));
        }
    }
}
