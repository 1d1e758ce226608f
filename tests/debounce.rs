// tests/debounce.rs

mod common;
use crate::common::init_tracing;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rulewatch::engine::{DebounceGate, Decision, RuleCore};
use rulewatch::fs::mock::MockFileSystem;
use rulewatch::watch::{CycleCheck, CycleDetector};
use rulewatch::{Action, WatchRule};

const WINDOW: Duration = Duration::from_millis(100);

fn core_for(rules: Vec<WatchRule>, cycle: Option<CycleDetector>) -> RuleCore {
    RuleCore::new(Arc::new(rules), Path::new("/proj"), WINDOW, cycle).expect("valid rules")
}

#[test]
fn gate_accepts_first_and_rejects_within_window() {
    let mut gate = DebounceGate::new(WINDOW);
    let t0 = Instant::now();

    assert!(gate.admit(t0));
    assert!(!gate.admit(t0 + Duration::from_millis(50)));
    assert!(!gate.admit(t0 + WINDOW));
    assert!(gate.admit(t0 + WINDOW + Duration::from_millis(1)));
    assert_eq!(gate.last_accepted(), Some(t0 + WINDOW + Duration::from_millis(1)));
}

#[test]
fn rejected_triggers_do_not_extend_the_window() {
    let mut gate = DebounceGate::new(WINDOW);
    let t0 = Instant::now();

    assert!(gate.admit(t0));
    assert!(!gate.admit(t0 + Duration::from_millis(90)));
    assert!(gate.admit(t0 + Duration::from_millis(150)));
}

#[test]
fn shared_rule_collapses_simultaneous_changes() {
    init_tracing();
    let rule = WatchRule::new(["src/*.ts"], Action::command("true")).shared_action(true);
    let mut core = core_for(vec![rule], None);
    let t0 = Instant::now();

    let first = core.on_change(0, Path::new("/proj/src/a.ts"), t0);
    let second = core.on_change(0, Path::new("/proj/src/b.ts"), t0 + Duration::from_millis(5));

    assert_eq!(
        first,
        Decision::Dispatch {
            path: "/proj/src/a.ts".into(),
            cycle: CycleCheck::Skipped,
        }
    );
    assert_eq!(second, Decision::Debounced);

    let later = core.on_change(0, Path::new("/proj/src/b.ts"), t0 + Duration::from_millis(250));
    assert!(matches!(later, Decision::Dispatch { .. }));
}

#[test]
fn non_shared_rule_dispatches_every_change() {
    let rule = WatchRule::new(["src/*.ts"], Action::command("true"));
    let mut core = core_for(vec![rule], None);
    let t0 = Instant::now();

    for name in ["a", "b", "c"] {
        let path = format!("/proj/src/{name}.ts");
        assert!(matches!(
            core.on_change(0, Path::new(&path), t0),
            Decision::Dispatch { .. }
        ));
    }
}

#[test]
fn unmatched_path_is_not_dispatched_and_does_not_consume_the_gate() {
    let rule = WatchRule::new(["src/*.ts"], Action::command("true")).shared_action(true);
    let mut core = core_for(vec![rule], None);
    let t0 = Instant::now();

    assert_eq!(core.on_change(0, Path::new("/proj/src/a.css"), t0), Decision::NoMatch);
    assert!(matches!(
        core.on_change(0, Path::new("/proj/src/a.ts"), t0),
        Decision::Dispatch { .. }
    ));
    assert_eq!(core.on_change(7, Path::new("/proj/src/a.ts"), t0), Decision::NoMatch);
}

#[test]
fn gates_are_independent_per_rule() {
    let rules = vec![
        WatchRule::new(["src/*.ts"], Action::command("true")).shared_action(true),
        WatchRule::new(["src/**/*"], Action::command("true")).shared_action(true),
    ];
    let mut core = core_for(rules, None);
    let t0 = Instant::now();
    let p = Path::new("/proj/src/a.ts");

    assert!(matches!(core.on_change(0, p, t0), Decision::Dispatch { .. }));
    assert!(matches!(core.on_change(1, p, t0), Decision::Dispatch { .. }));
}

#[test]
fn looping_file_is_still_dispatched() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/a.ts", "same");
    let rule = WatchRule::new(["src/*.ts"], Action::command("true"));
    let mut core = core_for(vec![rule], Some(CycleDetector::new(Arc::new(fs))));
    let t0 = Instant::now();
    let p = Path::new("/proj/src/a.ts");

    core.on_change(0, p, t0);
    core.on_change(0, p, t0);
    match core.on_change(0, p, t0) {
        Decision::Dispatch { cycle, .. } => assert!(cycle.is_looping()),
        other => panic!("expected dispatch, got {other:?}"),
    }
}
