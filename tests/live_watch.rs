// tests/live_watch.rs

mod common;
use crate::common::{canonical, init_tracing, test_options, write_file, RecordingDispatcher};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;

use rulewatch::engine::{EngineState, RuleEngine};
use rulewatch::errors::RulewatchError;
use rulewatch::exec::{DispatchMode, RealDispatcher};
use rulewatch::fs::RealFileSystem;
use rulewatch::types::HostMode;
use rulewatch::{Action, WatchRule};

type TestResult = Result<(), Box<dyn Error>>;

/// Poll `cond` every 20ms until it holds or `limit` elapses.
async fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

async fn watching_engine(
    root: &Path,
    rules: Vec<WatchRule>,
    dispatcher: &RecordingDispatcher,
) -> Result<RuleEngine<RecordingDispatcher>, Box<dyn Error>> {
    let mut engine = RuleEngine::new(
        rules,
        test_options(root, HostMode::Interactive),
        Arc::new(RealFileSystem),
        dispatcher.clone(),
    )?;
    engine.before_first_run().await?;
    assert_eq!(engine.state(), EngineState::Watching);
    Ok(engine)
}

#[tokio::test]
async fn created_file_dispatches_once_for_its_absolute_path() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());
    std::fs::create_dir_all(root.join("src"))?;
    write_file(root.join("src/existing.gen.ts"), "old");

    let dispatcher = RecordingDispatcher::new();
    let rule = WatchRule::new(["src/*.gen.ts"], Action::command("true"));
    let mut engine = watching_engine(&root, vec![rule], &dispatcher).await?;

    write_file(root.join("src/notes.txt"), "unrelated");
    write_file(root.join("src/foo.gen.ts"), "export {}");

    assert!(wait_until(Duration::from_secs(5), || dispatcher.count() >= 1).await);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let dispatched = dispatcher.dispatched();
    assert_eq!(dispatched.len(), 1, "dispatched: {dispatched:?}");
    assert_eq!(dispatched[0].path, root.join("src/foo.gen.ts"));
    assert_eq!(dispatched[0].mode, DispatchMode::Detach);

    let stats = engine.on_shutdown().await.expect("live loop stats");
    assert_eq!(stats.dispatched, 1);
    assert!(stats.unmatched >= 1);
    Ok(())
}

#[tokio::test]
async fn shared_rule_collapses_a_burst_of_changes() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());
    std::fs::create_dir_all(root.join("schema"))?;

    let dispatcher = RecordingDispatcher::new();
    let rule = WatchRule::new(["schema/*.graphql"], Action::command("true"))
        .shared_action(true)
        .named("codegen");
    let mut engine = watching_engine(&root, vec![rule], &dispatcher).await?;

    for name in ["a", "b", "c"] {
        write_file(root.join(format!("schema/{name}.graphql")), "type Q { x: Int }");
    }

    assert!(wait_until(Duration::from_secs(5), || dispatcher.count() >= 1).await);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(dispatcher.count(), 1);

    engine.on_shutdown().await;
    Ok(())
}

#[tokio::test]
async fn watches_directories_created_after_start() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());

    let dispatcher = RecordingDispatcher::new();
    let rule = WatchRule::new(["generated/types.ts"], Action::command("true"));
    let mut engine = watching_engine(&root, vec![rule], &dispatcher).await?;

    std::fs::create_dir_all(root.join("generated"))?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    write_file(root.join("generated/types.ts"), "export type A = 1;");

    assert!(wait_until(Duration::from_secs(5), || dispatcher.count() >= 1).await);
    assert_eq!(dispatcher.paths()[0], root.join("generated/types.ts"));

    engine.on_shutdown().await;
    Ok(())
}

#[tokio::test]
async fn glob_parent_created_after_start_is_watched() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());

    let dispatcher = RecordingDispatcher::new();
    let rule = WatchRule::new(["gen/*.ts"], Action::command("true"));
    let mut engine = watching_engine(&root, vec![rule], &dispatcher).await?;

    std::fs::create_dir_all(root.join("gen"))?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    write_file(root.join("gen/a.ts"), "export const a = 1;");

    assert!(wait_until(Duration::from_secs(5), || dispatcher.count() >= 1).await);
    assert_eq!(dispatcher.paths(), vec![root.join("gen/a.ts")]);

    engine.on_shutdown().await;
    Ok(())
}

#[tokio::test]
async fn created_directory_is_not_dispatched() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());
    std::fs::create_dir_all(root.join("src"))?;

    let dispatcher = RecordingDispatcher::new();
    let rule = WatchRule::new(["src/*"], Action::command("true"));
    let mut engine = watching_engine(&root, vec![rule], &dispatcher).await?;

    std::fs::create_dir_all(root.join("src/subdir"))?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    write_file(root.join("src/file.txt"), "x");

    assert!(wait_until(Duration::from_secs(5), || dispatcher.count() >= 1).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(dispatcher.paths(), vec![root.join("src/file.txt")]);

    engine.on_shutdown().await;
    Ok(())
}

#[tokio::test]
async fn failing_action_does_not_block_next_event() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());
    std::fs::create_dir_all(root.join("src"))?;

    let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
    let action = {
        let seen = Arc::clone(&seen);
        Action::callback(move |path| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(path);
                Err::<(), _>(anyhow::anyhow!("generator crashed"))
            }
        })
    };
    let rule = WatchRule::new(["src/*.ts"], action);
    let mut engine = RuleEngine::new(
        vec![rule],
        test_options(&root, HostMode::Interactive),
        Arc::new(RealFileSystem),
        RealDispatcher::default(),
    )?;
    engine.before_first_run().await?;

    write_file(root.join("src/a.ts"), "a");
    assert!(wait_until(Duration::from_secs(5), || !seen.lock().unwrap().is_empty()).await);

    write_file(root.join("src/b.ts"), "b");
    assert!(
        wait_until(Duration::from_secs(5), || {
            seen.lock().unwrap().contains(&root.join("src/b.ts"))
        })
        .await
    );

    engine.on_shutdown().await;
    Ok(())
}

#[tokio::test]
async fn shutdown_is_idempotent_and_final() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());

    let dispatcher = RecordingDispatcher::new();
    let rule = WatchRule::new(["*.txt"], Action::command("true"));
    let mut engine = watching_engine(&root, vec![rule], &dispatcher).await?;

    assert!(engine.on_shutdown().await.is_some());
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(engine.on_shutdown().await.is_none());
    assert_eq!(engine.state(), EngineState::Stopped);

    assert!(matches!(
        engine.start_watching(),
        Err(RulewatchError::Lifecycle(_))
    ));

    write_file(root.join("late.txt"), "after shutdown");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(dispatcher.count(), 0);
    Ok(())
}

#[tokio::test]
async fn slow_action_is_abandoned_after_grace() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = canonical(dir.path());

    let action = Action::callback(|_| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        anyhow::Ok(())
    });
    let rule = WatchRule::new(["*.txt"], action);
    let mut options = test_options(&root, HostMode::Interactive);
    options.shutdown_grace = Duration::from_millis(100);
    let mut engine = RuleEngine::new(
        vec![rule],
        options,
        Arc::new(RealFileSystem),
        RealDispatcher::default(),
    )?;
    engine.before_first_run().await?;

    write_file(root.join("slow.txt"), "x");
    tokio::time::sleep(Duration::from_millis(500)).await;

    let stats = common::with_timeout(engine.on_shutdown())
        .await
        .expect("live loop stats");
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.abandoned, 1);
    Ok(())
}
