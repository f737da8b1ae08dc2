//! End-to-end runs against the real file system through `notify`.

mod common;

use std::fs;

use bistro::{Bistro, BistroError, BistroOptions, Method};
use bistro_test_utils::{FinishLog, Recorder, TaskSetBuilder};
use common::{init_tracing, settle_watch, wait_until, with_timeout, TestResult};
use tempfile::tempdir;

#[tokio::test]
async fn startup_runs_existing_files_once() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    fs::write(root.join("index.test"), "one")?;
    fs::create_dir(root.join("sub"))?;
    fs::write(root.join("sub").join("deep.test"), "two")?;
    fs::write(root.join("skip.txt"), "")?;

    let recorder = Recorder::new();
    let tasks = TaskSetBuilder::new()
        .recorded("top", "*.test", &["all"], &recorder)
        .recorded("all", "**/*.test", &[], &recorder)
        .build();
    let log = FinishLog::new();
    let options = BistroOptions::new()
        .base_dir(&root)
        .on_task_finish(log.callback());

    let bistro = Bistro::new(tasks, options)?;
    with_timeout(bistro.start()).await?;

    let calls: Vec<_> = recorder
        .calls()
        .into_iter()
        .map(|c| (c.task, c.path))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("top".to_string(), root.join("index.test")),
            ("all".to_string(), root.join("index.test")),
            ("all".to_string(), root.join("sub").join("deep.test")),
        ]
    );
    assert!(log.next().await.is_bulk());

    bistro.stop();
    Ok(())
}

#[tokio::test]
async fn created_and_removed_files_reach_their_task_once() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    let dep = root.join("a.dep");
    fs::write(&dep, "")?;

    let recorder = Recorder::new();
    let tasks = TaskSetBuilder::new()
        .recorded("watch", "*.test", &["after"], &recorder)
        .recorded("after", "*.dep", &[], &recorder)
        .build();
    let bistro = Bistro::new(tasks, BistroOptions::new().base_dir(&root))?;
    with_timeout(bistro.start()).await?;
    recorder.clear();

    let created = root.join("new.test");
    fs::write(&created, "hello")?;
    assert!(
        wait_until(|| recorder.calls_for("after").len() == 1).await,
        "cascade for a created file: {:?}",
        recorder.calls()
    );
    settle_watch().await;

    let calls: Vec<_> = recorder
        .calls()
        .into_iter()
        .map(|c| (c.task, c.method, c.path))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("watch".to_string(), Method::Update, created.clone()),
            ("after".to_string(), Method::Update, dep.clone()),
        ]
    );

    recorder.clear();
    fs::remove_file(&created)?;
    assert!(
        wait_until(|| recorder.calls_for("after").len() == 1).await,
        "cascade for a deleted file: {:?}",
        recorder.calls()
    );
    settle_watch().await;

    let methods: Vec<_> = recorder
        .calls_for("watch")
        .into_iter()
        .map(|c| (c.method, c.path))
        .collect();
    assert_eq!(methods, vec![(Method::Remove, created)]);
    assert_eq!(recorder.calls_for("after").len(), 1);

    bistro.stop();
    Ok(())
}

#[tokio::test]
async fn repeated_writes_in_one_burst_update_once() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    let file = root.join("index.test");
    fs::write(&file, "v1")?;

    let recorder = Recorder::new();
    let tasks = TaskSetBuilder::new()
        .recorded("watch", "*.test", &[], &recorder)
        .build();
    let bistro = Bistro::new(tasks, BistroOptions::new().base_dir(&root))?;
    with_timeout(bistro.start()).await?;
    recorder.clear();

    fs::write(&file, "v2")?;
    fs::write(&file, "v3")?;
    assert!(wait_until(|| !recorder.is_empty()).await);
    settle_watch().await;

    let methods: Vec<_> = recorder.calls().into_iter().map(|c| c.method).collect();
    assert_eq!(methods, vec![Method::Update]);

    bistro.stop();
    Ok(())
}

#[tokio::test]
async fn missing_base_dir_fails_watch_setup() -> TestResult {
    let dir = tempdir()?;
    let missing = dir.path().join("does-not-exist");

    let tasks = TaskSetBuilder::new()
        .recorded("watch", "*.test", &[], &Recorder::new())
        .build();
    let bistro = Bistro::new(tasks, BistroOptions::new().base_dir(&missing))?;

    let err = bistro.start().await.unwrap_err();
    assert!(matches!(err, BistroError::WatchSetup { .. }), "got {err:?}");
    Ok(())
}
