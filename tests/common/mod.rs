#![allow(dead_code)]

use std::error::Error;
use std::time::Duration;

pub use bistro_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Poll `check` every 20 ms until it returns true or 5 s pass.
pub async fn wait_until<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// Give spawned tasks a moment to run; used before asserting that nothing
/// happened.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Wait out a few debounce windows of the real watcher; used before asserting
/// exact call counts.
pub async fn settle_watch() {
    tokio::time::sleep(bistro::watch::watcher::DEBOUNCE * 3).await;
}
