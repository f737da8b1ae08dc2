pub mod builders;
pub mod project;
pub mod recorder;

pub use builders::TaskSetBuilder;
pub use project::MockProject;
pub use recorder::{failing, FinishLog, RecordedCall, Recorder};

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Filtered by `RUST_LOG` (default `info`), not `BISTRO_LOG`, which only the
/// binary reads. Output shows up for failing tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Startup and cascades on the real watcher finish well within this.
const TEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Await `f`, panicking if a `Bistro` operation hangs.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("bistro operation did not finish within {TEST_TIMEOUT:?}"),
    }
}
