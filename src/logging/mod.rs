//! Console and file logging plus the end-of-run task summary.
//!
//! Everything is emitted through [`tracing`]; [`init_subscriber`] routes it
//! to a coloured console and to a plain per-command log file.  Engine and
//! orchestrator code only see the [`Log`] trait.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::{Logger, render_summary};
pub use subscriber::{LOG_ENV, init_subscriber};
pub use types::{Log, Summary, TaskEntry, TaskStatus};

/// A [`Logger`] whose events go only to a log file in a fresh temp dir,
/// through a thread-local subscriber that lives as long as the returned
/// guard.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("test.log");
    let layer = subscriber::FileLayer::at(&path, "test").expect("file layer");
    let dispatch = tracing::Dispatch::new(
        tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG)),
    );
    let guard = tracing::dispatcher::set_default(&dispatch);
    (Logger::with_log_file(Some(path)), tmp, guard)
}
