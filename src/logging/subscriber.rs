//! Tracing subscriber: console formatter, log file layer, and start-up.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use super::utils::{clock, log_file_path, run_header, strip_ansi};

/// Target used for stage headers.
pub const STAGE_TARGET: &str = "workstation::stage";
/// Target used for success messages.
pub const SUCCESS_TARGET: &str = "workstation::success";
/// Target used for dry-run messages.
pub const DRY_RUN_TARGET: &str = "workstation::dry_run";

/// Environment variable holding a tracing filter directive for the console,
/// e.g. `WORKSTATION_LOG=debug`.  Takes precedence over `--verbose`.
pub const LOG_ENV: &str = "WORKSTATION_LOG";

/// How an event is rendered, derived from its level and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Stage,
    Success,
    DryRun,
    Info,
    Warn,
    Error,
    Debug,
}

impl Tag {
    fn of(metadata: &tracing::Metadata<'_>) -> Self {
        match (*metadata.level(), metadata.target()) {
            (tracing::Level::ERROR, _) => Self::Error,
            (tracing::Level::WARN, _) => Self::Warn,
            (tracing::Level::INFO, STAGE_TARGET) => Self::Stage,
            (tracing::Level::INFO, SUCCESS_TARGET) => Self::Success,
            (tracing::Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (tracing::Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Plain-text prefix for the log file.
    const fn file_prefix(self) -> &'static str {
        match self {
            Self::Stage => "==> ",
            Self::Success => "    [ok] ",
            Self::DryRun => "    [dry run] ",
            Self::Info => "    ",
            Self::Warn => "    [warn] ",
            Self::Error => "    [error] ",
            Self::Debug => "    [debug] ",
        }
    }
}

/// Pulls the `message` field out of an event.
#[derive(Default)]
struct Message(String);

impl tracing::field::Visit for Message {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

fn message_of(event: &tracing::Event<'_>) -> String {
    let mut message = Message::default();
    event.record(&mut message);
    message.0
}

/// Appends every event, debug included, to the per-command log file with a
/// timestamp and without colour codes.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Layer writing to the default log file for `command`.
    pub(super) fn new(command: &str) -> Option<Self> {
        Self::at(&log_file_path(command)?, command)
    }

    /// Start `path` afresh with a run header and append to it from then on.
    pub(super) fn at(path: &Path, command: &str) -> Option<Self> {
        fs::write(path, run_header(command)).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let tag = Tag::of(event.metadata());
        let message = strip_ansi(&message_of(event));
        if let Ok(mut file) = self.file.lock() {
            // A failed log write must not disturb the run.
            let _ = writeln!(file, "[{}] {}{message}", clock(), tag.file_prefix());
        }
    }
}

/// Console rendering: bold blue stage arrows, green ticks, yellow dry-run
/// markers, red errors.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let msg = message_of(event);
        match Tag::of(event.metadata()) {
            Tag::Stage => writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Tag::Success => writeln!(writer, "  \x1b[32m✓\x1b[0m {msg}"),
            Tag::DryRun => writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
            Tag::Info => writeln!(writer, "  {msg}"),
            Tag::Warn => writeln!(writer, "\x1b[33mwarning:\x1b[0m {msg}"),
            Tag::Error => writeln!(writer, "\x1b[31merror:\x1b[0m {msg}"),
            Tag::Debug => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Console filter: `$WORKSTATION_LOG` when it parses, else debug with
/// `verbose` and info without.
fn console_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    let fallback = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber.  Call once, before anything logs.
///
/// Info and debug go to stdout, warnings and errors to stderr, and every
/// event is also appended to `$XDG_CACHE_HOME/workstation/<command>.log`.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(writer)
        .with_filter(console_filter(verbose));

    let file = FileLayer::new(command).map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry().with(console).with(file).init();
}
