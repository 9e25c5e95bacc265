//! Command execution capability.
//!
//! Everything the engine does to the outside world goes through the
//! [`Executor`] trait.  [`SystemExecutor`] spawns real subprocesses;
//! [`DryRunExecutor`] suppresses every side-effecting invocation and records
//! it instead, so a dry run is selected once at construction time rather than
//! by branching inside task logic.
use anyhow::{Context, Result, bail};
use std::io::ErrorKind;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output (empty when output was streamed).
    pub stdout: String,
    /// Captured standard error (empty when output was streamed).
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, when the process ran and exited normally.
    pub code: Option<i32>,
}

impl ExecResult {
    /// A successful result carrying `stdout`.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// A failed result for a program that could not be started at all.
    #[must_use]
    pub fn not_started(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason.into(),
            success: false,
            code: None,
        }
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over process execution.
///
/// Implementations must be synchronous: each call blocks until the invoked
/// program exits.
// mockall cannot mock elided lifetimes nested inside a slice.
#[cfg_attr(test, mockall::automock)]
#[allow(clippy::needless_lifetimes)]
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a program with its output streamed to the console.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or exits non-zero.
    fn run<'a>(&self, program: &str, args: &[&'a str]) -> Result<ExecResult>;

    /// Run a program capturing its output; a non-zero exit is reported through
    /// [`ExecResult::success`] rather than as an error.
    ///
    /// A program that is missing from `PATH` (or not executable) is also
    /// reported as an unsuccessful result.
    ///
    /// # Errors
    ///
    /// Returns an error only when the execution environment itself fails
    /// (e.g. the process table is exhausted).
    fn run_unchecked<'a>(&self, program: &str, args: &[&'a str]) -> Result<ExecResult>;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;

    /// Called by the engine before each task starts.  Executors holding
    /// per-task state drop it here.
    fn begin_task(&self) {}
}

/// Render a program and its arguments as a single display string.
#[must_use]
pub fn command_line(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

/// Production [`Executor`] that spawns real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to execute: {}", command_line(program, args)))?;
        if !status.success() {
            bail!(
                "{} failed (exit {})",
                command_line(program, args),
                status.code().unwrap_or(-1)
            );
        }
        Ok(ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            code: status.code(),
        })
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => Ok(ExecResult::from(output)),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                Ok(ExecResult::not_started(format!("{program}: {e}")))
            }
            Err(e) => Err(e).with_context(|| {
                format!("failed to execute: {}", command_line(program, args))
            }),
        }
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Recording, side-effect-free [`Executor`] used for dry runs.
///
/// Side-effecting calls ([`Executor::run`]) are never forwarded: they are
/// logged, recorded, and reported as successful.  Read-only calls
/// ([`Executor::run_unchecked`], [`Executor::which`]) are forwarded to the
/// wrapped executor, since detection probes are side-effect-free.
///
/// The first captured call after one or more suppressed calls is reported as
/// a simulated success with [`DRY_RUN_VERSION`] as its output if the real
/// call fails, so a simulated install is followed by a simulated version
/// check.  [`Executor::begin_task`] clears that state, so a task that never
/// probes after its suppressed calls cannot leak a simulated success into
/// the next task.
#[derive(Debug)]
pub struct DryRunExecutor {
    inner: Arc<dyn Executor>,
    suppressed: Mutex<Vec<String>>,
    pending: AtomicBool,
}

/// Output reported for a version probe that follows a simulated install.
pub const DRY_RUN_VERSION: &str = "(dry run)";

impl DryRunExecutor {
    /// Wrap `inner`, which is only ever used for read-only calls.
    #[must_use]
    pub fn new(inner: Arc<dyn Executor>) -> Self {
        Self {
            inner,
            suppressed: Mutex::new(Vec::new()),
            pending: AtomicBool::new(false),
        }
    }

    /// Command lines that were suppressed, in invocation order.
    #[must_use]
    pub fn suppressed(&self) -> Vec<String> {
        self.suppressed
            .lock()
            .map_or_else(|_| Vec::new(), |guard| guard.clone())
    }
}

impl Executor for DryRunExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let line = command_line(program, args);
        tracing::info!(target: "workstation::dry_run", "would run: {line}");
        if let Ok(mut guard) = self.suppressed.lock() {
            guard.push(line);
        }
        self.pending.store(true, Ordering::SeqCst);
        Ok(ExecResult::ok(String::new()))
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.inner.run_unchecked(program, args)?;
        let simulate = self.pending.swap(false, Ordering::SeqCst);
        if simulate && !result.success {
            return Ok(ExecResult::ok(DRY_RUN_VERSION));
        }
        Ok(result)
    }

    fn which(&self, program: &str) -> bool {
        self.inner.which(program)
    }

    fn begin_task(&self) {
        self.pending.store(false, Ordering::SeqCst);
        self.inner.begin_task();
    }
}
