// Shared helpers for integration tests.
//
// Provides a temporary home directory, a manifest writer, and a fluent
// builder for orchestrators backed by real subprocesses, so each integration
// test can set up an isolated environment without repeating boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use workstation_cli::config::Manifest;
use workstation_cli::exec::{DryRunExecutor, Executor, SystemExecutor};
use workstation_cli::install::{Engine, HostEnv, Task};
use workstation_cli::logging::Logger;
use workstation_cli::orchestrator::{FailurePolicy, Orchestrator, PreflightCheck};

/// An isolated home directory backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct IntegrationTestContext {
    /// Temporary directory used as `$HOME`.
    pub home: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a new context with an empty home directory.
    pub fn new() -> Self {
        let home = tempfile::tempdir().expect("create temp dir");
        Self { home }
    }

    /// Path to the home directory.
    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Host environment rooted at the temporary home with a bash login shell.
    pub fn env(&self) -> HostEnv {
        HostEnv::new(
            self.home.path().to_path_buf(),
            Some("/bin/bash".to_string()),
        )
    }

    /// Write `content` as `tasks.toml` in the home directory and return its path.
    pub fn write_manifest(&self, content: &str) -> PathBuf {
        let path = self.home.path().join("tasks.toml");
        std::fs::write(&path, content).expect("write manifest");
        path
    }

    /// Load a manifest previously written with [`Self::write_manifest`].
    pub fn load_manifest(&self, content: &str) -> Manifest {
        let path = self.write_manifest(content);
        Manifest::load(Some(&path)).expect("load manifest").0
    }

    /// Engine over the real system executor.
    pub fn engine(&self) -> (Engine, Arc<Logger>) {
        let log = Arc::new(Logger::with_log_file(None));
        let engine = Engine::new(Arc::new(SystemExecutor), Arc::clone(&log) as _, self.env());
        (engine, log)
    }
}

/// Fluent builder for an [`Orchestrator`] over real subprocesses.
pub struct OrchestratorBuilder {
    tasks: Vec<Task>,
    policy: FailurePolicy,
    dry_run: bool,
    preflight: Vec<PreflightCheck>,
    timeout: Option<Duration>,
    env: HostEnv,
}

impl OrchestratorBuilder {
    /// Begin building an orchestrator for `tasks` under `policy`.
    pub fn new(ctx: &IntegrationTestContext, tasks: Vec<Task>, policy: FailurePolicy) -> Self {
        Self {
            tasks,
            policy,
            dry_run: false,
            preflight: Vec::new(),
            timeout: None,
            env: ctx.env(),
        }
    }

    /// Wrap the system executor in a dry-run executor.
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Add pre-flight checks.
    pub fn preflight(mut self, checks: Vec<PreflightCheck>) -> Self {
        self.preflight = checks;
        self
    }

    /// Set the run deadline.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Finalise the orchestrator and return it with its logger.
    pub fn build(self) -> (Orchestrator, Arc<Logger>) {
        let log = Arc::new(Logger::with_log_file(None));
        let executor: Arc<dyn Executor> = if self.dry_run {
            Arc::new(DryRunExecutor::new(Arc::new(SystemExecutor)))
        } else {
            Arc::new(SystemExecutor)
        };
        let mut orchestrator = Orchestrator::new(
            self.tasks,
            self.policy,
            executor,
            Arc::clone(&log) as _,
            self.env,
        )
        .expect("valid task names")
        .with_preflight(self.preflight)
        .with_postflight(!self.dry_run);
        if let Some(timeout) = self.timeout {
            orchestrator = orchestrator.with_timeout(timeout);
        }
        (orchestrator, log)
    }
}
