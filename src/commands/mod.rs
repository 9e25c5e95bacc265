//! Top-level subcommand handlers.

pub mod check;
pub mod install;
pub mod list;
pub mod version;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{self, Manifest, ManifestSource};
use crate::exec::{DryRunExecutor, Executor, SystemExecutor};
use crate::install::HostEnv;
use crate::logging::Logger;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates manifest loading, executor selection, and host detection so
/// that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// The loaded manifest.
    pub manifest: Manifest,
    /// Where the manifest came from.
    pub source: ManifestSource,
    /// Real or dry-run executor.
    pub executor: Arc<dyn Executor>,
    /// Home directory and login shell of the current user.
    pub env: HostEnv,
}

impl CommandSetup {
    /// Load the manifest, pick the executor, and read the host environment.
    ///
    /// With `--dry-run` the system executor is wrapped in a
    /// [`DryRunExecutor`], so nothing downstream needs to know about dry runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be loaded or the home
    /// directory cannot be determined.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        log.stage("Loading manifest");
        let path = config::resolve_manifest_path(global.manifest.as_deref());
        let (manifest, source) = Manifest::load(path.as_deref())?;
        log.info(&format!(
            "loaded {} tasks from {source}",
            manifest.tasks.len()
        ));

        let warnings = manifest.validate();
        if !warnings.is_empty() {
            log.warn(&format!("found {} manifest warning(s):", warnings.len()));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        let env = HostEnv::detect().context("detecting host environment")?;
        log.debug(&format!("home: {}", env.home.display()));

        let executor: Arc<dyn Executor> = if global.dry_run {
            log.dry_run("no changes will be made");
            Arc::new(DryRunExecutor::new(Arc::new(SystemExecutor)))
        } else {
            Arc::new(SystemExecutor)
        };

        Ok(Self {
            manifest,
            source,
            executor,
            env,
        })
    }
}
