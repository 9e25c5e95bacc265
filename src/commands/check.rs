//! Command: report which tasks are already satisfied.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::{CheckOpts, GlobalOpts};
use crate::logging::{Logger, TaskStatus};

/// Run the check command: detection only, nothing is installed.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or any selected task is
/// missing or cannot be probed.
pub fn run(global: &GlobalOpts, opts: &CheckOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let tasks = setup.manifest.select(&opts.only, &opts.skip)?;

    log.stage("Detecting");
    for task in &tasks {
        match task.detect(setup.executor.as_ref(), &setup.env) {
            Ok(detection) if detection.installed => {
                let version = detection.version.lines().next().unwrap_or_default();
                log.debug(&format!("{}: {version}", task.name()));
                log.record_task(
                    task.name(),
                    TaskStatus::AlreadyInstalled,
                    Some(version).filter(|v| !v.is_empty()),
                );
            }
            Ok(_) => {
                log.record_task(task.name(), TaskStatus::Missing, None);
            }
            Err(e) => {
                log.error(&format!("{}: {e}", task.name()));
                log.record_task(task.name(), TaskStatus::Failed, Some(&e.to_string()));
            }
        }
    }

    log.print_summary();

    let summary = log.summary();
    if summary.failed > 0 {
        anyhow::bail!("{} task(s) could not be checked", summary.failed);
    }
    if summary.missing > 0 {
        anyhow::bail!("{} task(s) missing", summary.missing);
    }
    Ok(())
}
