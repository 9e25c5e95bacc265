//! Command: install every missing tool.
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::Logger;
use crate::orchestrator::Orchestrator;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, the report cannot be
/// written, or the run did not succeed (the first unrecovered error).
pub fn run(
    global: &GlobalOpts,
    opts: &InstallOpts,
    log: &Arc<Logger>,
    interrupt: Arc<AtomicBool>,
) -> Result<()> {
    let version = super::version::current();
    log.info(&format!("workstation {version}"));

    let setup = CommandSetup::init(global, log)?;
    let tasks = setup.manifest.select(&opts.only, &opts.skip)?;
    log.info(&format!("policy: {}", opts.policy));

    // Probes after a simulated install cannot observe anything real.
    let verify = !global.dry_run;

    let mut orchestrator = Orchestrator::new(
        tasks,
        opts.policy,
        setup.executor,
        Arc::clone(log) as _,
        setup.env,
    )?
    .with_preflight(setup.manifest.preflight_checks())
    .with_postflight(verify)
    .with_interrupt(interrupt);
    if let Some(secs) = global.timeout {
        orchestrator = orchestrator.with_timeout(Duration::from_secs(secs));
    }

    let report = orchestrator.run();
    log.print_summary();
    log.info(&format!("finished in {:.1}s", report.elapsed().as_secs_f64()));

    if let Some(path) = &opts.report {
        report.write_json(path)?;
        log.info(&format!("report written to {}", path.display()));
    }

    if let Some(err) = report.error() {
        return Err(err.into());
    }

    if !global.dry_run && !setup.manifest.hints.is_empty() {
        log.stage("Next steps");
        for hint in &setup.manifest.hints {
            log.info(hint);
        }
    }
    log.success("setup complete");
    Ok(())
}
