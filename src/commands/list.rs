//! Command: print the tasks in the manifest.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{self, Manifest};
use crate::install::CustomAction;

/// Print each task with its description, probes, and steps to stdout.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts) -> Result<()> {
    let path = config::resolve_manifest_path(global.manifest.as_deref());
    let (manifest, source) = Manifest::load(path.as_deref())?;
    println!("{}", render(&manifest, &source.to_string()));
    Ok(())
}

/// Render the task listing as plain text.
#[must_use]
pub fn render(manifest: &Manifest, source: &str) -> String {
    let mut out = format!("# {source}\n");
    for (index, task) in manifest.tasks.iter().enumerate() {
        out.push_str(&format!("\n{}. {}\n", index + 1, task.name()));
        if let Some(description) = task.description() {
            out.push_str(&format!("   {description}\n"));
        }
        for probe in task.detection_probes() {
            out.push_str(&format!("   detect:  {probe}\n"));
        }
        for step in task.install_steps() {
            out.push_str(&format!("   install: {step}\n"));
        }
        if *task.custom_action() != CustomAction::None {
            out.push_str(&format!("   action:  {}\n", task.custom_action()));
        }
    }
    out
}
