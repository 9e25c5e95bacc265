//! Command: print version information.

/// Version string: `WORKSTATION_VERSION` at build time, else the crate
/// version.
#[must_use]
pub fn current() -> &'static str {
    option_env!("WORKSTATION_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the workstation version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("workstation {}", current());
}
