//! `workstation` binary: parse arguments, set up logging and Ctrl-C, dispatch.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;

use workstation_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let command = match &args.command {
        cli::Command::Install(_) => "install",
        cli::Command::Check(_) => "check",
        cli::Command::List => "list",
        cli::Command::Version => {
            commands::version::run();
            return Ok(());
        }
    };

    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    // Ctrl-C is honoured at the next task boundary; the child process in
    // flight receives the signal on its own.
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        log.warn(&format!("could not install Ctrl-C handler: {e}"));
    }

    let result = match args.command {
        cli::Command::Install(opts) => commands::install::run(&args.global, &opts, &log, interrupt),
        cli::Command::Check(opts) => commands::check::run(&args.global, &opts, &log),
        cli::Command::List => commands::list::run(&args.global),
        cli::Command::Version => Ok(()),
    };

    if let Err(e) = &result {
        log.error(&format!("{e:#}"));
    }
    result
}
