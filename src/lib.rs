//! Workstation provisioning engine.
//!
//! Installs a set of developer tools idempotently: each tool is described by
//! a declarative [`install::Task`] (how to detect it, how to install it, what
//! to do afterwards), and the engine only installs what detection reports as
//! missing, then confirms the installed version with the same probes.
//!
//! The public API is organised into these layers:
//!
//! - **[`exec`]**: the command execution seam, with real and dry-run executors
//! - **[`install`]**: tasks, outcomes, and the per-task state machine
//! - **[`orchestrator`]**: pre-flight checks, failure policy, deadline, post-flight verification, run report
//! - **[`config`]**: the TOML task manifest
//! - **[`commands`]**: top-level subcommands (`install`, `check`, `list`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod install;
pub mod logging;
pub mod orchestrator;
