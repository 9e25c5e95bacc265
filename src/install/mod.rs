//! Idempotent install engine: detect, install if missing, confirm version.
//!
//! A [`Task`] is plain data. The [`Engine`] walks it through the
//! [`Phase`] state machine and always returns an [`Outcome`]; task-level
//! errors are captured, never propagated.
pub mod action;
pub mod engine;
pub mod outcome;
pub mod task;

pub use action::{ActionChange, CustomAction, HostEnv};
pub use engine::{Engine, Phase};
pub use outcome::Outcome;
pub use task::{CommandSpec, Detection, Task};
