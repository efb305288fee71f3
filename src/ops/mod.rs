//! High-level operations.
//!
//! This module contains the implementation of Shipwright commands.

pub mod compile;
pub mod doctor;
pub mod init;

pub use compile::{BuildResult, BuildState, CompileOptions, Orchestrator};
pub use doctor::{doctor, format_report, CheckResult, DoctorReport};
pub use init::{init_project, InitOptions};
