//! Shipwright - release builds for self-contained Python application launchers
//!
//! This crate provides the core library functionality for Shipwright:
//! platform resolution, toolchain strategy selection, tool installation,
//! the cargo invocation and artifact publication.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for Shipwright unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a mock process executor and project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    platform::TargetPlatform, profile::BuildProfile, project::ProjectDescriptor,
};

pub use ops::compile::{BuildResult, CompileOptions, Orchestrator};
pub use util::context::GlobalContext;
pub use util::errors::BuildError;
