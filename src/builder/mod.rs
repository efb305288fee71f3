//! Build pipeline stages.
//!
//! Each stage is a small, separately testable unit; [`crate::ops::compile`]
//! drives them in order.

pub mod artifact;
pub mod context;
pub mod events;
pub mod installer;
pub mod invoker;
pub mod postprocess;
pub mod strategy;

pub use context::BuildContext;
pub use events::BuildEvent;
pub use installer::{InstallOptions, PreparedTools, ToolInstaller};
pub use invoker::CargoInvocation;
pub use postprocess::PostProcess;
pub use strategy::{StrategySelection, ToolchainStrategy};
