//! Core data model: platforms, profiles, the project descriptor and
//! release naming.

pub mod platform;
pub mod profile;
pub mod project;
pub mod release;

pub use platform::{host_platform, Abi, Arch, Os, TargetPlatform};
pub use profile::BuildProfile;
pub use project::{EntryPoint, ProjectDescriptor};
pub use release::release_name;
