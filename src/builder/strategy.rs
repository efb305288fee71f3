//! Toolchain strategy selection.
//!
//! Decides, from the host and target platforms, whether cargo can build
//! natively or needs a cross-compilation wrapper. Selection is pure: the
//! auto-upgrade from native to a cross strategy is reported through
//! [`StrategySelection::upgraded`] and announced by the caller.

use std::fmt;

use serde::Serialize;

use crate::core::platform::{Abi, Arch, Os, TargetPlatform};
use crate::util::errors::BuildError;

/// How cargo is driven for a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainStrategy {
    /// Plain `cargo build`
    #[default]
    Native,
    /// `cargo zigbuild`, with zig as the C cross-linker
    ZigCross,
    /// `cargo xwin build`, MSVC targets from non-Windows hosts
    Xwin,
}

impl ToolchainStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainStrategy::Native => "native",
            ToolchainStrategy::ZigCross => "zig",
            ToolchainStrategy::Xwin => "xwin",
        }
    }

    /// Cargo subcommand words for this strategy.
    pub fn cargo_subcommand(&self) -> &'static [&'static str] {
        match self {
            ToolchainStrategy::Native => &["build"],
            ToolchainStrategy::ZigCross => &["zigbuild"],
            ToolchainStrategy::Xwin => &["xwin", "build"],
        }
    }

    pub fn is_cross(&self) -> bool {
        !matches!(self, ToolchainStrategy::Native)
    }
}

impl fmt::Display for ToolchainStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySelection {
    pub strategy: ToolchainStrategy,
    /// The caller asked for native but the platform pair needs a cross build
    pub upgraded: bool,
}

/// Turn the user's wrapper flags into a single strategy.
pub fn requested_strategy(zig: bool, xwin: bool) -> Result<ToolchainStrategy, BuildError> {
    match (zig, xwin) {
        (true, true) => Err(BuildError::ConflictingStrategy {
            reason: "both `zig` and `xwin` are enabled".to_string(),
        }),
        (true, false) => Ok(ToolchainStrategy::ZigCross),
        (false, true) => Ok(ToolchainStrategy::Xwin),
        (false, false) => Ok(ToolchainStrategy::Native),
    }
}

/// Whether building `target` on `host` needs a cross-compilation wrapper.
pub fn requires_cross(host: &TargetPlatform, target: &TargetPlatform) -> bool {
    match host.os() {
        Os::Windows => !target.is_windows() || target.arch() == Arch::Arm64,
        Os::Linux => {
            target.os() == Os::Macos
                || (target.os() == Os::Linux
                    && target.arch() == Arch::Arm64
                    && host.arch() == Arch::Amd64)
        }
        Os::Macos => target.os() != Os::Macos,
    }
}

/// Pick the strategy for a build.
///
/// An explicit cross strategy is kept as long as it can build the target.
/// An explicit native request is upgraded to [`ToolchainStrategy::ZigCross`]
/// when the platform pair demands it.
pub fn select(
    host: &TargetPlatform,
    target: &TargetPlatform,
    explicit: ToolchainStrategy,
) -> Result<StrategySelection, BuildError> {
    match explicit {
        ToolchainStrategy::Xwin => {
            if !(target.is_windows() && target.abi() == Some(Abi::Msvc)) {
                return Err(BuildError::ConflictingStrategy {
                    reason: format!(
                        "`xwin` only builds windows msvc targets, but the target is {}",
                        target
                    ),
                });
            }
            Ok(StrategySelection {
                strategy: explicit,
                upgraded: false,
            })
        }
        ToolchainStrategy::ZigCross => Ok(StrategySelection {
            strategy: explicit,
            upgraded: false,
        }),
        ToolchainStrategy::Native if requires_cross(host, target) => Ok(StrategySelection {
            strategy: ToolchainStrategy::ZigCross,
            upgraded: true,
        }),
        ToolchainStrategy::Native => Ok(StrategySelection {
            strategy: ToolchainStrategy::Native,
            upgraded: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{resolve, supported_platforms};

    fn p(os: Os, arch: Arch) -> TargetPlatform {
        resolve(os, arch, None).unwrap()
    }

    #[test]
    fn test_wrappers_are_mutually_exclusive() {
        assert!(matches!(
            requested_strategy(true, true),
            Err(BuildError::ConflictingStrategy { .. })
        ));
        assert_eq!(requested_strategy(false, false).unwrap(), ToolchainStrategy::Native);
        assert_eq!(requested_strategy(true, false).unwrap(), ToolchainStrategy::ZigCross);
        assert_eq!(requested_strategy(false, true).unwrap(), ToolchainStrategy::Xwin);
    }

    #[test]
    fn test_linux_to_macos_is_cross() {
        let host = p(Os::Linux, Arch::Amd64);
        let target = p(Os::Macos, Arch::Arm64);

        let sel = select(&host, &target, ToolchainStrategy::Native).unwrap();
        assert_eq!(sel.strategy, ToolchainStrategy::ZigCross);
        assert!(sel.upgraded);
    }

    #[test]
    fn test_decision_table() {
        let cases = [
            // host, target, cross?
            (p(Os::Windows, Arch::Amd64), p(Os::Linux, Arch::Amd64), true),
            (p(Os::Windows, Arch::Amd64), p(Os::Windows, Arch::Arm64), true),
            (p(Os::Windows, Arch::Amd64), p(Os::Windows, Arch::Amd64), false),
            (p(Os::Linux, Arch::Amd64), p(Os::Macos, Arch::Amd64), true),
            (p(Os::Linux, Arch::Amd64), p(Os::Linux, Arch::Arm64), true),
            (p(Os::Linux, Arch::Amd64), p(Os::Linux, Arch::Amd64), false),
            (p(Os::Linux, Arch::Amd64), p(Os::Windows, Arch::Amd64), false),
            (p(Os::Linux, Arch::Arm64), p(Os::Linux, Arch::Arm64), false),
            (p(Os::Macos, Arch::Arm64), p(Os::Linux, Arch::Amd64), true),
            (p(Os::Macos, Arch::Arm64), p(Os::Macos, Arch::Amd64), false),
        ];

        for (host, target, cross) in cases {
            assert_eq!(
                requires_cross(&host, &target),
                cross,
                "host {} target {}",
                host,
                target
            );
        }
    }

    #[test]
    fn test_explicit_cross_is_never_downgraded() {
        let host = p(Os::Linux, Arch::Amd64);
        let sel = select(&host, &host, ToolchainStrategy::ZigCross).unwrap();
        assert_eq!(sel.strategy, ToolchainStrategy::ZigCross);
        assert!(!sel.upgraded);
    }

    #[test]
    fn test_xwin_requires_msvc_target() {
        let host = p(Os::Linux, Arch::Amd64);
        let msvc = resolve(Os::Windows, Arch::Amd64, Some(Abi::Msvc)).unwrap();
        let gnu = p(Os::Windows, Arch::Amd64);

        assert_eq!(
            select(&host, &msvc, ToolchainStrategy::Xwin).unwrap().strategy,
            ToolchainStrategy::Xwin
        );
        assert!(matches!(
            select(&host, &gnu, ToolchainStrategy::Xwin),
            Err(BuildError::ConflictingStrategy { .. })
        ));
    }

    #[test]
    fn test_selection_yields_single_strategy() {
        let platforms = supported_platforms();
        for host in &platforms {
            for target in &platforms {
                let sel = select(host, target, ToolchainStrategy::Native).unwrap();
                assert_eq!(sel.upgraded, sel.strategy.is_cross());
                assert_ne!(sel.strategy, ToolchainStrategy::Xwin);
            }
        }
    }
}
