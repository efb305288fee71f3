//! Target platform resolution.
//!
//! A [`TargetPlatform`] can only be obtained through [`resolve`] (or the
//! parsing helpers built on it), so every value in circulation maps to
//! exactly one compiler triple. Unknown combinations are rejected with
//! [`BuildError::UnsupportedPlatform`]; there is no fallback triple.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::errors::BuildError;

/// Operating system of a build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" | "osx" | "apple" => Ok(Os::Macos),
            "windows" | "win" | "win32" => Ok(Os::Windows),
            _ => Err(PlatformParseError::new("operating system", s)),
        }
    }
}

/// CPU architecture of a build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    /// Architecture component used in compiler triples.
    fn triple_component(&self) -> &'static str {
        match self {
            Arch::Amd64 => "x86_64",
            Arch::Arm64 => "aarch64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Ok(Arch::Amd64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            _ => Err(PlatformParseError::new("architecture", s)),
        }
    }
}

/// ABI flavor. Only meaningful for Linux and Windows targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Abi {
    Gnu,
    Msvc,
}

impl Abi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Abi::Gnu => "gnu",
            Abi::Msvc => "msvc",
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Abi {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gnu" | "mingw" => Ok(Abi::Gnu),
            "msvc" => Ok(Abi::Msvc),
            _ => Err(PlatformParseError::new("ABI", s)),
        }
    }
}

/// Error returned when a platform component string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformParseError {
    kind: &'static str,
    value: String,
}

impl PlatformParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        PlatformParseError {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for PlatformParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for PlatformParseError {}

/// A resolved build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TargetPlatform {
    os: Os,
    arch: Arch,
    abi: Option<Abi>,
    #[serde(skip)]
    triple: &'static str,
}

/// Supported (os, arch, abi) combinations and their compiler triples.
///
/// The first entry for a given (os, arch) is the default when no ABI hint
/// is supplied.
const PLATFORM_TABLE: &[(Os, Arch, Option<Abi>, &str)] = &[
    (Os::Linux, Arch::Amd64, Some(Abi::Gnu), "x86_64-unknown-linux-gnu"),
    (Os::Linux, Arch::Arm64, Some(Abi::Gnu), "aarch64-unknown-linux-gnu"),
    (Os::Macos, Arch::Amd64, None, "x86_64-apple-darwin"),
    (Os::Macos, Arch::Arm64, None, "aarch64-apple-darwin"),
    (Os::Windows, Arch::Amd64, Some(Abi::Gnu), "x86_64-pc-windows-gnu"),
    (Os::Windows, Arch::Amd64, Some(Abi::Msvc), "x86_64-pc-windows-msvc"),
    (Os::Windows, Arch::Arm64, Some(Abi::Gnu), "aarch64-pc-windows-gnullvm"),
    (Os::Windows, Arch::Arm64, Some(Abi::Msvc), "aarch64-pc-windows-msvc"),
];

/// Resolve an (os, arch, abi) request to a target platform.
pub fn resolve(os: Os, arch: Arch, abi_hint: Option<Abi>) -> Result<TargetPlatform, BuildError> {
    PLATFORM_TABLE
        .iter()
        .find(|(o, a, abi, _)| {
            *o == os
                && *a == arch
                && match abi_hint {
                    Some(hint) => *abi == Some(hint),
                    None => true,
                }
        })
        .map(|&(os, arch, abi, triple)| TargetPlatform {
            os,
            arch,
            abi,
            triple,
        })
        .ok_or_else(|| BuildError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
            abi: abi_hint.map(|a| a.to_string()),
        })
}

/// Resolve from raw strings, as found in configuration files.
pub fn resolve_str(os: &str, arch: &str, abi_hint: Option<&str>) -> Result<TargetPlatform, BuildError> {
    let unsupported = || BuildError::UnsupportedPlatform {
        os: os.to_string(),
        arch: arch.to_string(),
        abi: abi_hint.map(|a| a.to_string()),
    };

    let os_value = os.parse::<Os>().map_err(|_| unsupported())?;
    let arch_value = arch.parse::<Arch>().map_err(|_| unsupported())?;
    let abi_value = abi_hint
        .map(|a| a.parse::<Abi>())
        .transpose()
        .map_err(|_| unsupported())?;

    resolve(os_value, arch_value, abi_value)
}

/// Parse a full compiler triple back into a target platform.
pub fn from_triple(triple: &str) -> Result<TargetPlatform, BuildError> {
    PLATFORM_TABLE
        .iter()
        .find(|entry| entry.3 == triple)
        .map(|&(os, arch, abi, triple)| TargetPlatform {
            os,
            arch,
            abi,
            triple,
        })
        .ok_or_else(|| BuildError::UnsupportedPlatform {
            os: triple.to_string(),
            arch: "?".to_string(),
            abi: None,
        })
}

/// Parse either a platform identifier (`linux-amd64`, `windows-arm64-msvc`)
/// or a compiler triple (`x86_64-pc-windows-msvc`).
pub fn parse_target(spec: &str) -> Result<TargetPlatform, BuildError> {
    if let Ok(platform) = from_triple(spec) {
        return Ok(platform);
    }

    let parts: Vec<&str> = spec.split('-').collect();
    match parts.as_slice() {
        [os, arch] => resolve_str(os, arch, None),
        [os, arch, abi] => resolve_str(os, arch, Some(abi)),
        _ => Err(BuildError::UnsupportedPlatform {
            os: spec.to_string(),
            arch: "?".to_string(),
            abi: None,
        }),
    }
}

/// Query the platform of the current machine.
pub fn host_platform() -> Result<TargetPlatform, BuildError> {
    let abi = if cfg!(target_env = "msvc") {
        Some(Abi::Msvc)
    } else if cfg!(target_env = "gnu") {
        Some(Abi::Gnu)
    } else {
        None
    };

    resolve_str(std::env::consts::OS, std::env::consts::ARCH, None).and_then(|platform| {
        // Respect the host's own ABI when it is one we know about.
        match (platform.os, abi) {
            (Os::Windows, Some(abi)) => resolve(platform.os, platform.arch, Some(abi)),
            _ => Ok(platform),
        }
    })
}

/// All supported target platforms.
pub fn supported_platforms() -> Vec<TargetPlatform> {
    PLATFORM_TABLE
        .iter()
        .map(|&(os, arch, abi, triple)| TargetPlatform {
            os,
            arch,
            abi,
            triple,
        })
        .collect()
}

impl TargetPlatform {
    pub fn os(&self) -> Os {
        self.os
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn abi(&self) -> Option<Abi> {
        self.abi
    }

    /// The compiler target triple.
    pub fn triple(&self) -> &'static str {
        self.triple
    }

    /// Platform identifier used in release names (`linux-amd64`).
    pub fn identifier(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Executable file extension, including the dot.
    ///
    /// Every component that needs the extension goes through here.
    pub fn file_extension(&self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            Os::Linux | Os::Macos => "",
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Whether binaries for `self` can be produced and run on `host` natively.
    pub fn is_compatible_with(&self, host: &TargetPlatform) -> bool {
        self.os == host.os && self.arch == host.arch
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.abi {
            Some(abi) if self.os == Os::Windows => write!(f, "{}-{}-{}", self.os, self.arch, abi),
            _ => write!(f, "{}-{}", self.os, self.arch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_matrix_resolves() {
        let cases = [
            (Os::Linux, Arch::Amd64, "x86_64-unknown-linux-gnu"),
            (Os::Linux, Arch::Arm64, "aarch64-unknown-linux-gnu"),
            (Os::Macos, Arch::Amd64, "x86_64-apple-darwin"),
            (Os::Macos, Arch::Arm64, "aarch64-apple-darwin"),
            (Os::Windows, Arch::Amd64, "x86_64-pc-windows-gnu"),
            (Os::Windows, Arch::Arm64, "aarch64-pc-windows-gnullvm"),
        ];

        for (os, arch, triple) in cases {
            let platform = resolve(os, arch, None).unwrap();
            assert_eq!(platform.triple(), triple);
        }
    }

    #[test]
    fn test_abi_hint_selects_triple() {
        let msvc = resolve(Os::Windows, Arch::Amd64, Some(Abi::Msvc)).unwrap();
        assert_eq!(msvc.triple(), "x86_64-pc-windows-msvc");

        let arm = resolve(Os::Windows, Arch::Arm64, Some(Abi::Msvc)).unwrap();
        assert_eq!(arm.triple(), "aarch64-pc-windows-msvc");
    }

    #[test]
    fn test_unknown_combinations_are_rejected() {
        assert!(matches!(
            resolve(Os::Macos, Arch::Arm64, Some(Abi::Gnu)),
            Err(BuildError::UnsupportedPlatform { .. })
        ));
        assert!(matches!(
            resolve(Os::Linux, Arch::Amd64, Some(Abi::Msvc)),
            Err(BuildError::UnsupportedPlatform { .. })
        ));
        assert!(matches!(
            resolve_str("freebsd", "amd64", None),
            Err(BuildError::UnsupportedPlatform { .. })
        ));
        assert!(matches!(
            resolve_str("linux", "riscv64", None),
            Err(BuildError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_file_extension() {
        let windows = resolve(Os::Windows, Arch::Amd64, None).unwrap();
        let linux = resolve(Os::Linux, Arch::Amd64, None).unwrap();
        let macos = resolve(Os::Macos, Arch::Arm64, None).unwrap();

        assert_eq!(windows.file_extension(), ".exe");
        assert_eq!(linux.file_extension(), "");
        assert_eq!(macos.file_extension(), "");
    }

    #[test]
    fn test_parse_target_forms() {
        let by_id = parse_target("linux-arm64").unwrap();
        assert_eq!(by_id.triple(), "aarch64-unknown-linux-gnu");

        let by_alias = parse_target("darwin-x86_64").unwrap();
        assert_eq!(by_alias.triple(), "x86_64-apple-darwin");

        let by_triple = parse_target("x86_64-pc-windows-msvc").unwrap();
        assert_eq!(by_triple.os(), Os::Windows);
        assert_eq!(by_triple.abi(), Some(Abi::Msvc));

        let with_abi = parse_target("windows-amd64-msvc").unwrap();
        assert_eq!(with_abi, by_triple);

        assert!(parse_target("sparc-sun-solaris").is_err());
    }

    #[test]
    fn test_identifier_ignores_abi() {
        let msvc = resolve(Os::Windows, Arch::Amd64, Some(Abi::Msvc)).unwrap();
        assert_eq!(msvc.identifier(), "windows-amd64");
        assert_eq!(msvc.to_string(), "windows-amd64-msvc");
    }

    #[test]
    fn test_host_platform() {
        // CI runners are always one of the supported platforms.
        let host = host_platform().unwrap();
        assert!(!host.triple().is_empty());
        assert!(host.is_compatible_with(&host));
    }

    #[test]
    fn test_compatibility() {
        let gnu = resolve(Os::Windows, Arch::Amd64, Some(Abi::Gnu)).unwrap();
        let msvc = resolve(Os::Windows, Arch::Amd64, Some(Abi::Msvc)).unwrap();
        let arm = resolve(Os::Windows, Arch::Arm64, None).unwrap();

        assert!(gnu.is_compatible_with(&msvc));
        assert!(!arm.is_compatible_with(&gnu));
    }
}
