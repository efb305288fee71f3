//! Build profiles and their cargo translation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Optimization/size level of a release build, ordered from least to most
/// optimized.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    #[serde(alias = "debug", alias = "dev")]
    Develop,
    #[default]
    Release,
    Fast,
    Fastest,
    Small,
    Smallest,
}

impl BuildProfile {
    pub const ALL: [BuildProfile; 6] = [
        BuildProfile::Develop,
        BuildProfile::Release,
        BuildProfile::Fast,
        BuildProfile::Fastest,
        BuildProfile::Small,
        BuildProfile::Smallest,
    ];

    /// Name used by this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildProfile::Develop => "develop",
            BuildProfile::Release => "release",
            BuildProfile::Fast => "fast",
            BuildProfile::Fastest => "fastest",
            BuildProfile::Small => "small",
            BuildProfile::Smallest => "smallest",
        }
    }

    /// Value passed to `cargo --profile`.
    pub fn cargo_name(&self) -> &'static str {
        match self {
            BuildProfile::Develop => "dev",
            other => other.as_str(),
        }
    }

    /// Directory cargo writes this profile's output to, below
    /// `<target-dir>/<triple>/`.
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            BuildProfile::Develop => "debug",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "develop" | "debug" | "dev" => Ok(BuildProfile::Develop),
            "release" => Ok(BuildProfile::Release),
            "fast" => Ok(BuildProfile::Fast),
            "fastest" => Ok(BuildProfile::Fastest),
            "small" => Ok(BuildProfile::Small),
            "smallest" => Ok(BuildProfile::Smallest),
            _ => Err(format!(
                "invalid profile '{}'; expected one of: develop, release, fast, fastest, small, smallest",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_develop_translates_to_cargo_dev() {
        assert_eq!(BuildProfile::Develop.cargo_name(), "dev");
        assert_eq!(BuildProfile::Develop.output_dir_name(), "debug");
    }

    #[test]
    fn test_custom_profiles_are_identity() {
        for profile in [BuildProfile::Release, BuildProfile::Small, BuildProfile::Smallest] {
            assert_eq!(profile.cargo_name(), profile.as_str());
            assert_eq!(profile.output_dir_name(), profile.as_str());
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("debug".parse::<BuildProfile>().unwrap(), BuildProfile::Develop);
        assert_eq!("DEV".parse::<BuildProfile>().unwrap(), BuildProfile::Develop);
        assert_eq!("smallest".parse::<BuildProfile>().unwrap(), BuildProfile::Smallest);
        assert!("turbo".parse::<BuildProfile>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(BuildProfile::Develop < BuildProfile::Release);
        assert!(BuildProfile::Small < BuildProfile::Smallest);
        assert_eq!(BuildProfile::default(), BuildProfile::Release);
    }
}
