//! Build event types for JSON output.
//!
//! This module defines the stable JSON schema for machine-readable build
//! output, emitted one object per line by `shipwright build --json`.
//!
//! # Event Types
//!
//! - `build-started`: A target build began
//! - `release-artifact`: A release file was produced
//! - `build-failed`: A target build failed
//! - `build-finished`: All requested targets are done
//!
//! # Stability
//!
//! New fields may be added, but existing fields are not removed or renamed.

use std::path::PathBuf;

use serde::Serialize;

use crate::ops::compile::BuildResult;
use crate::util::errors::BuildError;

/// A build event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    #[serde(rename = "build-started")]
    BuildStarted {
        /// Profile being built (e.g. "release", "small")
        profile: String,
        target_triple: String,
    },

    /// A release file was written to the output directory.
    #[serde(rename = "release-artifact")]
    ReleaseArtifact {
        release_name: String,
        path: PathBuf,
        size: u64,
        sha256: String,
        target_triple: String,
        strategy: String,
        duration_ms: u64,
    },

    #[serde(rename = "build-failed")]
    BuildFailed {
        target_triple: String,
        /// Stable diagnostic code (e.g. "shipwright::build::failed")
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        message: String,
    },

    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        duration_ms: u64,
        targets_built: u64,
    },
}

impl BuildEvent {
    pub fn started(profile: impl Into<String>, target_triple: impl Into<String>) -> Self {
        BuildEvent::BuildStarted {
            profile: profile.into(),
            target_triple: target_triple.into(),
        }
    }

    /// Create an artifact event from a finished build.
    pub fn artifact(result: &BuildResult) -> Self {
        BuildEvent::ReleaseArtifact {
            release_name: result.release_name.clone(),
            path: result.path.clone(),
            size: result.size,
            sha256: result.sha256.clone(),
            target_triple: result.target.triple().to_string(),
            strategy: result.strategy.to_string(),
            duration_ms: result.elapsed.as_millis() as u64,
        }
    }

    pub fn failed(target_triple: impl Into<String>, error: &BuildError) -> Self {
        use miette::Diagnostic;

        BuildEvent::BuildFailed {
            target_triple: target_triple.into(),
            code: error.code().map(|c| c.to_string()),
            message: error.to_string(),
        }
    }

    pub fn finished(success: bool, duration_ms: u64, targets_built: u64) -> Self {
        BuildEvent::BuildFinished {
            success,
            duration_ms,
            targets_built,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
