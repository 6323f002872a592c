//! Artifact version resolution
//!
//! One version string is computed per invocation and stamped on every
//! package: major and minor come from the project manifest, the patch
//! component is the source-control revision count. A tree without history
//! gets a sentinel patch of 0 — version resolution warns but never fails.

use crate::{PackageError, PackageResult};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::process::Command;

/// The single version identity shared by every package of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Optional pre-release tag ("beta", "rc1", …)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_release: Option<String>,
}

/// Where the patch component came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// `git rev-list --count HEAD` in the project root
    GitRevisionCount,
    /// No usable source-control metadata; patch is 0
    Sentinel,
}

impl ArtifactVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    /// Attach a pre-release tag, validating it against semver rules
    pub fn with_pre_release(mut self, tag: &str) -> PackageResult<Self> {
        semver::Prerelease::new(tag).map_err(|e| PackageError::InvalidPreRelease {
            tag: tag.to_string(),
            reason: e.to_string(),
        })?;
        self.pre_release = Some(tag.to_string());
        Ok(self)
    }

    /// Resolve the full version for a project tree.
    ///
    /// Pure with respect to the tree: the same repository state always
    /// yields the same version. The returned [`VersionSource`] tells the
    /// caller whether to print a sentinel warning.
    pub fn resolve(
        project_root: &Path,
        major: u64,
        minor: u64,
        pre_release: Option<&str>,
    ) -> PackageResult<(Self, VersionSource)> {
        let (patch, source) = match git_revision_count(project_root) {
            Some(count) => (count, VersionSource::GitRevisionCount),
            None => (0, VersionSource::Sentinel),
        };

        let mut version = Self::new(major, minor, patch);
        if let Some(tag) = pre_release {
            version = version.with_pre_release(tag)?;
        }
        Ok((version, source))
    }

    /// Convert to a `semver::Version` (for comparisons and manifest fields)
    pub fn to_semver(&self) -> semver::Version {
        let mut v = semver::Version::new(self.major, self.minor, self.patch);
        if let Some(ref tag) = self.pre_release {
            // Validated at construction time
            v.pre = semver::Prerelease::new(tag).unwrap_or(semver::Prerelease::EMPTY);
        }
        v
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pre_release {
            Some(ref tag) => write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, tag),
            None => write!(f, "{}.{}.{}", self.major, self.minor, self.patch),
        }
    }
}

/// Count revisions via `git rev-list --count HEAD`.
///
/// Returns `None` for anything that is not a clean success: no git binary,
/// not a repository, empty history, unparseable output.
fn git_revision_count(project_root: &Path) -> Option<u64> {
    let output = Command::new("git")
        .args(["rev-list", "--count", "HEAD"])
        .current_dir(project_root)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}
