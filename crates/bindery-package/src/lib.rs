//! Bindery package assembly
//!
//! Everything that turns build outputs into distributable artifacts: the
//! shared artifact version (one value stamped on every package of an
//! invocation), per-language package manifests rendered from templates, and
//! the staging/archive logic behind each language's packaging tool.
//!
//! Process execution stays out of this crate: staging returns a
//! [`PackStep`](packager::PackStep) describing the external command (or the
//! built-in archive step) and the caller runs it, so that packaging commands
//! flow through the same executor as every other build action.

pub mod manifest;
pub mod packager;
pub mod version;

pub use manifest::{render_package_manifest, ManifestContext};
pub use packager::{
    canonical_artifact_name, create_archive, normalize_artifact, stage, write_package_index,
    IndexEntry, PackCommand, PackStep, PackageRequest, StagedPackage, INDEX_FILE,
};
pub use version::{ArtifactVersion, VersionSource};

use std::path::PathBuf;

/// Packaging errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("invalid pre-release tag '{tag}': {reason}")]
    InvalidPreRelease { tag: String, reason: String },

    #[error("missing input for {language} package: {path}")]
    MissingInput { language: String, path: PathBuf },

    #[error("packaging tool did not produce {0}")]
    MissingProducedArtifact(PathBuf),
}

impl PackageError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

pub type PackageResult<T> = std::result::Result<T, PackageError>;
