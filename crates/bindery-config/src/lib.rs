//! Bindery project configuration
//!
//! Parses and validates the project manifest (`bindery.toml`) that declares
//! the native core, its interface-description modules, and per-language
//! packaging settings. The manifest is the single static description of the
//! project; everything dynamic (platform, toolchains, versions) is resolved
//! at invocation time by `bindery-build`.

pub mod language;
pub mod manifest;

pub use language::Language;
pub use manifest::{
    find_manifest, CodegenConfig, CoreConfig, LanguageSettings, ModuleConfig, ProductConfig,
    ProjectManifest, MANIFEST_FILE,
};

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("manifest not found: no bindery.toml in {0} or any parent directory")]
    ManifestNotFound(PathBuf),

    #[error("failed to read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("invalid TOML in {file}: {error}")]
    TomlParse {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("unknown target language: {0}")]
    UnknownLanguage(String),

    #[error("invalid product version '{version}': expected MAJOR.MINOR{reason}")]
    InvalidBaseVersion { version: String, reason: String },

    #[error("invalid manifest: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
