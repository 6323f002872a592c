/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown platform '{0}': expected <os>-<arch>, e.g. linux-x86_64")]
    UnknownPlatform(String),

    #[error("Toolchain for {language} is unavailable: missing {missing}")]
    MissingToolchain { language: String, missing: String },

    #[error("Output {path} declared by both '{first}' and '{second}'")]
    DuplicateOutput {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Missing input {path} required by '{node}'")]
    MissingInput { node: String, path: PathBuf },

    #[error("Failed to launch '{program}': {error}")]
    Spawn { program: String, error: String },

    #[error("'{program}' failed ({status})\n{stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Manifest error: {0}")]
    Manifest(#[from] bindery_config::ConfigError),

    #[error("Package error: {0}")]
    Package(#[from] bindery_package::PackageError),

    #[error("Build failed: {0}")]
    BuildFailed(String),
}

impl BuildError {
    /// Create a configuration error
    pub fn config(message: impl ToString) -> Self {
        Self::Config(message.to_string())
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a spawn error for an external tool
    pub fn spawn(program: impl ToString, error: impl ToString) -> Self {
        Self::Spawn {
            program: program.to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error is a configuration problem rather than a build
    /// failure; configuration problems exit with a distinct code
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownPlatform(_)
                | Self::MissingToolchain { .. }
                | Self::DuplicateOutput { .. }
                | Self::DependencyCycle(_)
                | Self::Manifest(_)
        )
    }
}
