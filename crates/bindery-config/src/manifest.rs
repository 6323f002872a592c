//! Project manifest parsing and types (bindery.toml)

use crate::language::Language;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// File name of the project manifest
pub const MANIFEST_FILE: &str = "bindery.toml";

/// Project manifest (bindery.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    /// Product metadata shared by every package
    pub product: ProductConfig,

    /// Wrapper generator configuration
    #[serde(default)]
    pub codegen: CodegenConfig,

    /// Native core sources and include paths
    pub core: CoreConfig,

    /// Native modules, one interface description each
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleConfig>,

    /// Optional per-language packaging settings
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<Language, LanguageSettings>,
}

impl ProjectManifest {
    /// Parse a manifest from TOML text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str, origin: &Path) -> ConfigResult<Self> {
        let manifest: ProjectManifest =
            toml::from_str(content).map_err(|error| ConfigError::TomlParse {
                file: origin.to_path_buf(),
                error,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load and validate a manifest from a file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_str(&content, path)
    }

    /// Split `product.version` into its static (major, minor) pair.
    ///
    /// The patch component is never written in the manifest; it is derived
    /// from source-control history at invocation time.
    pub fn base_version(&self) -> ConfigResult<(u64, u64)> {
        let version = &self.product.version;
        let invalid = |reason: &str| ConfigError::InvalidBaseVersion {
            version: version.clone(),
            reason: reason.to_string(),
        };

        let mut parts = version.splitn(2, '.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid(""))?;
        let minor = parts.next().ok_or_else(|| invalid(""))?;

        let major: u64 = major
            .parse()
            .map_err(|_| invalid(", major is not a number"))?;
        let minor: u64 = minor
            .parse()
            .map_err(|_| invalid(", minor is not a number"))?;
        Ok((major, minor))
    }

    /// Settings for a language, if the manifest customizes it
    pub fn language_settings(&self, lang: Language) -> Option<&LanguageSettings> {
        self.languages.get(&lang)
    }

    /// Look up a module by name
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Validate structural constraints that TOML parsing cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.product.name.is_empty() {
            return Err(ConfigError::Validation(
                "product.name must not be empty".to_string(),
            ));
        }
        if !is_identifier(&self.product.name) {
            return Err(ConfigError::Validation(format!(
                "product.name '{}' must be a C-style identifier (it becomes part of symbol and \
                 file names)",
                self.product.name
            )));
        }
        self.base_version()?;

        if self.core.sources.is_empty() {
            return Err(ConfigError::Validation(
                "core.sources must list at least one source file or directory".to_string(),
            ));
        }

        if self.modules.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[module]] is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for module in &self.modules {
            if module.name.is_empty() {
                return Err(ConfigError::Validation(
                    "module.name must not be empty".to_string(),
                ));
            }
            if !is_identifier(&module.name) {
                return Err(ConfigError::Validation(format!(
                    "module name '{}' must be a C-style identifier",
                    module.name
                )));
            }
            if !seen.insert(module.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate module name '{}'",
                    module.name
                )));
            }
            if module.interface.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "module '{}' has an empty interface path",
                    module.name
                )));
            }
        }

        if self.codegen.tool.is_empty() {
            return Err(ConfigError::Validation(
                "codegen.tool must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Product metadata section (`[product]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProductConfig {
    /// Product name; stem of every library and package artifact
    pub name: String,

    /// Static version as "MAJOR.MINOR"
    pub version: String,

    /// Description embedded in package manifests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

/// Wrapper generator section (`[codegen]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CodegenConfig {
    /// Generator binary name, resolved through the toolchain probe
    #[serde(default = "default_codegen_tool")]
    pub tool: String,

    /// Extra flags passed on every generator invocation
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

fn default_codegen_tool() -> String {
    "swig".to_string()
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            tool: default_codegen_tool(),
            flags: Vec::new(),
        }
    }
}

/// Native core section (`[core]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// Source files or directories (directories are walked for C sources)
    pub sources: Vec<PathBuf>,

    /// Include directories passed to every compile
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<PathBuf>,

    /// Preprocessor defines passed to every compile
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
}

/// A native module (`[[module]]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Module name; prefixes generated artifacts and rename rules
    pub name: String,

    /// Interface-description file fed to the wrapper generator
    pub interface: PathBuf,
}

/// Per-language settings (`[languages.<lang>]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LanguageSettings {
    /// C# namespace for generated bindings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Java package for generated bindings (e.g. "com.example.solver")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Python import name, when it differs from the product name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// Find the project manifest by walking up from `start_dir`.
///
/// Returns the manifest path; the project root is its parent.
pub fn find_manifest(start_dir: &Path) -> ConfigResult<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(ConfigError::ManifestNotFound(start_dir.to_path_buf()));
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
