//! Per-language toolchain capability
//!
//! Derived once from the [`PlatformProfile`] and a static table of required
//! binaries, then never mutated. A language with gaps is skipped with a
//! warning unless it was explicitly requested, in which case the gap is a
//! fatal configuration error.

use serde::Serialize;
use std::collections::BTreeMap;

use bindery_config::Language;

use crate::error::{BuildError, BuildResult};
use crate::platform::PlatformProfile;

/// Availability of one language's toolchain
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LanguageStatus {
    /// All required binaries resolved
    Available { tools: Vec<String> },
    /// At least one required binary was not found
    Missing { missing: Vec<String> },
}

impl LanguageStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, LanguageStatus::Available { .. })
    }
}

/// Capability per target language, fixed for the invocation
#[derive(Debug, Clone, Serialize)]
pub struct CapabilitySet {
    statuses: BTreeMap<Language, LanguageStatus>,
}

impl CapabilitySet {
    /// Derive capabilities from the probed profile.
    ///
    /// `codegen_tool` is the wrapper generator binary from the manifest;
    /// it is required for every language that needs generated glue.
    pub fn derive(profile: &PlatformProfile, codegen_tool: &str) -> Self {
        let mut statuses = BTreeMap::new();
        for lang in Language::ALL {
            let required = required_tools(lang, codegen_tool);
            let missing: Vec<String> = required
                .iter()
                .filter(|tool| !tool_resolved(profile, tool))
                .cloned()
                .collect();

            let status = if missing.is_empty() {
                LanguageStatus::Available { tools: required }
            } else {
                LanguageStatus::Missing { missing }
            };
            statuses.insert(lang, status);
        }
        Self { statuses }
    }

    pub fn status(&self, lang: Language) -> &LanguageStatus {
        // Every language gets a status in derive()
        &self.statuses[&lang]
    }

    pub fn available(&self, lang: Language) -> bool {
        self.status(lang).is_available()
    }

    /// Missing binaries for a language; empty when available
    pub fn missing(&self, lang: Language) -> &[String] {
        match self.status(lang) {
            LanguageStatus::Available { .. } => &[],
            LanguageStatus::Missing { missing } => missing,
        }
    }

    /// Languages whose toolchain is complete, canonical order
    pub fn capable_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|lang| self.available(*lang))
            .collect()
    }

    /// Fail if any explicitly requested language lacks its toolchain
    pub fn require(&self, requested: &[Language]) -> BuildResult<()> {
        for lang in requested {
            let missing = self.missing(*lang);
            if !missing.is_empty() {
                return Err(BuildError::MissingToolchain {
                    language: lang.to_string(),
                    missing: missing.join(", "),
                });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &LanguageStatus)> {
        self.statuses.iter().map(|(lang, status)| (*lang, status))
    }
}

/// Binaries a language's full pipeline needs
fn required_tools(lang: Language, codegen_tool: &str) -> Vec<String> {
    let mut required = vec!["cc".to_string()];
    if lang.has_glue() {
        required.push(codegen_tool.to_string());
    }
    match lang {
        Language::Csharp => required.push("dotnet".to_string()),
        Language::Java => {
            required.push("javac".to_string());
            required.push("jar".to_string());
        }
        Language::Python => required.push("python3".to_string()),
        Language::Cpp => {}
    }
    required
}

fn tool_resolved(profile: &PlatformProfile, tool: &str) -> bool {
    if tool == "cc" {
        profile.compiler.is_some()
    } else {
        profile.has_tool(tool)
    }
}
