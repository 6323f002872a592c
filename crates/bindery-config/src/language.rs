//! Target language identifiers
//!
//! The four host ecosystems a package can be produced for. The set is
//! closed: adding a language means extending this enum plus the per-language
//! tables in `bindery-build` and `bindery-package`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A target language for which a distributable package is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Managed runtime (.NET) — packaged as a `.nupkg`
    Csharp,
    /// JVM — packaged as a `.jar` with the native library bundled
    Java,
    /// Scripting runtime — packaged as an sdist-style `.tar.gz`
    Python,
    /// Native consumers — headers plus library in a `.tar.gz` archive
    Cpp,
}

impl Language {
    /// All supported target languages, in canonical order
    pub const ALL: [Language; 4] = [
        Language::Csharp,
        Language::Java,
        Language::Python,
        Language::Cpp,
    ];

    /// Canonical lowercase name, used in paths and artifact names
    pub const fn as_str(&self) -> &'static str {
        match self {
            Language::Csharp => "csharp",
            Language::Java => "java",
            Language::Python => "python",
            Language::Cpp => "cpp",
        }
    }

    /// Whether the wrapper generator produces glue for this language.
    ///
    /// Native consumers link against the core directly, so `cpp` has no
    /// generated glue and no codegen nodes.
    pub const fn has_glue(&self) -> bool {
        !matches!(self, Language::Cpp)
    }

    /// Flag passed to the wrapper generator to select this language
    pub const fn codegen_flag(&self) -> Option<&'static str> {
        match self {
            Language::Csharp => Some("-csharp"),
            Language::Java => Some("-java"),
            Language::Python => Some("-python"),
            Language::Cpp => None,
        }
    }

    /// Extension of the generated binding file (`<module>.<ext>`)
    pub const fn binding_extension(&self) -> Option<&'static str> {
        match self {
            Language::Csharp => Some("cs"),
            Language::Java => Some("java"),
            Language::Python => Some("py"),
            Language::Cpp => None,
        }
    }

    /// Extension of the distributable package artifact
    pub const fn package_extension(&self) -> &'static str {
        match self {
            Language::Csharp => "nupkg",
            Language::Java => "jar",
            Language::Python => "tar.gz",
            Language::Cpp => "tar.gz",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csharp" | "cs" | "dotnet" => Ok(Language::Csharp),
            "java" => Ok(Language::Java),
            "python" | "py" => Ok(Language::Python),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            other => Err(format!(
                "unknown target language '{}' (expected one of: csharp, java, python, cpp)",
                other
            )),
        }
    }
}
