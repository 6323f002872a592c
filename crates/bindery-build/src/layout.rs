//! Output tree layout
//!
//! All paths under the output root (`--out`, default `target/bindery`) are
//! derived here so every rule and test agrees on where things live:
//!
//! ```text
//! gen/<lang>/<module>/   generated glue, binding file, symbol index
//! obj/core/              language-neutral core objects
//! obj/<lang>/            per-language glue objects
//! classes/<module>/      compiled Java classes
//! lib/                   linked shared libraries
//! pkg/<lang>/            package staging
//! dist/                  final artifacts + index.json
//! fingerprints.json      recorded action fingerprints
//! ```

use std::path::{Path, PathBuf};

use bindery_config::Language;

/// Default output root, relative to the project root
pub const DEFAULT_OUT_DIR: &str = "target/bindery";

/// File name of the persisted fingerprint store
pub const FINGERPRINTS_FILE: &str = "fingerprints.json";

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generated sources for one module in one language
    pub fn gen_dir(&self, lang: Language, module: &str) -> PathBuf {
        self.root.join("gen").join(lang.as_str()).join(module)
    }

    pub fn core_obj_dir(&self) -> PathBuf {
        self.root.join("obj").join("core")
    }

    pub fn lang_obj_dir(&self, lang: Language) -> PathBuf {
        self.root.join("obj").join(lang.as_str())
    }

    pub fn classes_dir(&self, module: &str) -> PathBuf {
        self.root.join("classes").join(module)
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn stage_dir(&self, lang: Language) -> PathBuf {
        self.root.join("pkg").join(lang.as_str())
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.root.join("dist")
    }

    pub fn fingerprints_file(&self) -> PathBuf {
        self.root.join(FINGERPRINTS_FILE)
    }
}
