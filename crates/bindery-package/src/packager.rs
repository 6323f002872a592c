//! Artifact staging and package assembly
//!
//! Staging copies everything one language's package needs into a scratch
//! directory (`pkg/<language>/` under the output root), renders the package
//! manifest, and returns a [`PackStep`] describing how the package gets
//! built from it. Command steps run through the caller's executor; the
//! archive step is executed in-process with [`create_archive`].
//!
//! Packaging tools pick their own output names (`dotnet pack` appends the
//! version its way, `setup.py sdist` hyphenates), so every command step
//! carries the path the tool is expected to produce and the caller renames
//! it to the canonical artifact with [`normalize_artifact`] afterwards.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use bindery_config::{Language, LanguageSettings, ProductConfig};

use crate::manifest::{render_package_manifest, ManifestContext};
use crate::version::ArtifactVersion;
use crate::{PackageError, PackageResult};

/// File name of the package index written under `dist/`
pub const INDEX_FILE: &str = "index.json";

/// Everything needed to stage one language's package
#[derive(Debug, Clone, Serialize)]
pub struct PackageRequest {
    pub language: Language,
    pub product: ProductConfig,
    pub settings: Option<LanguageSettings>,
    pub version: ArtifactVersion,
    /// Module names, canonical order
    pub modules: Vec<String>,
    /// Platform tag stamped into manifests ("linux-x86_64", ...)
    pub platform: String,
    /// Resolved packaging tool; `None` falls back to the conventional
    /// binary name, leaving resolution to `PATH` at spawn time
    pub tool: Option<PathBuf>,
    /// Generated binding sources, one directory per module
    pub binding_dirs: Vec<PathBuf>,
    /// Compiled class directories, one per module (Java only)
    pub class_dirs: Vec<PathBuf>,
    /// Native library shipped inside the package
    pub library: PathBuf,
    /// Public headers shipped with the C++ package
    pub include_dir: Option<PathBuf>,
    /// Scratch directory for this package (`pkg/<language>/`)
    pub stage_dir: PathBuf,
    /// Final artifact directory (`dist/`)
    pub dist_dir: PathBuf,
}

/// How a staged package gets assembled
#[derive(Debug, Clone)]
pub enum PackStep {
    /// External packaging tool invocation
    Command(PackCommand),
    /// In-process tar.gz of the staged directory
    Archive {
        /// Directory whose contents are archived
        root: PathBuf,
        /// Leading path component inside the archive
        prefix: String,
        /// Archive to write; already the canonical artifact path
        archive: PathBuf,
    },
}

/// External packaging command with the output path it is expected to write
#[derive(Debug, Clone)]
pub struct PackCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Path the tool produces; renamed to the canonical artifact afterwards
    pub produced: PathBuf,
}

/// Result of staging: the canonical artifact path and the step that builds it
#[derive(Debug, Clone)]
pub struct StagedPackage {
    pub language: Language,
    /// Final artifact path under `dist/`
    pub artifact: PathBuf,
    pub step: PackStep,
}

/// Canonical artifact file name: `<product>_<language>_<version>.<ext>`
pub fn canonical_artifact_name(
    product: &str,
    language: Language,
    version: &ArtifactVersion,
) -> String {
    format!(
        "{}_{}_{}.{}",
        product,
        language,
        version,
        language.package_extension()
    )
}

/// Stage one language's package and describe how to assemble it.
///
/// Copies bindings, the native library and auxiliary files into
/// `request.stage_dir`, renders the package manifest, and returns the
/// canonical artifact path plus the [`PackStep`] that produces it.
pub fn stage(request: &PackageRequest) -> PackageResult<StagedPackage> {
    if !request.library.is_file() {
        return Err(PackageError::MissingInput {
            language: request.language.to_string(),
            path: request.library.clone(),
        });
    }
    for dir in &request.binding_dirs {
        if !dir.is_dir() {
            return Err(PackageError::MissingInput {
                language: request.language.to_string(),
                path: dir.clone(),
            });
        }
    }

    ensure_dir(&request.stage_dir)?;
    ensure_dir(&request.dist_dir)?;

    match request.language {
        Language::Csharp => stage_csharp(request),
        Language::Java => stage_java(request),
        Language::Python => stage_python(request),
        Language::Cpp => stage_cpp(request),
    }
}

fn stage_csharp(request: &PackageRequest) -> PackageResult<StagedPackage> {
    let stage = &request.stage_dir;
    for dir in &request.binding_dirs {
        copy_sources(dir, stage, "cs")?;
    }

    let native_dir = stage
        .join("runtimes")
        .join(dotnet_rid(&request.platform))
        .join("native");
    ensure_dir(&native_dir)?;
    copy_into(&request.library, &native_dir)?;

    let (name, content) = render_package_manifest(Language::Csharp, &manifest_context(request)?);
    write_file(&stage.join(&name), &content)?;

    let out_dir = stage.join("out");
    let id = package_id_for(request, Language::Csharp);
    // dotnet pack names the output <PackageId>.<Version>.nupkg
    let produced = out_dir.join(format!("{}.{}.nupkg", id, request.version));
    let command = PackCommand {
        program: tool_or(request, "dotnet"),
        args: vec![
            "pack".to_string(),
            name,
            "--configuration".to_string(),
            "Release".to_string(),
            "--output".to_string(),
            out_dir.display().to_string(),
        ],
        cwd: stage.clone(),
        produced,
    };

    Ok(StagedPackage {
        language: Language::Csharp,
        artifact: artifact_path(request),
        step: PackStep::Command(command),
    })
}

fn stage_java(request: &PackageRequest) -> PackageResult<StagedPackage> {
    let stage = &request.stage_dir;

    let native_dir = stage.join("native");
    ensure_dir(&native_dir)?;
    copy_into(&request.library, &native_dir)?;

    let (name, content) = render_package_manifest(Language::Java, &manifest_context(request)?);
    write_file(&stage.join(&name), &content)?;

    // jar can target the canonical name directly, so no rename afterwards
    let artifact = artifact_path(request);
    let mut args = vec![
        "cfm".to_string(),
        artifact.display().to_string(),
        name,
    ];
    for dir in &request.class_dirs {
        args.push("-C".to_string());
        args.push(dir.display().to_string());
        args.push(".".to_string());
    }
    args.push("-C".to_string());
    args.push(stage.display().to_string());
    args.push("native".to_string());

    let command = PackCommand {
        program: tool_or(request, "jar"),
        args,
        cwd: stage.clone(),
        produced: artifact.clone(),
    };

    Ok(StagedPackage {
        language: Language::Java,
        artifact,
        step: PackStep::Command(command),
    })
}

fn stage_python(request: &PackageRequest) -> PackageResult<StagedPackage> {
    let stage = &request.stage_dir;
    let module_name = request
        .settings
        .as_ref()
        .and_then(|s| s.module.clone())
        .unwrap_or_else(|| request.product.name.clone());

    let pkg_dir = stage.join(&module_name);
    ensure_dir(&pkg_dir)?;
    for dir in &request.binding_dirs {
        copy_sources(dir, &pkg_dir, "py")?;
    }
    copy_into(&request.library, &pkg_dir)?;
    write_file(&pkg_dir.join("__init__.py"), &python_init(request))?;

    let (name, content) = render_package_manifest(Language::Python, &manifest_context(request)?);
    write_file(&stage.join(&name), &content)?;

    let out_dir = stage.join("out");
    // setup.py sdist names the output <name>-<version>.tar.gz
    let produced = out_dir.join(format!(
        "{}-{}.tar.gz",
        request.product.name, request.version
    ));
    let command = PackCommand {
        program: tool_or(request, "python3"),
        args: vec![
            "setup.py".to_string(),
            "sdist".to_string(),
            "--dist-dir".to_string(),
            out_dir.display().to_string(),
        ],
        cwd: stage.clone(),
        produced,
    };

    Ok(StagedPackage {
        language: Language::Python,
        artifact: artifact_path(request),
        step: PackStep::Command(command),
    })
}

fn stage_cpp(request: &PackageRequest) -> PackageResult<StagedPackage> {
    let stage = &request.stage_dir;

    let lib_dir = stage.join("lib");
    ensure_dir(&lib_dir)?;
    copy_into(&request.library, &lib_dir)?;

    if let Some(include) = &request.include_dir {
        copy_tree(include, &stage.join("include"))?;
    }

    let (name, content) = render_package_manifest(Language::Cpp, &manifest_context(request)?);
    write_file(&stage.join(&name), &content)?;

    let artifact = artifact_path(request);
    let prefix = format!(
        "{}_{}_{}",
        request.product.name,
        Language::Cpp,
        request.version
    );

    Ok(StagedPackage {
        language: Language::Cpp,
        artifact: artifact.clone(),
        step: PackStep::Archive {
            root: stage.clone(),
            prefix,
            archive: artifact,
        },
    })
}

/// Rename a tool-produced artifact to its canonical path.
///
/// No-op when the tool already wrote the canonical name.
pub fn normalize_artifact(produced: &Path, artifact: &Path) -> PackageResult<()> {
    if !produced.is_file() {
        return Err(PackageError::MissingProducedArtifact(produced.to_path_buf()));
    }
    if produced == artifact {
        return Ok(());
    }
    if let Some(parent) = artifact.parent() {
        ensure_dir(parent)?;
    }
    fs::rename(produced, artifact).map_err(|e| PackageError::io(artifact, e))
}

/// Write a gzip-compressed tar of `root`'s contents under `prefix/`.
///
/// Executes the [`PackStep::Archive`] step.
pub fn create_archive(root: &Path, prefix: &str, archive: &Path) -> PackageResult<()> {
    if let Some(parent) = archive.parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(archive).map_err(|e| PackageError::io(archive, e))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    builder
        .append_dir_all(prefix, root)
        .map_err(|e| PackageError::io(root, e))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| PackageError::io(archive, e))?;
    encoder
        .finish()
        .map_err(|e| PackageError::io(archive, e))?;
    Ok(())
}

/// One artifact recorded in the `dist/index.json` manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub language: Language,
    /// Artifact file name relative to `dist/`
    pub file: String,
    pub version: String,
    pub platform: String,
    pub bytes: u64,
    pub sha256: String,
}

impl IndexEntry {
    /// Describe a finished artifact, hashing its content
    pub fn from_artifact(
        language: Language,
        artifact: &Path,
        version: &ArtifactVersion,
        platform: &str,
    ) -> PackageResult<Self> {
        let content = fs::read(artifact).map_err(|e| PackageError::io(artifact, e))?;
        let mut hasher = Sha256::new();
        hasher.update(&content);

        Ok(Self {
            language,
            file: file_name(artifact),
            version: version.to_string(),
            platform: platform.to_string(),
            bytes: content.len() as u64,
            sha256: format!("{:x}", hasher.finalize()),
        })
    }
}

#[derive(Serialize)]
struct PackageIndex<'a> {
    generated: String,
    packages: &'a [IndexEntry],
}

/// Write `dist/index.json` describing every produced package
pub fn write_package_index(dist_dir: &Path, entries: &[IndexEntry]) -> PackageResult<PathBuf> {
    ensure_dir(dist_dir)?;
    let index = PackageIndex {
        generated: chrono::Utc::now().to_rfc3339(),
        packages: entries,
    };
    let path = dist_dir.join(INDEX_FILE);
    let content = serde_json::to_string_pretty(&index)
        .map_err(|e| PackageError::io(&path, std::io::Error::other(e)))?;
    write_file(&path, &content)?;
    Ok(path)
}

fn manifest_context(request: &PackageRequest) -> PackageResult<ManifestContext<'_>> {
    Ok(ManifestContext {
        product: &request.product,
        settings: request.settings.as_ref(),
        version: &request.version,
        modules: &request.modules,
        library_file: library_file(request)?,
        platform: &request.platform,
    })
}

fn library_file(request: &PackageRequest) -> PackageResult<&str> {
    request
        .library
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PackageError::MissingInput {
            language: request.language.to_string(),
            path: request.library.clone(),
        })
}

fn package_id_for(request: &PackageRequest, lang: Language) -> String {
    format!("{}_{}", request.product.name, lang)
}

fn artifact_path(request: &PackageRequest) -> PathBuf {
    request.dist_dir.join(canonical_artifact_name(
        &request.product.name,
        request.language,
        &request.version,
    ))
}

fn tool_or(request: &PackageRequest, conventional: &str) -> PathBuf {
    request
        .tool
        .clone()
        .unwrap_or_else(|| PathBuf::from(conventional))
}

fn python_init(request: &PackageRequest) -> String {
    let mut init = format!("__version__ = \"{}\"\n", request.version);
    let quoted: Vec<String> = request
        .modules
        .iter()
        .map(|m| format!("\"{}\"", m))
        .collect();
    init.push_str(&format!("__all__ = [{}]\n", quoted.join(", ")));
    for module in &request.modules {
        init.push_str(&format!("from . import {}\n", module));
    }
    init
}

/// .NET runtime identifier for a platform tag
fn dotnet_rid(platform: &str) -> String {
    match platform {
        "linux-x86_64" => "linux-x64".to_string(),
        "linux-aarch64" => "linux-arm64".to_string(),
        "macos-x86_64" => "osx-x64".to_string(),
        "macos-aarch64" => "osx-arm64".to_string(),
        "windows-x86_64" => "win-x64".to_string(),
        other => other.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn ensure_dir(dir: &Path) -> PackageResult<()> {
    fs::create_dir_all(dir).map_err(|e| PackageError::io(dir, e))
}

fn write_file(path: &Path, content: &str) -> PackageResult<()> {
    fs::write(path, content).map_err(|e| PackageError::io(path, e))
}

/// Copy a file into a directory, keeping its name
fn copy_into(src: &Path, dst_dir: &Path) -> PackageResult<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| PackageError::io(src, std::io::Error::other("path has no file name")))?;
    let dst = dst_dir.join(name);
    fs::copy(src, &dst).map_err(|e| PackageError::io(src, e))?;
    Ok(dst)
}

/// Copy files with the given extension from `src_dir` into `dst_dir` (flat)
fn copy_sources(src_dir: &Path, dst_dir: &Path, ext: &str) -> PackageResult<usize> {
    ensure_dir(dst_dir)?;
    let mut copied = 0;
    let entries = fs::read_dir(src_dir).map_err(|e| PackageError::io(src_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PackageError::io(src_dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == ext) {
            copy_into(&path, dst_dir)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy a directory tree, preserving its layout
fn copy_tree(src: &Path, dst: &Path) -> PackageResult<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| src.to_path_buf());
            PackageError::io(path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .unwrap_or_else(|_| entry.path());
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            fs::copy(entry.path(), &target).map_err(|e| PackageError::io(entry.path(), e))?;
        }
    }
    Ok(())
}
