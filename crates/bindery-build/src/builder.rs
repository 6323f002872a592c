//! Build orchestration: probe, plan, execute, summarize

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use bindery_config::{find_manifest, Language, ProjectManifest};
use bindery_package::{write_package_index, ArtifactVersion, IndexEntry, VersionSource};

use crate::action::Action;
use crate::capability::CapabilitySet;
use crate::codegen::{self, RenameTable};
use crate::error::{BuildError, BuildResult};
use crate::fingerprint::FingerprintStore;
use crate::graph::BuildGraph;
use crate::layout::{OutputLayout, DEFAULT_OUT_DIR};
use crate::output::{BuildStats, BuildSummary, SkippedLanguage};
use crate::platform::{PlatformProfile, ProbeOptions, KNOWN_TOOLS};
use crate::rules::{PlanContext, Rules};
use crate::scheduler::{self, NodePlan, ProgressFn, Scheduler};

/// Which languages one invocation builds
#[derive(Debug, Clone, Default)]
pub enum LanguageSelection {
    /// Every language whose toolchain is complete; incomplete ones are
    /// skipped with a warning
    #[default]
    Capable,
    /// Exactly these languages; an incomplete toolchain is fatal
    Explicit(Vec<Language>),
}

/// Invocation-scoped facts, fixed before planning
#[derive(Debug, Clone)]
pub struct ResolvedBuild {
    pub profile: PlatformProfile,
    pub capabilities: CapabilitySet,
    pub version: ArtifactVersion,
    pub version_source: VersionSource,
    /// Languages that will build, canonical order
    pub languages: Vec<Language>,
    pub skipped: Vec<SkippedLanguage>,
    pub layout: OutputLayout,
}

/// Main builder for orchestrating multi-language builds
#[derive(Debug)]
pub struct Builder {
    project_root: PathBuf,
    manifest: ProjectManifest,
    selection: LanguageSelection,
    out_dir: PathBuf,
    probe: ProbeOptions,
    pre_release: Option<String>,
    jobs: Option<usize>,
}

impl Builder {
    /// Locate `bindery.toml` upward from `start_dir` and load it
    pub fn new(start_dir: impl AsRef<Path>) -> BuildResult<Self> {
        let manifest_path = find_manifest(start_dir.as_ref())?;
        Self::from_manifest(&manifest_path)
    }

    /// Load an explicit manifest; the project root is its parent directory
    pub fn from_manifest(manifest_path: &Path) -> BuildResult<Self> {
        let manifest = ProjectManifest::from_file(manifest_path)?;
        let project_root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let out_dir = project_root.join(DEFAULT_OUT_DIR);

        Ok(Self {
            project_root,
            manifest,
            selection: LanguageSelection::default(),
            out_dir,
            probe: ProbeOptions::default(),
            pre_release: None,
            jobs: None,
        })
    }

    pub fn manifest(&self) -> &ProjectManifest {
        &self.manifest
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Build exactly these languages; missing toolchains become fatal
    pub fn with_languages(mut self, languages: Vec<Language>) -> Self {
        self.selection = LanguageSelection::Explicit(canonical(&languages));
        self
    }

    /// Build every language with a complete toolchain (the default)
    pub fn all_languages(mut self) -> Self {
        self.selection = LanguageSelection::Capable;
        self
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    /// Target a platform tag ("linux-x86_64") instead of probing the host
    pub fn with_platform(mut self, tag: impl Into<String>) -> Self {
        self.probe.platform = Some(tag.into());
        self
    }

    /// Pin a tool binary, bypassing PATH search ("cc" pins the compiler)
    pub fn with_tool(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.probe.tools.insert(name.into(), path.into());
        self
    }

    pub fn with_pre_release(mut self, tag: impl Into<String>) -> Self {
        self.pre_release = Some(tag.into());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Probe the platform, gate languages and resolve the version.
    ///
    /// Everything here is computed once per invocation and then treated as
    /// immutable by planning and execution.
    pub fn resolve(&self) -> BuildResult<ResolvedBuild> {
        let mut options = self.probe.clone();
        let codegen_tool = self.manifest.codegen.tool.as_str();
        if !KNOWN_TOOLS.contains(&codegen_tool) {
            options.extra_tools.push(codegen_tool.to_string());
        }

        let profile = PlatformProfile::probe(&options)?;
        let capabilities = CapabilitySet::derive(&profile, codegen_tool);

        let (languages, skipped) = match &self.selection {
            LanguageSelection::Explicit(requested) => {
                capabilities.require(requested)?;
                (requested.clone(), Vec::new())
            }
            LanguageSelection::Capable => {
                let mut languages = Vec::new();
                let mut skipped = Vec::new();
                for lang in Language::ALL {
                    let missing = capabilities.missing(lang);
                    if missing.is_empty() {
                        languages.push(lang);
                    } else {
                        skipped.push(SkippedLanguage {
                            language: lang,
                            missing: missing.to_vec(),
                        });
                    }
                }
                (languages, skipped)
            }
        };
        if languages.is_empty() {
            return Err(BuildError::config(
                "no target language has a complete toolchain",
            ));
        }

        let (major, minor) = self.manifest.base_version()?;
        let (version, version_source) = ArtifactVersion::resolve(
            &self.project_root,
            major,
            minor,
            self.pre_release.as_deref(),
        )?;

        Ok(ResolvedBuild {
            profile,
            capabilities,
            version,
            version_source,
            languages,
            skipped,
            layout: OutputLayout::new(self.out_dir.clone()),
        })
    }

    /// Plan the node graph for an already-resolved invocation
    pub fn plan(&self, resolved: &ResolvedBuild) -> BuildResult<BuildGraph> {
        let renames = self.collision_renames(&resolved.languages)?;
        let ctx = PlanContext {
            manifest: &self.manifest,
            project_root: &self.project_root,
            profile: &resolved.profile,
            languages: &resolved.languages,
            version: &resolved.version,
            layout: &resolved.layout,
            renames: &renames,
        };
        Rules::standard(&resolved.languages).plan(&ctx)
    }

    /// Resolve, plan and report per-node staleness without executing
    pub fn preview(&self) -> BuildResult<(ResolvedBuild, Vec<NodePlan>)> {
        let resolved = self.resolve()?;
        let graph = self.plan(&resolved)?;
        let store = FingerprintStore::load(resolved.layout.fingerprints_file());
        let plans = scheduler::preview(&graph, &store)?;
        Ok((resolved, plans))
    }

    /// Execute the full pipeline and write `dist/index.json` for every
    /// produced package
    pub fn build(&self, progress: ProgressFn<'_>) -> BuildResult<BuildSummary> {
        let started = Instant::now();
        let resolved = self.resolve()?;
        let graph = self.plan(&resolved)?;

        fs::create_dir_all(resolved.layout.root())
            .map_err(|e| BuildError::io(resolved.layout.root(), e))?;
        let mut store = FingerprintStore::load(resolved.layout.fingerprints_file());

        let scheduler = Scheduler::new(self.effective_jobs());
        let report = scheduler.run(&graph, &mut store, progress)?;

        let packages = collect_packages(&graph, &report, &resolved)?;
        if !packages.is_empty() {
            write_package_index(&resolved.layout.dist_dir(), &packages)?;
        }

        Ok(BuildSummary {
            success: report.success(),
            product: self.manifest.product.name.clone(),
            version: resolved.version.to_string(),
            version_source: resolved.version_source,
            platform: resolved.profile.tag(),
            languages: resolved.languages,
            skipped: resolved.skipped,
            stats: BuildStats::from_report(&report, started.elapsed()),
            nodes: report.nodes,
            packages,
        })
    }

    /// Remove the whole output tree
    pub fn clean(&self) -> BuildResult<()> {
        if self.out_dir.exists() {
            fs::remove_dir_all(&self.out_dir).map_err(|e| BuildError::io(&self.out_dir, e))?;
        }
        Ok(())
    }

    /// Collision rename table across sibling modules, scanned from the
    /// interface descriptions at plan time
    fn collision_renames(&self, languages: &[Language]) -> BuildResult<RenameTable> {
        if !languages.iter().any(|lang| lang.has_glue()) {
            return Ok(RenameTable::new());
        }
        let interfaces: Vec<(String, PathBuf)> = self
            .manifest
            .modules
            .iter()
            .map(|m| (m.name.clone(), self.project_root.join(&m.interface)))
            .collect();
        codegen::plan_renames(
            interfaces
                .iter()
                .map(|(name, path)| (name.as_str(), path.as_path())),
        )
    }

    fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Index entries for package nodes that finished with an artifact on disk
fn collect_packages(
    graph: &BuildGraph,
    report: &scheduler::BuildReport,
    resolved: &ResolvedBuild,
) -> BuildResult<Vec<IndexEntry>> {
    let platform = resolved.profile.tag();
    let mut entries = Vec::new();
    for node in graph.nodes() {
        let Action::Package(request) = &node.action else {
            continue;
        };
        let ok = report
            .status_of(&node.id)
            .map(|status| status.is_ok())
            .unwrap_or(false);
        let Some(artifact) = node.outputs.first() else {
            continue;
        };
        if ok && artifact.is_file() {
            entries.push(IndexEntry::from_artifact(
                request.language,
                artifact,
                &resolved.version,
                &platform,
            )?);
        }
    }
    Ok(entries)
}

/// Normalize a language list to canonical order without duplicates
fn canonical(requested: &[Language]) -> Vec<Language> {
    Language::ALL
        .into_iter()
        .filter(|lang| requested.contains(lang))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
        [product]
        name = "acoustics"
        version = "2.7"

        [core]
        sources = ["src/core"]

        [[module]]
        name = "acoustic"
        interface = "interfaces/acoustic.i"
    "#;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/core/deep")).unwrap();
        fs::write(temp.path().join("bindery.toml"), MANIFEST).unwrap();
        temp
    }

    #[test]
    fn test_new_walks_up_to_the_manifest() {
        let temp = project();
        let builder = Builder::new(temp.path().join("src/core/deep")).unwrap();

        assert_eq!(builder.project_root(), temp.path());
        assert_eq!(builder.manifest().product.name, "acoustics");
        assert_eq!(builder.out_dir(), temp.path().join("target/bindery"));
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = Builder::new(temp.path()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_canonical_orders_and_dedupes() {
        let normalized = canonical(&[
            Language::Python,
            Language::Csharp,
            Language::Python,
            Language::Java,
        ]);
        assert_eq!(
            normalized,
            vec![Language::Csharp, Language::Java, Language::Python]
        );
    }

    #[test]
    fn test_clean_removes_the_output_tree() {
        let temp = project();
        let out = temp.path().join("target/bindery");
        fs::create_dir_all(out.join("dist")).unwrap();
        fs::write(out.join("dist/old.tar.gz"), "stale").unwrap();

        let builder = Builder::new(temp.path()).unwrap();
        builder.clean().unwrap();
        assert!(!out.exists());

        // Cleaning an absent tree is fine
        builder.clean().unwrap();
    }

    #[test]
    fn test_effective_jobs_prefers_explicit_value() {
        let temp = project();
        let builder = Builder::new(temp.path()).unwrap().with_jobs(3);
        assert_eq!(builder.effective_jobs(), 3);

        let builder = Builder::new(temp.path()).unwrap();
        assert!(builder.effective_jobs() >= 1);
    }
}
