//! Build pipeline integration tests
//!
//! End-to-end runs of the full pipeline against a scratch project. The
//! external tools are replaced by shell scripts that honor the same
//! argument conventions, so every stage from codegen to packaging really
//! executes.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use bindery_build::{
    no_progress, BuildSummary, Builder, Language, NodeStatus, Staleness, VersionSource,
};

const MANIFEST: &str = r#"
[product]
name = "acoustics"
version = "2.7"

[core]
sources = ["src/core"]
include = ["include"]

[[module]]
name = "acoustic"
interface = "interfaces/acoustic.i"

[[module]]
name = "thermal"
interface = "interfaces/thermal.i"
"#;

/// Both modules export `Solver`, so the collision renamer has work to do
const ACOUSTIC_INTERFACE: &str = r#"
%module acoustic

struct Solver {
    double tolerance;
};

double acoustic_pressure(double distance);
"#;

const ACOUSTIC_INTERFACE_V2: &str = r#"
%module acoustic

struct Solver {
    double tolerance;
    int max_iterations;
};

double acoustic_pressure(double distance);
double acoustic_intensity(double distance);
"#;

const THERMAL_INTERFACE: &str = r#"
%module thermal

struct Solver {
    double conductivity;
};

double thermal_flux(double gradient);
"#;

/// Stands in for both the compiler and the linker: concatenates every
/// readable file argument into the path named after `-o`, so content
/// changes propagate through objects and libraries
const CC_BODY: &str = r#"
out=""
prev=""
for a in "$@"; do
  [ "$prev" = "-o" ] && out="$a"
  prev="$a"
done
: > "$out"
for a in "$@"; do
  case "$a" in
    -*) ;;
    "$out") ;;
    *) [ -f "$a" ] && cat "$a" >> "$out" ;;
  esac
done
exit 0
"#;

/// Rejects one specific source, everything else compiles normally
const FAILING_CC_GUARD: &str = r#"
case "$*" in
  *mesh.c*) echo 'mesh.c: unresolvable intrinsic' >&2; exit 1 ;;
esac
"#;

/// Honors the generator invocation shape: writes the glue source to `-o`,
/// the binding next to it in `-outdir`, and an identifier dump as the
/// symbol index
const SWIG_BODY: &str = r#"
module=""
outdir=""
glue=""
interface=""
while [ $# -gt 0 ]; do
  case "$1" in
    -module) module="$2"; shift 2 ;;
    -outdir) outdir="$2"; shift 2 ;;
    -o) glue="$2"; shift 2 ;;
    -*) shift ;;
    *) interface="$1"; shift ;;
  esac
done
{ printf '/* %s glue */\n' "$module"; cat "$interface"; } > "$glue"
cp "$interface" "$outdir/$module.py"
grep -o '[A-Za-z_][A-Za-z0-9_]*' "$interface" | sort -u > "$outdir/$module.symbols"
exit 0
"#;

/// Fakes `setup.py sdist`: drops the conventionally named archive into
/// the requested dist directory
const PYTHON3_BODY: &str = r#"
dist=""
prev=""
for a in "$@"; do
  [ "$prev" = "--dist-dir" ] && dist="$a"
  prev="$a"
done
mkdir -p "$dist"
printf 'sdist bytes' > "$dist/acoustics-2.7.0.tar.gz"
exit 0
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct Project {
    temp: TempDir,
    tools: PathBuf,
}

impl Project {
    fn new() -> Self {
        Self::with_manifest(MANIFEST)
    }

    fn with_manifest(manifest: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/core")).unwrap();
        fs::create_dir_all(root.join("interfaces")).unwrap();
        fs::create_dir_all(root.join("include")).unwrap();
        fs::write(root.join("bindery.toml"), manifest).unwrap();
        fs::write(
            root.join("src/core/field.c"),
            "double field_sample(double x) { return x; }\n",
        )
        .unwrap();
        fs::write(
            root.join("src/core/mesh.c"),
            "int mesh_cells(void) { return 64; }\n",
        )
        .unwrap();
        fs::write(root.join("include/acoustics.h"), "#pragma once\n").unwrap();
        fs::write(root.join("interfaces/acoustic.i"), ACOUSTIC_INTERFACE).unwrap();
        fs::write(root.join("interfaces/thermal.i"), THERMAL_INTERFACE).unwrap();

        let tools = root.join("fake-tools");
        fs::create_dir_all(&tools).unwrap();
        Self { temp, tools }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn out(&self) -> PathBuf {
        self.root().join("target/bindery")
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        write_script(&self.tools, name, body)
    }

    fn builder(&self) -> Builder {
        Builder::new(self.root()).unwrap()
    }
}

fn status<'a>(summary: &'a BuildSummary, id: &str) -> &'a NodeStatus {
    &summary
        .nodes
        .iter()
        .find(|n| n.id == id)
        .unwrap_or_else(|| panic!("no node {} in the report", id))
        .status
}

#[test]
fn test_cpp_pipeline_builds_and_packages() {
    let project = Project::new();
    let cc = project.script("cc", CC_BODY);

    let summary = project
        .builder()
        .with_languages(vec![Language::Cpp])
        .with_tool("cc", &cc)
        .build(&no_progress)
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.version, "2.7.0");
    assert_eq!(summary.version_source, VersionSource::Sentinel);
    assert_eq!(summary.stats.total_nodes, 4);
    assert_eq!(summary.stats.executed, 4);
    assert_eq!(summary.stats.failed, 0);

    let artifact = project.out().join("dist/acoustics_cpp_2.7.0.tar.gz");
    assert!(artifact.is_file());
    assert_eq!(summary.packages.len(), 1);
    assert_eq!(summary.packages[0].file, "acoustics_cpp_2.7.0.tar.gz");
    assert_eq!(summary.packages[0].sha256.len(), 64);

    let index: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(project.out().join("dist/index.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(index["packages"][0]["language"], "cpp");
    assert_eq!(index["packages"][0]["file"], "acoustics_cpp_2.7.0.tar.gz");
}

#[test]
fn test_second_run_is_fully_up_to_date() {
    let project = Project::new();
    let cc = project.script("cc", CC_BODY);
    let builder = project
        .builder()
        .with_languages(vec![Language::Cpp])
        .with_tool("cc", &cc);

    let first = builder.build(&no_progress).unwrap();
    assert_eq!(first.stats.executed, 4);

    let second = builder.build(&no_progress).unwrap();
    assert!(second.success);
    assert_eq!(second.stats.executed, 0);
    assert_eq!(second.stats.up_to_date, 4);
    // The index still lists the artifact on a fully cached run
    assert_eq!(second.packages.len(), 1);
}

#[test]
fn test_python_pipeline_renames_colliding_symbols() {
    let project = Project::new();
    let cc = project.script("cc", CC_BODY);
    let swig = project.script("swig", SWIG_BODY);
    let python3 = project.script("python3", PYTHON3_BODY);

    let summary = project
        .builder()
        .with_languages(vec![Language::Python])
        .with_tool("cc", &cc)
        .with_tool("swig", &swig)
        .with_tool("python3", &python3)
        .with_jobs(2)
        .build(&no_progress)
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.stats.total_nodes, 8);
    assert_eq!(summary.stats.executed, 8);

    let gen = project.out().join("gen/python");
    let acoustic_glue = fs::read_to_string(gen.join("acoustic/acoustic_wrap.c")).unwrap();
    let thermal_glue = fs::read_to_string(gen.join("thermal/thermal_wrap.c")).unwrap();
    assert!(acoustic_glue.contains("Acoustic_Solver"));
    assert!(!acoustic_glue.contains("struct Solver"));
    assert!(thermal_glue.contains("Thermal_Solver"));
    // Names exported by only one module stay as they are
    assert!(acoustic_glue.contains("acoustic_pressure"));
    assert!(thermal_glue.contains("thermal_flux"));

    let binding = fs::read_to_string(gen.join("acoustic/acoustic.py")).unwrap();
    assert!(binding.contains("Acoustic_Solver"));

    assert!(project
        .out()
        .join("dist/acoustics_python_2.7.0.tar.gz")
        .is_file());
}

#[test]
fn test_one_run_packages_two_languages_at_the_same_version() {
    let project = Project::new();
    let cc = project.script("cc", CC_BODY);
    let swig = project.script("swig", SWIG_BODY);
    let python3 = project.script("python3", PYTHON3_BODY);

    let summary = project
        .builder()
        .with_languages(vec![Language::Cpp, Language::Python])
        .with_tool("cc", &cc)
        .with_tool("swig", &swig)
        .with_tool("python3", &python3)
        .build(&no_progress)
        .unwrap();

    assert!(summary.success);
    // Requested order is normalized; python precedes cpp canonically
    assert_eq!(summary.languages, vec![Language::Python, Language::Cpp]);
    // 2 core compiles shared by both links, 6 python nodes, 2 cpp nodes
    assert_eq!(summary.stats.total_nodes, 10);
    assert_eq!(summary.stats.executed, 10);
    assert_eq!(
        summary
            .nodes
            .iter()
            .filter(|n| n.id.starts_with("compile:core:"))
            .count(),
        2
    );

    assert_eq!(summary.packages.len(), 2);
    assert_eq!(summary.packages[0].file, "acoustics_python_2.7.0.tar.gz");
    assert_eq!(summary.packages[1].file, "acoustics_cpp_2.7.0.tar.gz");
    assert!(summary.packages.iter().all(|p| p.version == "2.7.0"));
    assert!(project
        .out()
        .join("dist/acoustics_python_2.7.0.tar.gz")
        .is_file());
    assert!(project.out().join("dist/acoustics_cpp_2.7.0.tar.gz").is_file());

    let index: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(project.out().join("dist/index.json")).unwrap(),
    )
    .unwrap();
    let entries = index["packages"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["version"] == "2.7.0"));
}

#[test]
fn test_touched_interface_rebuilds_only_its_subtree() {
    let project = Project::new();
    let cc = project.script("cc", CC_BODY);
    let swig = project.script("swig", SWIG_BODY);
    let python3 = project.script("python3", PYTHON3_BODY);
    let builder = project
        .builder()
        .with_languages(vec![Language::Python])
        .with_tool("cc", &cc)
        .with_tool("swig", &swig)
        .with_tool("python3", &python3);

    builder.build(&no_progress).unwrap();

    thread::sleep(Duration::from_millis(30));
    // Still exports Solver, so the rename table and the action stay stable
    fs::write(
        project.root().join("interfaces/acoustic.i"),
        ACOUSTIC_INTERFACE_V2,
    )
    .unwrap();

    let second = builder.build(&no_progress).unwrap();
    assert!(second.success);
    assert_eq!(
        status(&second, "codegen:python:acoustic"),
        &NodeStatus::Succeeded
    );
    assert_eq!(
        status(&second, "compile:python:acoustic_wrap"),
        &NodeStatus::Succeeded
    );
    assert_eq!(status(&second, "link:python"), &NodeStatus::Succeeded);
    assert_eq!(status(&second, "package:python"), &NodeStatus::Succeeded);
    assert_eq!(
        status(&second, "codegen:python:thermal"),
        &NodeStatus::UpToDate
    );
    assert_eq!(
        status(&second, "compile:python:thermal_wrap"),
        &NodeStatus::UpToDate
    );
    assert_eq!(status(&second, "compile:core:field"), &NodeStatus::UpToDate);
    assert_eq!(status(&second, "compile:core:mesh"), &NodeStatus::UpToDate);
    assert_eq!(second.stats.executed, 4);
    assert_eq!(second.stats.up_to_date, 4);

    let glue = fs::read_to_string(
        project.out().join("gen/python/acoustic/acoustic_wrap.c"),
    )
    .unwrap();
    assert!(glue.contains("acoustic_intensity"));
    assert!(glue.contains("Acoustic_Solver"));
}

#[test]
fn test_failed_node_poisons_dependents_and_resumes() {
    let project = Project::new();
    let cc = project.script("cc", &format!("{}\n{}", FAILING_CC_GUARD, CC_BODY));
    let builder = project
        .builder()
        .with_languages(vec![Language::Cpp])
        .with_tool("cc", &cc);

    let first = builder.build(&no_progress).unwrap();
    assert!(!first.success);
    assert_eq!(status(&first, "compile:core:field"), &NodeStatus::Succeeded);
    assert!(matches!(
        status(&first, "compile:core:mesh"),
        NodeStatus::Failed { reason } if reason.contains("unresolvable intrinsic")
    ));
    assert_eq!(status(&first, "link:cpp"), &NodeStatus::NotAttempted);
    assert_eq!(status(&first, "package:cpp"), &NodeStatus::NotAttempted);
    assert!(first.packages.is_empty());
    assert!(!project.out().join("dist/index.json").exists());

    // Fix the compiler; only the failed node and its dependents run
    project.script("cc", CC_BODY);
    let second = builder.build(&no_progress).unwrap();
    assert!(second.success);
    assert_eq!(status(&second, "compile:core:field"), &NodeStatus::UpToDate);
    assert_eq!(status(&second, "compile:core:mesh"), &NodeStatus::Succeeded);
    assert_eq!(status(&second, "link:cpp"), &NodeStatus::Succeeded);
    assert_eq!(status(&second, "package:cpp"), &NodeStatus::Succeeded);
    assert_eq!(second.stats.executed, 3);
    assert!(project.out().join("dist/acoustics_cpp_2.7.0.tar.gz").is_file());
}

#[test]
fn test_explicit_language_without_toolchain_is_fatal() {
    let manifest = MANIFEST.replace(
        "[core]",
        "[codegen]\ntool = \"bindery_check_gen\"\n\n[core]",
    );
    let project = Project::with_manifest(&manifest);
    let cc = project.script("cc", CC_BODY);

    let err = project
        .builder()
        .with_languages(vec![Language::Python])
        .with_tool("cc", &cc)
        .build(&no_progress)
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("bindery_check_gen"));
}

#[test]
fn test_capable_selection_skips_languages_missing_the_generator() {
    let manifest = MANIFEST.replace(
        "[core]",
        "[codegen]\ntool = \"bindery_check_gen\"\n\n[core]",
    );
    let project = Project::with_manifest(&manifest);
    let cc = project.script("cc", CC_BODY);

    let summary = project
        .builder()
        .with_tool("cc", &cc)
        .build(&no_progress)
        .unwrap();

    // Every glue language misses the generator; cpp still builds
    assert!(summary.success);
    assert_eq!(summary.languages, vec![Language::Cpp]);
    assert_eq!(summary.skipped.len(), 3);
    assert!(summary
        .skipped
        .iter()
        .all(|s| s.missing.iter().any(|m| m == "bindery_check_gen")));
    assert!(project.out().join("dist/acoustics_cpp_2.7.0.tar.gz").is_file());
}

#[test]
fn test_preview_reports_staleness_without_building() {
    let project = Project::new();
    let cc = project.script("cc", CC_BODY);
    let builder = project
        .builder()
        .with_languages(vec![Language::Cpp])
        .with_tool("cc", &cc);

    let (resolved, plans) = builder.preview().unwrap();
    assert_eq!(resolved.languages, vec![Language::Cpp]);
    assert_eq!(plans.len(), 4);
    assert!(plans.iter().all(|p| p.staleness == Staleness::NeverBuilt));
    // Previewing leaves the output tree untouched
    assert!(!project.out().exists());

    builder.build(&no_progress).unwrap();
    let (_, plans) = builder.preview().unwrap();
    assert!(plans.iter().all(|p| p.staleness == Staleness::Fresh));
}

#[test]
fn test_pre_release_tag_flows_into_artifact_names() {
    let project = Project::new();
    let cc = project.script("cc", CC_BODY);

    let summary = project
        .builder()
        .with_languages(vec![Language::Cpp])
        .with_tool("cc", &cc)
        .with_pre_release("rc1")
        .build(&no_progress)
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.version, "2.7.0-rc1");
    assert!(project
        .out()
        .join("dist/acoustics_cpp_2.7.0-rc1.tar.gz")
        .is_file());
    assert_eq!(summary.packages[0].file, "acoustics_cpp_2.7.0-rc1.tar.gz");
}
