//! Multi-language build pipeline
//!
//! Turns a `bindery.toml` project into one distributable package per
//! target language:
//! - Platform and toolchain probing with overrides
//! - Per-language capability gating
//! - Rule-driven node graph with implied dependency edges
//! - Incremental wave-parallel scheduling (mtime + action fingerprints)
//! - Wrapper generator invocation with collision renaming
//! - Native compile/link command synthesis per platform

pub mod action;
pub mod builder;
pub mod capability;
pub mod codegen;
pub mod error;
pub mod exec;
pub mod fingerprint;
pub mod graph;
pub mod layout;
pub mod output;
pub mod platform;
pub mod rules;
pub mod scheduler;

// Re-export main types
pub use action::{Action, ActionKind, ToolCommand};
pub use builder::{Builder, LanguageSelection, ResolvedBuild};
pub use capability::{CapabilitySet, LanguageStatus};
pub use codegen::{CodegenAction, RenameRule, RenameTable};
pub use error::{BuildError, BuildResult};
pub use fingerprint::{action_fingerprint, check_staleness, FingerprintStore, Staleness};
pub use graph::{BuildGraph, BuildNode};
pub use layout::{OutputLayout, DEFAULT_OUT_DIR, FINGERPRINTS_FILE};
pub use output::{BuildStats, BuildSummary, OutputMode, SkippedLanguage};
pub use platform::{Arch, Compiler, CompilerKind, Os, PlatformProfile, ProbeOptions, KNOWN_TOOLS};
pub use rules::{PlanContext, Rule, Rules};
pub use scheduler::{
    no_progress, BuildReport, NodePlan, NodeReport, NodeStatus, ProgressEvent, ProgressFn,
    Scheduler,
};

// Re-export the config and package types callers usually need alongside
pub use bindery_config::{Language, ProjectManifest};
pub use bindery_package::{ArtifactVersion, IndexEntry, VersionSource};
