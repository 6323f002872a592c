//! Build output formatting and reporting

use serde::Serialize;
use std::time::Duration;

use bindery_config::Language;
use bindery_package::{IndexEntry, VersionSource};

use crate::error::{BuildError, BuildResult};
use crate::scheduler::{BuildReport, NodeReport, NodeStatus};

/// How much the build prints, and in what shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Summary block plus warnings
    Normal,
    /// Per-node lines as they run
    Verbose,
    /// Errors only
    Quiet,
    /// Machine-readable summary on stdout
    Json,
}

impl OutputMode {
    /// Resolve the mode from the usual CLI flag triple. `--json` wins,
    /// then `--quiet`, then `--verbose`.
    pub fn from_flags(verbose: bool, quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else if verbose {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, OutputMode::Json)
    }

    /// Whether a progress bar makes sense in this mode
    pub fn show_progress(&self) -> bool {
        matches!(self, OutputMode::Normal)
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, OutputMode::Verbose)
    }
}

/// A language dropped from the run because its toolchain is incomplete
#[derive(Debug, Clone, Serialize)]
pub struct SkippedLanguage {
    pub language: Language,
    pub missing: Vec<String>,
}

/// Aggregate counters for one run
#[derive(Debug, Clone, Serialize)]
pub struct BuildStats {
    pub total_nodes: usize,
    pub executed: usize,
    pub up_to_date: usize,
    pub failed: usize,
    pub not_attempted: usize,
    pub waves: usize,
    pub duration_ms: u64,
}

impl BuildStats {
    pub fn from_report(report: &BuildReport, duration: Duration) -> Self {
        Self {
            total_nodes: report.nodes.len(),
            executed: report.executed(),
            up_to_date: report.up_to_date(),
            failed: report.failed(),
            not_attempted: report.not_attempted(),
            waves: report.waves,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Full result of one invocation, in both human and JSON shapes
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub success: bool,
    pub product: String,
    pub version: String,
    pub version_source: VersionSource,
    pub platform: String,
    pub languages: Vec<Language>,
    pub skipped: Vec<SkippedLanguage>,
    pub stats: BuildStats,
    pub nodes: Vec<NodeReport>,
    pub packages: Vec<IndexEntry>,
}

impl BuildSummary {
    pub fn to_json(&self) -> BuildResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BuildError::config(format!("cannot serialize summary: {}", e)))
    }

    /// Console block: a headline between rules, then the key counters
    pub fn human_block(&self) -> String {
        let rule = "=".repeat(60);
        let languages = self
            .languages
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let headline = if self.success {
            format!("Build succeeded in {}", format_millis(self.stats.duration_ms))
        } else {
            format!("Build failed after {}", format_millis(self.stats.duration_ms))
        };

        let mut block = String::new();
        block.push_str(&rule);
        block.push('\n');
        block.push_str(&headline);
        block.push('\n');
        block.push_str(&rule);
        block.push('\n');
        block.push_str(&format!("  Product:   {} v{}\n", self.product, self.version));
        block.push_str(&format!("  Platform:  {}\n", self.platform));
        block.push_str(&format!("  Languages: {}\n", languages));
        block.push_str(&format!(
            "  Nodes:     {} executed, {} up to date",
            self.stats.executed, self.stats.up_to_date
        ));
        if self.stats.failed > 0 || self.stats.not_attempted > 0 {
            block.push_str(&format!(
                ", {} failed, {} not attempted",
                self.stats.failed, self.stats.not_attempted
            ));
        }
        block.push('\n');
        block.push_str(&format!("  Waves:     {}\n", self.stats.waves));
        block.push_str(&format!("  Packages:  {}\n", self.packages.len()));
        block.push_str(&rule);
        block
    }

    /// One line per failed node, reason attached
    pub fn failure_lines(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.status {
                NodeStatus::Failed { reason } => Some(format!("{}: {}", n.id, reason)),
                _ => None,
            })
            .collect()
    }

    /// One warning line per skipped language
    pub fn skip_lines(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|s| {
                format!(
                    "skipping {}: missing {}",
                    s.language,
                    s.missing.join(", ")
                )
            })
            .collect()
    }

    /// Per-node detail lines for verbose mode, in graph order
    pub fn node_lines(&self) -> Vec<String> {
        self.nodes.iter().map(node_line).collect()
    }
}

fn node_line(node: &NodeReport) -> String {
    let (state, detail) = match &node.status {
        NodeStatus::Succeeded => ("built", node.duration_ms.map(format_millis)),
        NodeStatus::UpToDate => ("fresh", None),
        NodeStatus::Failed { .. } => ("FAILED", None),
        NodeStatus::NotAttempted => ("skipped", None),
    };
    match detail {
        Some(elapsed) => format!("  [{:<7}] {} ({})", state, node.id, elapsed),
        None => format!("  [{:<7}] {}", state, node.id),
    }
}

fn format_millis(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}
