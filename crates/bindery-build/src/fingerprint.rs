//! Action fingerprints and staleness
//!
//! A node re-runs when an output is missing, an output is older than an
//! input, or the recorded action fingerprint differs from the current one.
//! The fingerprint is the SHA-256 of the serialized action, so command
//! lines, rename sets and staging requests all key the decision. Recorded
//! fingerprints persist in `fingerprints.json` under the output root.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::action::Action;
use crate::error::{BuildError, BuildResult};
use crate::graph::BuildNode;

/// SHA-256 of the serialized action definition
pub fn action_fingerprint(action: &Action) -> BuildResult<String> {
    let serialized = serde_json::to_string(action)
        .map_err(|e| BuildError::config(format!("unserializable action: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Persisted node-id -> fingerprint map
#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Load the store; a missing or unreadable file starts empty, it is
    /// only a cache
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn get(&self, node_id: &str) -> Option<&str> {
        self.entries.get(node_id).map(String::as_str)
    }

    /// Record a successful run
    pub fn record(&mut self, node_id: impl Into<String>, fingerprint: impl Into<String>) {
        self.entries.insert(node_id.into(), fingerprint.into());
    }

    /// Drop a node's record; a failed run may leave half-written outputs
    /// with fresh timestamps, so the node must stay stale
    pub fn forget(&mut self, node_id: &str) {
        self.entries.remove(node_id);
    }

    pub fn save(&self) -> BuildResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| BuildError::config(format!("unserializable fingerprints: {}", e)))?;
        fs::write(&self.path, content).map_err(|e| BuildError::io(&self.path, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a node needs to run, or that it does not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Staleness {
    Fresh,
    NeverBuilt,
    ActionChanged,
    MissingOutput(PathBuf),
    OutdatedOutput { output: PathBuf, input: PathBuf },
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staleness::Fresh => write!(f, "up to date"),
            Staleness::NeverBuilt => write!(f, "never built"),
            Staleness::ActionChanged => write!(f, "action changed"),
            Staleness::MissingOutput(path) => write!(f, "missing output {}", path.display()),
            Staleness::OutdatedOutput { output, input } => write!(
                f,
                "{} older than {}",
                output.display(),
                input.display()
            ),
        }
    }
}

/// Decide whether a node must run
pub fn check_staleness(
    node: &BuildNode,
    fingerprint: &str,
    store: &FingerprintStore,
) -> Staleness {
    match store.get(&node.id) {
        None => return Staleness::NeverBuilt,
        Some(recorded) if recorded != fingerprint => return Staleness::ActionChanged,
        Some(_) => {}
    }

    let mut oldest_output: Option<(SystemTime, &PathBuf)> = None;
    for output in &node.outputs {
        match mtime(output) {
            Ok(time) => {
                if oldest_output.map_or(true, |(oldest, _)| time < oldest) {
                    oldest_output = Some((time, output));
                }
            }
            Err(_) => return Staleness::MissingOutput(output.clone()),
        }
    }

    if let Some((output_time, output)) = oldest_output {
        for input in &node.inputs {
            // Missing source inputs are a scheduling failure, not staleness
            if let Ok(input_time) = mtime(input) {
                if input_time > output_time {
                    return Staleness::OutdatedOutput {
                        output: output.clone(),
                        input: input.clone(),
                    };
                }
            }
        }
    }

    Staleness::Fresh
}

fn mtime(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
