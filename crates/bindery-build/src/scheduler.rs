//! Wave-parallel incremental scheduler
//!
//! Nodes execute in topological waves on a bounded thread pool. Before a
//! wave runs, each of its nodes is gated: producers must have succeeded
//! (or been fresh), source inputs must exist, and the staleness check
//! decides between running and skipping. A failed node never stops its
//! siblings; its transitive dependents are simply never attempted, and a
//! re-invocation picks up exactly the incomplete nodes because only
//! successful runs record their fingerprint.

use serde::Serialize;
use std::time::Instant;

use rayon::prelude::*;

use crate::action::ActionKind;
use crate::error::{BuildError, BuildResult};
use crate::exec;
use crate::fingerprint::{action_fingerprint, check_staleness, FingerprintStore, Staleness};
use crate::graph::BuildGraph;

/// Terminal state of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    /// Ran this invocation and succeeded
    Succeeded,
    /// Outputs fresh; nothing to do
    UpToDate,
    Failed { reason: String },
    /// An upstream producer failed
    NotAttempted,
}

impl NodeStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, NodeStatus::Succeeded | NodeStatus::UpToDate)
    }
}

/// Per-node outcome in graph order
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub id: String,
    #[serde(flatten)]
    pub status: NodeStatus,
    /// Wall time of the action, when it ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Everything that happened in one scheduler run
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub nodes: Vec<NodeReport>,
    /// Topological wave count of the executed graph
    pub waves: usize,
}

impl BuildReport {
    pub fn executed(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Succeeded))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::UpToDate))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Failed { .. }))
    }

    pub fn not_attempted(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::NotAttempted))
    }

    /// Every node succeeded or was fresh
    pub fn success(&self) -> bool {
        self.nodes.iter().all(|n| n.status.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.status, NodeStatus::Failed { .. }))
    }

    pub fn status_of(&self, id: &str) -> Option<&NodeStatus> {
        self.nodes.iter().find(|n| n.id == id).map(|n| &n.status)
    }

    fn count(&self, pred: impl Fn(&NodeStatus) -> bool) -> usize {
        self.nodes.iter().filter(|n| pred(&n.status)).count()
    }
}

/// Scheduler progress, fed to the caller's callback as nodes start and
/// finish
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// Emitted once before the first wave
    Begin { total: usize },
    Started { id: &'a str },
    Finished { id: &'a str, status: &'a NodeStatus },
}

pub type ProgressFn<'a> = &'a (dyn Fn(ProgressEvent<'_>) + Sync);

/// No-op progress callback
pub fn no_progress(_: ProgressEvent<'_>) {}

/// One node of a dry-run plan
#[derive(Debug, Clone, Serialize)]
pub struct NodePlan {
    pub id: String,
    pub kind: ActionKind,
    pub staleness: Staleness,
}

/// Compute what a run would do, without executing anything
pub fn preview(graph: &BuildGraph, store: &FingerprintStore) -> BuildResult<Vec<NodePlan>> {
    let order = graph.topo_order()?;
    let mut plans = Vec::with_capacity(order.len());
    for idx in order {
        let node = graph.node(idx);
        let fingerprint = action_fingerprint(&node.action)?;
        plans.push(NodePlan {
            id: node.id.clone(),
            kind: node.action.kind(),
            staleness: check_staleness(node, &fingerprint, store),
        });
    }
    Ok(plans)
}

/// Bounded wave-parallel executor
pub struct Scheduler {
    jobs: usize,
}

impl Scheduler {
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }

    /// Run every stale node the graph allows, recording fingerprints for
    /// successes and dropping them for failures. The store is saved even
    /// when nodes fail, so a re-invocation resumes where this one stopped.
    pub fn run(
        &self,
        graph: &BuildGraph,
        store: &mut FingerprintStore,
        progress: ProgressFn<'_>,
    ) -> BuildResult<BuildReport> {
        let groups = graph.parallel_groups()?;
        let waves = groups.len();
        let fingerprints: Vec<String> = graph
            .nodes()
            .iter()
            .map(|node| action_fingerprint(&node.action))
            .collect::<BuildResult<_>>()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| BuildError::config(format!("cannot build thread pool: {}", e)))?;

        let mut statuses: Vec<Option<NodeStatus>> = vec![None; graph.len()];
        let mut durations: Vec<Option<u64>> = vec![None; graph.len()];
        progress(ProgressEvent::Begin { total: graph.len() });

        for group in groups {
            let mut runnable = Vec::new();
            for idx in group {
                let node = graph.node(idx);

                let upstream_ok = graph
                    .dependencies(idx)
                    .iter()
                    .all(|&dep| statuses[dep].as_ref().is_some_and(NodeStatus::is_ok));
                if !upstream_ok {
                    statuses[idx] = Some(NodeStatus::NotAttempted);
                    progress(ProgressEvent::Finished {
                        id: &node.id,
                        status: &NodeStatus::NotAttempted,
                    });
                    continue;
                }

                if let Some(missing) = missing_source_input(graph, idx) {
                    let status = NodeStatus::Failed {
                        reason: BuildError::MissingInput {
                            node: node.id.clone(),
                            path: missing,
                        }
                        .to_string(),
                    };
                    store.forget(&node.id);
                    progress(ProgressEvent::Finished {
                        id: &node.id,
                        status: &status,
                    });
                    statuses[idx] = Some(status);
                    continue;
                }

                if !check_staleness(node, &fingerprints[idx], store).is_stale() {
                    statuses[idx] = Some(NodeStatus::UpToDate);
                    progress(ProgressEvent::Finished {
                        id: &node.id,
                        status: &NodeStatus::UpToDate,
                    });
                    continue;
                }

                runnable.push(idx);
            }

            let results: Vec<(usize, Result<u64, String>)> = pool.install(|| {
                runnable
                    .par_iter()
                    .map(|&idx| {
                        let node = graph.node(idx);
                        progress(ProgressEvent::Started { id: &node.id });
                        let start = Instant::now();
                        let outcome = exec::execute(node)
                            .map(|_| start.elapsed().as_millis() as u64)
                            .map_err(|e| e.to_string());
                        (idx, outcome)
                    })
                    .collect()
            });

            for (idx, outcome) in results {
                let node = graph.node(idx);
                let status = match outcome {
                    Ok(elapsed) => {
                        durations[idx] = Some(elapsed);
                        store.record(&node.id, &fingerprints[idx]);
                        NodeStatus::Succeeded
                    }
                    Err(reason) => {
                        store.forget(&node.id);
                        NodeStatus::Failed { reason }
                    }
                };
                progress(ProgressEvent::Finished {
                    id: &node.id,
                    status: &status,
                });
                statuses[idx] = Some(status);
            }
        }

        store.save()?;

        let nodes = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, node)| NodeReport {
                id: node.id.clone(),
                status: statuses[idx].take().unwrap_or(NodeStatus::NotAttempted),
                duration_ms: durations[idx],
            })
            .collect();
        Ok(BuildReport { nodes, waves })
    }
}

/// First input that neither exists nor is produced by another node
fn missing_source_input(graph: &BuildGraph, idx: usize) -> Option<std::path::PathBuf> {
    graph
        .node(idx)
        .inputs
        .iter()
        .find(|input| !graph.has_producer(input) && !input.exists())
        .cloned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::action::{Action, ToolCommand};
    use crate::graph::BuildNode;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn copy_node(id: &str, tool: &Path, input: &Path, output: &Path) -> BuildNode {
        BuildNode::new(
            id,
            Action::Compile(
                ToolCommand::new(tool)
                    .path_arg(input)
                    .path_arg(output),
            ),
        )
        .with_inputs(vec![input.to_path_buf()])
        .with_outputs(vec![output.to_path_buf()])
    }

    struct Fixture {
        temp: TempDir,
        copy: PathBuf,
        fail: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let copy = write_script(temp.path(), "copy", "cp \"$1\" \"$2\"");
            let fail = write_script(temp.path(), "fail", "echo broken >&2; exit 1");
            Self { temp, copy, fail }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.temp.path().join(name)
        }

        fn store(&self) -> FingerprintStore {
            FingerprintStore::load(self.path("fingerprints.json"))
        }
    }

    #[test]
    fn test_chain_executes_then_is_up_to_date() {
        let fixture = Fixture::new();
        fs::write(fixture.path("a.src"), "source").unwrap();
        let graph = BuildGraph::from_nodes(vec![
            copy_node(
                "compile",
                &fixture.copy,
                &fixture.path("a.src"),
                &fixture.path("a.obj"),
            ),
            copy_node(
                "link",
                &fixture.copy,
                &fixture.path("a.obj"),
                &fixture.path("a.lib"),
            ),
        ])
        .unwrap();

        let mut store = fixture.store();
        let scheduler = Scheduler::new(2);
        let report = scheduler.run(&graph, &mut store, &no_progress).unwrap();
        assert!(report.success());
        assert_eq!(report.executed(), 2);
        assert!(fixture.path("a.lib").is_file());

        // Nothing changed: second run skips every node
        let report = scheduler.run(&graph, &mut store, &no_progress).unwrap();
        assert_eq!(report.executed(), 0);
        assert_eq!(report.up_to_date(), 2);
    }

    #[test]
    fn test_failure_propagates_to_dependents_only() {
        let fixture = Fixture::new();
        fs::write(fixture.path("a.src"), "a").unwrap();
        fs::write(fixture.path("b.src"), "b").unwrap();
        let graph = BuildGraph::from_nodes(vec![
            BuildNode::new("compile:a", Action::Compile(ToolCommand::new(&fixture.fail)))
                .with_inputs(vec![fixture.path("a.src")])
                .with_outputs(vec![fixture.path("a.obj")]),
            copy_node(
                "link:a",
                &fixture.copy,
                &fixture.path("a.obj"),
                &fixture.path("a.lib"),
            ),
            copy_node(
                "compile:b",
                &fixture.copy,
                &fixture.path("b.src"),
                &fixture.path("b.obj"),
            ),
        ])
        .unwrap();

        let mut store = fixture.store();
        let report = Scheduler::new(2)
            .run(&graph, &mut store, &no_progress)
            .unwrap();

        assert!(!report.success());
        assert!(matches!(
            report.status_of("compile:a"),
            Some(NodeStatus::Failed { .. })
        ));
        assert_eq!(report.status_of("link:a"), Some(&NodeStatus::NotAttempted));
        assert_eq!(report.status_of("compile:b"), Some(&NodeStatus::Succeeded));

        if let Some(NodeStatus::Failed { reason }) = report.status_of("compile:a") {
            assert!(reason.contains("broken"));
        }
    }

    #[test]
    fn test_missing_source_input_fails_without_running() {
        let fixture = Fixture::new();
        let graph = BuildGraph::from_nodes(vec![copy_node(
            "compile",
            &fixture.copy,
            &fixture.path("never-created.src"),
            &fixture.path("a.obj"),
        )])
        .unwrap();

        let mut store = fixture.store();
        let report = Scheduler::new(1)
            .run(&graph, &mut store, &no_progress)
            .unwrap();

        match report.status_of("compile") {
            Some(NodeStatus::Failed { reason }) => {
                assert!(reason.contains("never-created.src"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!fixture.path("a.obj").exists());
    }

    #[test]
    fn test_touched_input_reruns_downstream() {
        let fixture = Fixture::new();
        fs::write(fixture.path("a.src"), "v1").unwrap();
        let graph = BuildGraph::from_nodes(vec![
            copy_node(
                "compile",
                &fixture.copy,
                &fixture.path("a.src"),
                &fixture.path("a.obj"),
            ),
            copy_node(
                "link",
                &fixture.copy,
                &fixture.path("a.obj"),
                &fixture.path("a.lib"),
            ),
        ])
        .unwrap();

        let mut store = fixture.store();
        let scheduler = Scheduler::new(2);
        scheduler.run(&graph, &mut store, &no_progress).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(fixture.path("a.src"), "v2").unwrap();
        let report = scheduler.run(&graph, &mut store, &no_progress).unwrap();
        assert_eq!(report.executed(), 2);
        assert_eq!(fs::read_to_string(fixture.path("a.lib")).unwrap(), "v2");
    }

    #[test]
    fn test_failed_node_is_retried_on_reinvocation() {
        let fixture = Fixture::new();
        fs::write(fixture.path("a.src"), "source").unwrap();
        // Tool fails while a marker file exists, then works
        let flaky = write_script(
            fixture.temp.path(),
            "flaky",
            "if [ -e \"$(dirname \"$1\")/block\" ]; then exit 1; fi; cp \"$1\" \"$2\"",
        );
        fs::write(fixture.path("block"), "").unwrap();

        let graph = BuildGraph::from_nodes(vec![copy_node(
            "compile",
            &flaky,
            &fixture.path("a.src"),
            &fixture.path("a.obj"),
        )])
        .unwrap();

        let mut store = fixture.store();
        let scheduler = Scheduler::new(1);
        let report = scheduler.run(&graph, &mut store, &no_progress).unwrap();
        assert_eq!(report.failed(), 1);

        fs::remove_file(fixture.path("block")).unwrap();
        let report = scheduler.run(&graph, &mut store, &no_progress).unwrap();
        assert_eq!(report.executed(), 1);
        assert!(report.success());
    }

    #[test]
    fn test_preview_reports_staleness_without_executing() {
        let fixture = Fixture::new();
        fs::write(fixture.path("a.src"), "source").unwrap();
        let graph = BuildGraph::from_nodes(vec![copy_node(
            "compile",
            &fixture.copy,
            &fixture.path("a.src"),
            &fixture.path("a.obj"),
        )])
        .unwrap();

        let store = fixture.store();
        let plans = preview(&graph, &store).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].staleness, Staleness::NeverBuilt);
        assert!(!fixture.path("a.obj").exists());
    }
}
