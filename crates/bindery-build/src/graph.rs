//! Build graph: nodes with implied edges, topological waves
//!
//! Edges are never declared. A node depends on another exactly when one of
//! its input paths is the other's declared output, so the graph is fully
//! determined by what the rules say each node reads and writes. Inputs
//! produced by no node are source files.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use bindery_config::Language;

use crate::action::Action;
use crate::error::{BuildError, BuildResult};

/// One unit of schedulable work
#[derive(Debug, Clone)]
pub struct BuildNode {
    /// Unique label, `<kind>:<lang>:<subject>`
    pub id: String,
    pub action: Action,
    /// `None` for language-neutral work (core compiles)
    pub language: Option<Language>,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

impl BuildNode {
    pub fn new(id: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            action,
            language: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn for_language(mut self, lang: Language) -> Self {
        self.language = Some(lang);
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<PathBuf>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }
}

/// Immutable node DAG with precomputed dependency edges
#[derive(Debug, Clone)]
pub struct BuildGraph {
    nodes: Vec<BuildNode>,
    index: HashMap<String, usize>,
    /// Output path -> producing node
    producers: HashMap<PathBuf, usize>,
    /// Node -> producer nodes of its inputs
    dependencies: Vec<Vec<usize>>,
}

impl BuildGraph {
    /// Build the graph, validating id and output uniqueness and resolving
    /// every edge
    pub fn from_nodes(nodes: Vec<BuildNode>) -> BuildResult<Self> {
        let mut index = HashMap::new();
        let mut producers: HashMap<PathBuf, usize> = HashMap::new();

        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(BuildError::config(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
            for output in &node.outputs {
                if let Some(&first) = producers.get(output) {
                    return Err(BuildError::DuplicateOutput {
                        path: output.clone(),
                        first: nodes[first].id.clone(),
                        second: node.id.clone(),
                    });
                }
                producers.insert(output.clone(), i);
            }
        }

        let mut dependencies = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let mut deps: Vec<usize> = node
                .inputs
                .iter()
                .filter_map(|input| producers.get(input).copied())
                .filter(|&producer| producer != i)
                .collect();
            deps.sort_unstable();
            deps.dedup();
            dependencies.push(deps);
        }

        Ok(Self {
            nodes,
            index,
            producers,
            dependencies,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[BuildNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &BuildNode {
        &self.nodes[idx]
    }

    pub fn get(&self, id: &str) -> Option<&BuildNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn index_of(&self, id: &str) -> BuildResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| BuildError::NodeNotFound(id.to_string()))
    }

    /// Producer nodes this node's inputs come from
    pub fn dependencies(&self, idx: usize) -> &[usize] {
        &self.dependencies[idx]
    }

    /// Whether any node produces this path
    pub fn has_producer(&self, path: &PathBuf) -> bool {
        self.producers.contains_key(path)
    }

    /// Nodes that consume this node's outputs, directly
    pub fn dependents(&self, idx: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.dependencies[i].contains(&idx))
            .collect()
    }

    /// Every node downstream of this one
    pub fn transitive_dependents(&self, idx: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([idx]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents(current) {
                if seen.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }
        seen
    }

    /// Compute a topological order using Kahn's algorithm
    pub fn topo_order(&self) -> BuildResult<Vec<usize>> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(i) = queue.pop_front() {
            order.push(i);
            for dependent in self.dependents(i) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(BuildError::DependencyCycle(self.find_cycle()));
        }
        Ok(order)
    }

    /// Group nodes into waves; every node's producers live in an earlier
    /// wave, so the nodes of one wave can run concurrently
    pub fn parallel_groups(&self) -> BuildResult<Vec<Vec<usize>>> {
        let mut groups = Vec::new();
        let mut done: HashSet<usize> = HashSet::new();

        loop {
            let mut group: Vec<usize> = (0..self.nodes.len())
                .filter(|i| !done.contains(i))
                .filter(|&i| self.dependencies[i].iter().all(|d| done.contains(d)))
                .collect();
            if group.is_empty() {
                break;
            }
            group.sort_unstable();
            done.extend(group.iter().copied());
            groups.push(group);
        }

        if done.len() != self.nodes.len() {
            return Err(BuildError::DependencyCycle(self.find_cycle()));
        }
        Ok(groups)
    }

    /// Locate one cycle for error reporting
    fn find_cycle(&self) -> String {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut path = Vec::new();

        for start in 0..self.nodes.len() {
            if let Some(cycle) = self.dfs_cycle(start, &mut visited, &mut stack, &mut path) {
                return cycle;
            }
        }
        "unknown cycle".to_string()
    }

    fn dfs_cycle(
        &self,
        node: usize,
        visited: &mut HashSet<usize>,
        stack: &mut HashSet<usize>,
        path: &mut Vec<usize>,
    ) -> Option<String> {
        if stack.contains(&node) {
            let from = path.iter().position(|&n| n == node).unwrap_or(0);
            let mut ids: Vec<&str> = path[from..].iter().map(|&n| self.nodes[n].id.as_str()).collect();
            ids.push(&self.nodes[node].id);
            return Some(ids.join(" -> "));
        }
        if !visited.insert(node) {
            return None;
        }
        stack.insert(node);
        path.push(node);

        for &dep in &self.dependencies[node] {
            if let Some(cycle) = self.dfs_cycle(dep, visited, stack, path) {
                return Some(cycle);
            }
        }

        stack.remove(&node);
        path.pop();
        None
    }
}
