//! Definition Graph
//!
//! Directed graph of `$ref` edges between the entries of a definition table.
//! Used to prune standalone exports down to what a node actually needs and to
//! report recursive definitions.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::schema::{Schema, Types};

/// `$ref` dependencies between definitions
#[derive(Debug, Clone, Default)]
pub struct DefinitionGraph {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DefinitionGraph {
    /// Build the graph of a definition table. References to IDs that are not
    /// in the table are dropped.
    pub fn build(types: &Types) -> Self {
        let mut graph = DiGraph::with_capacity(types.len(), types.len() * 2);
        let mut node_indices = HashMap::with_capacity(types.len());

        for id in types.keys() {
            let node_idx = graph.add_node(id.clone());
            node_indices.insert(id.clone(), node_idx);
        }

        for (from_id, scm) in types {
            let from_idx = node_indices[from_id];
            let mut seen = HashSet::new();
            scm.visit_refs(&mut |r| {
                if let Some(&to_idx) = node_indices.get(&r.id) {
                    if seen.insert(to_idx) {
                        graph.add_edge(from_idx, to_idx, ());
                    }
                }
            });
        }

        Self { graph, node_indices }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    /// Immediate dependencies of a definition, sorted.
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        let Some(&node_idx) = self.node_indices.get(id) else {
            return Vec::new();
        };

        let mut deps: Vec<&str> = self
            .graph
            .edges_directed(node_idx, Direction::Outgoing)
            .filter_map(|e| self.graph.node_weight(e.target()))
            .map(String::as_str)
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Every definition reachable from the references inside `scm`.
    pub fn reachable_from(&self, scm: &Schema) -> BTreeSet<String> {
        let mut stack = Vec::new();
        scm.visit_refs(&mut |r| {
            if let Some(&idx) = self.node_indices.get(&r.id) {
                stack.push(idx);
            }
        });

        let mut visited = HashSet::new();
        let mut result = BTreeSet::new();

        while let Some(node_idx) = stack.pop() {
            if !visited.insert(node_idx) {
                continue;
            }
            if let Some(id) = self.graph.node_weight(node_idx) {
                result.insert(id.clone());
            }
            for edge in self.graph.edges_directed(node_idx, Direction::Outgoing) {
                stack.push(edge.target());
            }
        }

        result
    }

    /// Definitions that reference themselves, directly or through others.
    pub fn recursive_ids(&self) -> BTreeSet<String> {
        let mut result = BTreeSet::new();

        for scc in kosaraju_scc(&self.graph) {
            let cyclic = scc.len() > 1
                || self
                    .graph
                    .edges_directed(scc[0], Direction::Outgoing)
                    .any(|e| e.target() == scc[0]);

            if cyclic {
                result.extend(scc.iter().filter_map(|&idx| self.graph.node_weight(idx).cloned()));
            }
        }

        result
    }
}
