//! Cycle detection over dependency graphs with opaque keys.
//!
//! Used for import/include graphs, identity `base` chains, typedef chains,
//! grouping-uses-grouping references and feature `if-feature` references.
//! Every edge on a detected cycle is reported on its own so each reference can
//! be diagnosed where it was written.

use std::hash::Hash;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// One edge lying on a dependency cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CycleEdge<K, E> {
    pub from: K,
    pub to: K,
    /// Payload of the edge, usually where the reference was written.
    pub data: E,
}

/// A directed graph with payload-carrying edges, iterated in insertion order.
#[derive(Clone, Debug)]
pub(crate) struct DependencyGraph<K, E> {
    edges: IndexMap<K, Vec<(K, E)>>,
}

impl<K: Clone + Eq + Hash, E: Clone> Default for DependencyGraph<K, E> {
    fn default() -> Self {
        Self {
            edges: IndexMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash, E: Clone> DependencyGraph<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node with no edges yet.
    pub fn add_node(&mut self, node: K) {
        self.edges.entry(node).or_default();
    }

    pub fn add_edge(&mut self, from: K, to: K, data: E) {
        self.edges.entry(from).or_default().push((to.clone(), data));
        self.edges.entry(to).or_default();
    }

    /// Every edge found on a cycle, in discovery order, without duplicates.
    pub fn cycle_edges(&self) -> Vec<CycleEdge<K, E>> {
        let mut search = CycleSearch {
            graph: self,
            visited: FxHashSet::default(),
            on_stack: Vec::new(),
            path_edges: Vec::new(),
            reported: FxHashSet::default(),
            found: Vec::new(),
        };
        for node in self.edges.keys() {
            if !search.visited.contains(node) {
                search.visit(node);
            }
        }
        search.found
    }
}

struct CycleSearch<'g, K, E> {
    graph: &'g DependencyGraph<K, E>,
    visited: FxHashSet<K>,
    on_stack: Vec<K>,
    /// `path_edges[i]` leads from `on_stack[i]` to `on_stack[i + 1]`.
    path_edges: Vec<(usize, usize)>,
    /// (node index, edge index) pairs already reported.
    reported: FxHashSet<(usize, usize)>,
    found: Vec<CycleEdge<K, E>>,
}

impl<K: Clone + Eq + Hash, E: Clone> CycleSearch<'_, K, E> {
    fn visit(&mut self, current: &K) {
        let graph = self.graph;
        let Some((current_index, _, deps)) = graph.edges.get_full(current) else {
            return;
        };
        self.visited.insert(current.clone());
        self.on_stack.push(current.clone());

        for (edge_index, (dep, _)) in deps.iter().enumerate() {
            if let Some(start) = self.on_stack.iter().position(|n| n == dep) {
                let closing = (current_index, edge_index);
                let cycle: Vec<_> = self.path_edges[start..]
                    .iter()
                    .copied()
                    .chain(std::iter::once(closing))
                    .collect();
                for edge in cycle {
                    self.report(edge);
                }
            } else if !self.visited.contains(dep) {
                self.path_edges.push((current_index, edge_index));
                self.visit(dep);
                self.path_edges.pop();
            }
        }

        self.on_stack.pop();
    }

    fn report(&mut self, (node_index, edge_index): (usize, usize)) {
        if !self.reported.insert((node_index, edge_index)) {
            return;
        }
        let graph = self.graph;
        let edge = graph
            .edges
            .get_index(node_index)
            .and_then(|(from, deps)| deps.get(edge_index).map(|edge| (from, edge)));
        if let Some((from, (to, data))) = edge {
            self.found.push(CycleEdge {
                from: from.clone(),
                to: to.clone(),
                data: data.clone(),
            });
        }
    }
}
