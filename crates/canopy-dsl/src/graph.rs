//! # Dependency Graph
//!
//! Small directed graph used twice by the compiler: once over element
//! handles to order the evaluation passes, and once over type names to
//! reject default-bearing reference cycles. Ordering is deterministic —
//! ties break by node insertion order, which follows document order.

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use std::hash::Hash;

/// Directed dependency graph. An edge `from -> to` means `from` depends on
/// `to`, so `to` sorts earlier.
#[derive(Debug, Default)]
pub struct DependencyGraph<K> {
    nodes: IndexSet<K>,
    dependencies: IndexMap<K, IndexSet<K>>,
}

impl<K: Clone + Eq + Hash> DependencyGraph<K> {
    /// Empty graph.
    pub fn new() -> Self {
        Self {
            nodes: IndexSet::new(),
            dependencies: IndexMap::new(),
        }
    }

    /// Register a node. Idempotent.
    pub fn add_node(&mut self, node: K) {
        self.nodes.insert(node);
    }

    /// Record that `from` depends on `to`. Both endpoints are registered.
    pub fn add_edge(&mut self, from: K, to: K) {
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());
        self.dependencies.entry(from).or_default().insert(to);
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dependencies-first order over all nodes.
    ///
    /// # Errors
    ///
    /// When the graph is cyclic, returns one offending cycle as an ordered
    /// walk with the starting node repeated at the end (`[a, b, a]`).
    pub fn topo_order(&self) -> Result<Vec<K>, Vec<K>> {
        let mut unresolved: IndexMap<&K, usize> = self
            .nodes
            .iter()
            .map(|node| {
                let count = self
                    .dependencies
                    .get(node)
                    .map_or(0, |deps| deps.iter().filter(|d| self.nodes.contains(*d)).count());
                (node, count)
            })
            .collect();
        let mut dependents: IndexMap<&K, Vec<&K>> = IndexMap::new();
        for (from, deps) in &self.dependencies {
            for to in deps {
                if self.nodes.contains(to) {
                    dependents.entry(to).or_default().push(from);
                }
            }
        }

        let mut ready: VecDeque<&K> = unresolved
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop_front() {
            order.push(node.clone());
            unresolved.swap_remove(node);
            if let Some(waiting) = dependents.get(node) {
                for dependent in waiting {
                    if let Some(count) = unresolved.get_mut(*dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push_back(dependent);
                        }
                    }
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            Err(self.extract_cycle(&unresolved))
        }
    }

    /// Walk dependency edges among unresolved nodes until one repeats.
    fn extract_cycle(&self, unresolved: &IndexMap<&K, usize>) -> Vec<K> {
        let mut walk: Vec<&K> = Vec::new();
        // Any unresolved node leads into a cycle; edges out of the cyclic
        // region were already consumed.
        let Some((start, _)) = unresolved.first() else {
            return Vec::new();
        };
        let mut current = *start;
        loop {
            if let Some(position) = walk.iter().position(|seen| *seen == current) {
                let mut cycle: Vec<K> =
                    walk[position..].iter().map(|node| (*node).clone()).collect();
                cycle.push(current.clone());
                return cycle;
            }
            walk.push(current);
            let next = self.dependencies.get(current).and_then(|deps| {
                deps.iter().find(|dep| unresolved.contains_key(*dep))
            });
            match next {
                Some(next) => current = next,
                // Every unresolved node keeps at least one unresolved
                // dependency, so the walk cannot dead-end.
                None => return walk.into_iter().cloned().collect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_dependencies_first() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("plan", "types");
        graph.add_edge("types", "schema");
        graph.add_node("standalone");
        let order = graph.topo_order().unwrap();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(position("schema") < position("types"));
        assert!(position("types") < position("plan"));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut graph = DependencyGraph::new();
        graph.add_node("z");
        graph.add_node("a");
        graph.add_node("m");
        assert_eq!(graph.topo_order().unwrap(), ["z", "a", "m"]);
    }

    #[test]
    fn test_cycle_reports_ordered_walk() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        graph.add_edge("c", "a");
        let cycle = graph.topo_order().unwrap_err();
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.first(), cycle.last());
        // Consecutive entries are real dependency edges.
        for pair in cycle.windows(2) {
            assert!(graph.dependencies[&pair[0]].contains(&pair[1]));
        }
    }

    #[test]
    fn test_self_edge_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "a");
        assert_eq!(graph.topo_order().unwrap_err(), ["a", "a"]);
    }

    #[test]
    fn test_nodes_outside_cycle_still_emitted() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("ok", "also_ok");
        graph.add_edge("x", "y");
        graph.add_edge("y", "x");
        let cycle = graph.topo_order().unwrap_err();
        assert!(cycle.contains(&"x") && cycle.contains(&"y"));
        assert!(!cycle.contains(&"ok"));
    }
}
