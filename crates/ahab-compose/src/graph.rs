//! Service start-order graph using `petgraph`.
//!
//! Builds a directed acyclic graph from the services' `depends_on` edges
//! and yields the order in which the orchestrator will start them.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use ahab_common::error::{AhabError, Result};
use petgraph::graph::NodeIndex;

use crate::composer::service_dependencies;
use crate::resolver::ResolvedSet;

/// A dependency graph of services.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Builds the graph of every service-producing module in `resolved`.
    ///
    /// Nodes are added in resolved order, so the start order is stable
    /// across runs.
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedSet) -> Self {
        let mut graph = Self::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        let services: Vec<_> = resolved
            .modules()
            .iter()
            .filter(|m| m.role.produces_service())
            .collect();

        for module in &services {
            let _ = nodes.insert(&module.name, graph.add_service(&module.name));
        }
        for module in &services {
            for dep in service_dependencies(module, resolved) {
                if let (Some(&dependent), Some(&dependency)) =
                    (nodes.get(module.name.as_str()), nodes.get(dep.as_str()))
                {
                    graph.add_dependency(dependent, dependency);
                }
            }
        }
        graph
    }

    /// Adds a service node to the graph.
    pub fn add_service(&mut self, name: impl Into<String>) -> NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` starts after `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns the start order, dependencies first.
    ///
    /// A graph built with [`DependencyGraph::from_resolved`] is acyclic,
    /// since resolution already rejects cycles; only hand-built graphs can
    /// fail here.
    ///
    /// # Errors
    ///
    /// Returns [`AhabError::CyclicDependency`] with a cycle found in the
    /// graph, written in "depends on" order.
    pub fn start_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(AhabError::CyclicDependency {
                chain: self.cycle_through(self.on_cycle(cycle.node_id())),
                path: Vec::new(),
            }),
        }
    }

    /// Returns `hint` if it lies on a cycle, otherwise a node of the first
    /// cyclic strongly connected component.
    fn on_cycle(&self, hint: NodeIndex) -> NodeIndex {
        let cyclic: Vec<Vec<NodeIndex>> = petgraph::algo::kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.first().is_some_and(|&n| self.graph.contains_edge(n, n))
            })
            .collect();
        if cyclic.iter().any(|scc| scc.contains(&hint)) {
            return hint;
        }
        cyclic
            .first()
            .and_then(|scc| scc.first().copied())
            .unwrap_or(hint)
    }

    /// Walks dependents breadth-first from `start` until it is reached
    /// again, then reverses the walk so each name depends on the next.
    fn cycle_through(&self, start: NodeIndex) -> Vec<String> {
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut closing = None;

        'search: while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors(node) {
                if next == start {
                    closing = Some(node);
                    break 'search;
                }
                if let Entry::Vacant(slot) = parent.entry(next) {
                    let _ = slot.insert(node);
                    queue.push_back(next);
                }
            }
        }

        // Edges run dependency → dependent; collect them backwards, which
        // yields the dependent → dependency reading directly.
        let mut chain = vec![start];
        let mut current = closing;
        while let Some(node) = current {
            chain.push(node);
            current = if node == start { None } else { parent.get(&node).copied() };
        }
        if chain.last() != Some(&start) {
            chain.push(start);
        }

        chain
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::InMemorySource;
    use crate::pipeline::resolve_only;

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new();
        let order = graph.start_order().expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn linear_dependency_chain() {
        let mut graph = DependencyGraph::new();
        let php = graph.add_service("php");
        let mysql = graph.add_service("mysql");
        graph.add_dependency(php, mysql);

        let order = graph.start_order().expect("should resolve");
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("mysql") < pos("php"), "mysql should start before php: {order:?}");
    }

    #[test]
    fn diamond_dependency() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        let b = graph.add_service("b");
        let c = graph.add_service("c");
        let d = graph.add_service("d");
        graph.add_dependency(a, b);
        graph.add_dependency(a, c);
        graph.add_dependency(b, d);
        graph.add_dependency(c, d);

        let order = graph.start_order().expect("should resolve");
        assert_eq!(order.len(), 4);
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        let b = graph.add_service("b");
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);

        let err = graph.start_order().unwrap_err();
        assert!(err.to_string().contains("cyclic"), "got: {err}");
        match err {
            AhabError::CyclicDependency { chain, .. } => {
                assert_eq!(chain.len(), 3, "got: {chain:?}");
                assert_eq!(chain.first(), chain.last());
                assert_ne!(chain[0], chain[1], "got: {chain:?}");
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn cycle_chain_follows_depends_on_edges() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        let b = graph.add_service("b");
        let c = graph.add_service("c");
        let d = graph.add_service("d");
        graph.add_dependency(d, a);
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);
        graph.add_dependency(c, a);

        let AhabError::CyclicDependency { chain, .. } = graph.start_order().unwrap_err() else {
            panic!("expected cycle");
        };
        assert_eq!(chain.len(), 4, "got: {chain:?}");
        assert_eq!(chain.first(), chain.last());
        let next = |name: &str| {
            let i = chain.iter().position(|n| n == name).expect(name);
            chain[i + 1].clone()
        };
        assert_eq!(next("a"), "b");
        assert_eq!(next("b"), "c");
        assert!(!chain.iter().any(|n| n == "d"), "got: {chain:?}");
    }

    #[test]
    fn self_dependency_is_one_element_cycle() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        graph.add_dependency(a, a);

        let AhabError::CyclicDependency { chain, .. } = graph.start_order().unwrap_err() else {
            panic!("expected cycle");
        };
        assert_eq!(chain, vec!["a", "a"]);
    }

    #[test]
    fn built_from_resolved_set_skips_meta_modules() {
        let source = InMemorySource::new()
            .with("lamp", "name: lamp\nrole: meta\ndependencies: [php]\n")
            .with("php", "name: php\nimage: php\ndependencies: [mysql]\n")
            .with("mysql", "name: mysql\nimage: mysql\n");
        let resolved = resolve_only(&["lamp".to_string()], &source).expect("resolve");
        let order = DependencyGraph::from_resolved(&resolved)
            .start_order()
            .expect("order");
        assert_eq!(order, vec!["mysql", "php"]);
    }
}
