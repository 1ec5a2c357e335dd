//! Dependency graph
//!
//! Vertices are stored in a petgraph stable graph so that transformers can
//! remove vertices without invalidating the indices of the others. An edge
//! `from -> to` means `from` waits for `to`.

use crate::error::{Error, Result};
use crate::path::ModulePath;
use crate::vertex::{BoxedVertex, Vertex};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::{BTreeMap, HashMap};

/// Directed graph of vertices, keyed by vertex name
#[derive(Debug, Default)]
pub struct Graph {
    graph: StableDiGraph<BoxedVertex, ()>,
    /// Vertex name to node
    by_name: BTreeMap<String, NodeIndex>,
    /// Dependable name to node
    by_dependable: HashMap<String, NodeIndex>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vertex.
    ///
    /// Fails if another vertex already uses its name or dependable name.
    pub fn add_vertex(&mut self, vertex: BoxedVertex) -> Result<()> {
        let name = vertex.name();
        let dependable = vertex.dependable_name();
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateVertex { name });
        }
        if self.by_dependable.contains_key(&dependable) {
            return Err(Error::DuplicateVertex { name: dependable });
        }

        let idx = self.graph.add_node(vertex);
        log::trace!("Added vertex {name}");
        self.by_name.insert(name, idx);
        self.by_dependable.insert(dependable, idx);
        Ok(())
    }

    /// Remove a vertex and every edge touching it
    pub fn remove_vertex(&mut self, name: &str) -> Option<BoxedVertex> {
        let idx = self.by_name.remove(name)?;
        let vertex = self.graph.remove_node(idx)?;
        self.by_dependable.remove(&vertex.dependable_name());
        Some(vertex)
    }

    /// Add an edge meaning `from` waits for `to`. Adding an existing edge is a no-op.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
        Ok(())
    }

    /// Resolve a dependency reference written in `scope` to a vertex name
    pub fn resolve(&self, scope: &ModulePath, reference: &str) -> Option<String> {
        let qualified = scope.qualify(reference);
        self.by_dependable
            .get(&qualified)
            .and_then(|&idx| self.graph.node_weight(idx))
            .map(|v| v.name())
    }

    /// Wire a vertex to every declared dependency that exists in the graph.
    ///
    /// References that do not resolve are skipped: the vertex they named may
    /// have been left out by an earlier pass. Returns the number of
    /// references that resolved.
    pub fn connect_dependent(&mut self, name: &str) -> Result<usize> {
        let idx = self.index_of(name)?;
        let (scope, references) = match self.graph.node_weight(idx) {
            Some(vertex) => (vertex.path().clone(), vertex.depends_on().to_vec()),
            None => return Err(Error::UnknownVertex { name: name.to_string() }),
        };

        let mut connected = 0;
        for reference in &references {
            match self.resolve(&scope, reference) {
                Some(target) if target != name => {
                    self.add_edge(name, &target)?;
                    connected += 1;
                }
                Some(_) => log::debug!("{name}: ignoring reference to itself"),
                None => log::debug!("{name}: dependency {reference} not in graph, skipping"),
            }
        }
        Ok(connected)
    }

    /// Check the graph for dependency cycles.
    ///
    /// The error carries the cycle path with its first vertex repeated at
    /// the end.
    pub fn validate(&self) -> Result<()> {
        let mut marks: HashMap<NodeIndex, Mark> = HashMap::with_capacity(self.len());
        for &start in self.by_name.values() {
            if !marks.contains_key(&start) {
                self.visit(start, &mut marks)?;
            }
        }
        Ok(())
    }

    /// Depth-first search from `start` on an explicit stack.
    ///
    /// Each stack entry holds a node and its neighbors still to visit, in
    /// reverse name order so that `pop` yields them sorted.
    fn visit(&self, start: NodeIndex, marks: &mut HashMap<NodeIndex, Mark>) -> Result<()> {
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
        marks.insert(start, Mark::InProgress);
        stack.push((start, self.pending_neighbors(start)));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let Some(next) = top.1.pop() else {
                stack.pop();
                marks.insert(node, Mark::Done);
                continue;
            };

            match marks.get(&next) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let first = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[first..].iter().map(|&(n, _)| self.name_of(n)).collect();
                    path.push(self.name_of(next));
                    return Err(Error::Cycle { path });
                }
                None => {
                    marks.insert(next, Mark::InProgress);
                    stack.push((next, self.pending_neighbors(next)));
                }
            }
        }
        Ok(())
    }

    fn pending_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors = self.sorted_neighbors(idx, Direction::Outgoing);
        neighbors.reverse();
        neighbors
    }

    /// Names of the vertices `name` waits for, sorted
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.neighbor_names(name, Direction::Outgoing)
    }

    /// Names of the vertices waiting for `name`, sorted
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.neighbor_names(name, Direction::Incoming)
    }

    pub fn vertex(&self, name: &str) -> Option<&dyn Vertex> {
        self.by_name
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
            .map(|v| &**v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Every vertex name, sorted
    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Every vertex, sorted by name
    pub fn vertices(&self) -> impl Iterator<Item = &dyn Vertex> {
        self.by_name
            .values()
            .filter_map(|&idx| self.graph.node_weight(idx))
            .map(|v| &**v)
    }

    /// Every edge as `(from, to)`, sorted
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(from, to)| (self.name_of(from), self.name_of(to)))
            .collect();
        edges.sort();
        edges
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // Index-level access for the walker

    pub(crate) fn node_indices(&self) -> Vec<NodeIndex> {
        self.by_name.values().copied().collect()
    }

    pub(crate) fn node(&self, idx: NodeIndex) -> Option<&dyn Vertex> {
        self.graph.node_weight(idx).map(|v| &**v)
    }

    pub(crate) fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort_by_key(|&n| self.name_of(n));
        neighbors.dedup();
        neighbors
    }

    pub(crate) fn name_of(&self, idx: NodeIndex) -> String {
        self.graph
            .node_weight(idx)
            .map_or_else(|| format!("#{}", idx.index()), |v| v.name())
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownVertex { name: name.to_string() })
    }

    fn neighbor_names(&self, name: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.by_name.get(name) else {
            return Vec::new();
        };
        self.sorted_neighbors(idx, direction)
            .into_iter()
            .map(|n| self.name_of(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attributes;
    use crate::vertex::{ModuleVertex, OrphanResourceVertex, ResourceVertex};

    fn resource(name: &str, deps: &[&str]) -> BoxedVertex {
        Box::new(ResourceVertex::new(
            ModulePath::root(),
            name,
            Attributes::new(),
            deps.iter().map(ToString::to_string).collect(),
        ))
    }

    #[test]
    fn test_add_vertex_rejects_duplicates() {
        let mut graph = Graph::new();
        graph.add_vertex(resource("a", &[])).unwrap();
        let err = graph.add_vertex(resource("a", &[])).unwrap_err();
        assert!(matches!(err, Error::DuplicateVertex { name } if name == "a"));

        // An orphan of a declared resource collides on its dependable name
        let orphan = OrphanResourceVertex::new(ModulePath::root(), "a", vec![]);
        assert!(graph.add_vertex(Box::new(orphan)).is_err());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_add_edge_is_idempotent() {
        let mut graph = Graph::new();
        graph.add_vertex(resource("a", &[])).unwrap();
        graph.add_vertex(resource("b", &[])).unwrap();

        graph.add_edge("b", "a").unwrap();
        graph.add_edge("b", "a").unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependencies_of("b"), vec!["a"]);
        assert_eq!(graph.dependents_of("a"), vec!["b"]);

        let err = graph.add_edge("b", "missing").unwrap_err();
        assert!(matches!(err, Error::UnknownVertex { name } if name == "missing"));
    }

    #[test]
    fn test_connect_dependent_skips_unresolved() {
        let mut graph = Graph::new();
        graph.add_vertex(resource("a", &[])).unwrap();
        graph.add_vertex(resource("b", &["a", "gone"])).unwrap();

        assert_eq!(graph.connect_dependent("b").unwrap(), 1);
        assert_eq!(graph.edges(), vec![("b".to_string(), "a".to_string())]);
        assert!(graph.connect_dependent("nope").is_err());
    }

    #[test]
    fn test_connect_dependent_qualifies_in_scope() {
        let net = ModulePath::root().child("network");
        let mut graph = Graph::new();
        graph
            .add_vertex(Box::new(ResourceVertex::new(
                net.clone(),
                "vpc",
                Attributes::new(),
                vec![],
            )))
            .unwrap();
        graph
            .add_vertex(Box::new(ResourceVertex::new(
                net,
                "subnet",
                Attributes::new(),
                vec!["vpc".into()],
            )))
            .unwrap();
        // Same short name in the root module must not be picked
        graph.add_vertex(resource("vpc", &[])).unwrap();

        graph.connect_dependent("module.network.subnet").unwrap();
        assert_eq!(
            graph.dependencies_of("module.network.subnet"),
            vec!["module.network.vpc"]
        );
    }

    #[test]
    fn test_orphan_resolves_by_dependable_name() {
        let mut graph = Graph::new();
        graph
            .add_vertex(Box::new(OrphanResourceVertex::new(ModulePath::root(), "a", vec![])))
            .unwrap();
        graph.add_vertex(resource("b", &["a"])).unwrap();

        graph.connect_dependent("b").unwrap();
        assert_eq!(graph.dependencies_of("b"), vec!["a (orphan)"]);
    }

    #[test]
    fn test_validate_reports_cycle_path() {
        let mut graph = Graph::new();
        graph.add_vertex(resource("a", &["c"])).unwrap();
        graph.add_vertex(resource("b", &["a"])).unwrap();
        graph.add_vertex(resource("c", &["b"])).unwrap();
        graph.add_vertex(resource("d", &[])).unwrap();
        for name in graph.names() {
            graph.connect_dependent(&name).unwrap();
        }

        let Err(Error::Cycle { path }) = graph.validate() else {
            panic!("expected a cycle");
        };
        assert_eq!(path, vec!["a", "c", "b", "a"]);
    }

    #[test]
    fn test_validate_accepts_dag() {
        let mut graph = Graph::new();
        graph.add_vertex(resource("a", &[])).unwrap();
        graph.add_vertex(resource("b", &["a"])).unwrap();
        graph.add_vertex(resource("c", &["a", "b"])).unwrap();
        for name in graph.names() {
            graph.connect_dependent(&name).unwrap();
        }
        assert!(graph.validate().is_ok());
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_remove_vertex_drops_edges() {
        let mut graph = Graph::new();
        graph.add_vertex(resource("a", &[])).unwrap();
        graph.add_vertex(resource("b", &["a"])).unwrap();
        graph
            .add_vertex(Box::new(
                ModuleVertex::new(ModulePath::root().child("net"), vec![]).unwrap(),
            ))
            .unwrap();
        graph.connect_dependent("b").unwrap();

        let removed = graph.remove_vertex("a").unwrap();
        assert_eq!(removed.name(), "a");
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains("a"));
        assert_eq!(graph.names(), vec!["b", "module.net"]);

        // The name is free again
        graph.add_vertex(resource("a", &[])).unwrap();
        assert_eq!(graph.connect_dependent("b").unwrap(), 1);
    }
}
