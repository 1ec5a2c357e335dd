//! Orphan detection
//!
//! Adds a vertex for everything recorded in state that configuration no
//! longer declares, so that the walk destroys it.

use super::GraphTransformer;
use crate::config::ConfigTree;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::path::ModulePath;
use crate::state::State;
use crate::vertex::{OrphanModuleVertex, OrphanResourceVertex, Vertex};

/// Adds resource and module orphans for every declared module path
pub struct OrphanTransformer<'a> {
    config: &'a dyn ConfigTree,
    state: &'a State,
}

impl<'a> OrphanTransformer<'a> {
    pub fn new(config: &'a dyn ConfigTree, state: &'a State) -> Self {
        Self { config, state }
    }

    /// Add the orphans of a single module path.
    ///
    /// Returns the number of orphan vertices added. Vertices are wired only
    /// after the whole batch is in the graph so that an orphan depending on
    /// another orphan of the same pass resolves.
    pub fn transform_path(&self, graph: &mut Graph, path: &ModulePath) -> Result<usize> {
        if self.state.subtree_paths(path).is_empty() {
            return Ok(0);
        }
        if !self.config.contains_module(path) {
            return Err(Error::ConfigurationNotFound { path: path.clone() });
        }

        let mut resources = Vec::new();
        for name in self.state.orphans(path, self.config) {
            let dependencies = self
                .state
                .resource(path, &name)
                .map(|r| r.dependencies)
                .unwrap_or_default();
            let vertex = OrphanResourceVertex::new(path.clone(), &name, dependencies);
            resources.push(vertex.name());
            graph.add_vertex(Box::new(vertex))?;
        }

        let mut modules = Vec::new();
        for module in self.state.module_orphans(path, self.config) {
            let dependencies = self
                .state
                .module_state(&module)
                .map(|m| m.dependencies)
                .unwrap_or_default();
            if let Some(vertex) = OrphanModuleVertex::new(module, dependencies) {
                modules.push(vertex.name());
                graph.add_vertex(Box::new(vertex))?;
            }
        }

        for name in &resources {
            graph.connect_dependent(name)?;
        }
        for name in &modules {
            graph.connect_dependent(name)?;
        }

        if !resources.is_empty() || !modules.is_empty() {
            log::debug!(
                "{path}: {} orphan resource(s), {} orphan module(s)",
                resources.len(),
                modules.len()
            );
        }
        Ok(resources.len() + modules.len())
    }
}

impl GraphTransformer for OrphanTransformer<'_> {
    fn name(&self) -> &'static str {
        "orphan"
    }

    fn transform(&self, graph: &mut Graph) -> Result<()> {
        for path in self.config.module_paths() {
            self.transform_path(graph, &path)?;
        }
        Ok(())
    }
}
