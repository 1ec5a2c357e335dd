//! Graph construction pipeline

use crate::config::ConfigTree;
use crate::error::Result;
use crate::graph::Graph;
use crate::state::State;
use crate::transform::{
    ConfigTransformer, DependencyTransformer, GraphTransformer, ModuleTransformer,
    OrphanTransformer, TargetsTransformer,
};

/// Builds the validated dependency graph for a configuration and state.
///
/// Passes run in a fixed order: declared vertices, orphans, declared
/// dependencies, module membership, then target filtering. The result is
/// checked for cycles before it is returned.
pub struct GraphBuilder<'a> {
    config: &'a dyn ConfigTree,
    state: &'a State,
    targets: Vec<String>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a dyn ConfigTree, state: &'a State) -> Self {
        Self {
            config,
            state,
            targets: Vec::new(),
        }
    }

    /// Only build the graph needed for these targets (builder style)
    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    /// The transformer sequence this builder runs
    pub fn transformers(&self) -> Vec<Box<dyn GraphTransformer + 'a>> {
        vec![
            Box::new(ConfigTransformer::new(self.config)),
            Box::new(OrphanTransformer::new(self.config, self.state)),
            Box::new(DependencyTransformer),
            Box::new(ModuleTransformer::new(self.config)),
            Box::new(TargetsTransformer::new(self.targets.clone())),
        ]
    }

    pub fn build(&self) -> Result<Graph> {
        let mut graph = Graph::new();
        for transformer in self.transformers() {
            transformer.transform(&mut graph)?;
            log::debug!(
                "After {} pass: {} vertices, {} edges",
                transformer.name(),
                graph.len(),
                graph.edge_count()
            );
        }
        graph.validate()?;
        Ok(graph)
    }
}
