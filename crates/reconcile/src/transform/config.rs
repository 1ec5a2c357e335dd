//! Declared vertices

use super::GraphTransformer;
use crate::config::ConfigTree;
use crate::error::Result;
use crate::graph::Graph;
use crate::vertex::{ModuleVertex, ResourceVertex};

/// Adds a vertex for every declared resource and every nested module
pub struct ConfigTransformer<'a> {
    config: &'a dyn ConfigTree,
}

impl<'a> ConfigTransformer<'a> {
    pub fn new(config: &'a dyn ConfigTree) -> Self {
        Self { config }
    }
}

impl GraphTransformer for ConfigTransformer<'_> {
    fn name(&self) -> &'static str {
        "config"
    }

    fn transform(&self, graph: &mut Graph) -> Result<()> {
        for path in self.config.module_paths() {
            let module_deps = self.config.module_dependencies(&path);
            if let Some(module) = ModuleVertex::new(path.clone(), module_deps) {
                graph.add_vertex(Box::new(module))?;
            }

            for name in self.config.declared_resources(&path) {
                let declared = self
                    .config
                    .declared_attributes(&path, &name)
                    .unwrap_or_default();
                let depends_on = self.config.dependencies_of(&path, &name);
                let vertex = ResourceVertex::new(path.clone(), &name, declared, depends_on);
                graph.add_vertex(Box::new(vertex))?;
            }
        }
        Ok(())
    }
}
