//! Module membership edges

use super::GraphTransformer;
use crate::config::ConfigTree;
use crate::error::Result;
use crate::graph::Graph;

/// Ties every vertex inside a module to that module's vertex.
///
/// The module vertex waits for every vertex declared or orphaned at or
/// below it, so it completes only once the whole module has. Module-level
/// dependencies are pushed down to the members: each member also waits for
/// whatever the module depends on.
pub struct ModuleTransformer<'a> {
    config: &'a dyn ConfigTree,
}

impl<'a> ModuleTransformer<'a> {
    pub fn new(config: &'a dyn ConfigTree) -> Self {
        Self { config }
    }
}

impl GraphTransformer for ModuleTransformer<'_> {
    fn name(&self) -> &'static str {
        "module"
    }

    fn transform(&self, graph: &mut Graph) -> Result<()> {
        for path in self.config.module_paths() {
            let Some(scope) = path.parent() else {
                continue;
            };
            let module = path.module_address();
            if !graph.contains(&module) {
                continue;
            }

            let members: Vec<String> = graph
                .vertices()
                .filter(|v| v.path().starts_with(&path))
                .map(|v| v.name())
                .collect();
            let dependencies: Vec<String> = self
                .config
                .module_dependencies(&path)
                .iter()
                .filter_map(|reference| graph.resolve(&scope, reference))
                .collect();

            for member in &members {
                graph.add_edge(&module, member)?;
                for dependency in &dependencies {
                    graph.add_edge(member, dependency)?;
                }
            }
        }
        Ok(())
    }
}
