//! Declared dependency wiring

use super::GraphTransformer;
use crate::error::Result;
use crate::graph::Graph;

/// Turns every declared dependency list into edges.
///
/// Orphans are wired by the pass that adds them; running them through
/// again is harmless because edges are idempotent.
pub struct DependencyTransformer;

impl GraphTransformer for DependencyTransformer {
    fn name(&self) -> &'static str {
        "dependency"
    }

    fn transform(&self, graph: &mut Graph) -> Result<()> {
        let pending: Vec<String> = graph
            .vertices()
            .filter(|v| !v.kind().is_orphan())
            .map(|v| v.name())
            .collect();

        let mut connected = 0;
        for name in &pending {
            connected += graph.connect_dependent(name)?;
        }
        log::debug!("Wired {connected} declared dependencies");
        Ok(())
    }
}
