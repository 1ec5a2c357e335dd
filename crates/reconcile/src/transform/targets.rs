//! Target filtering

use super::GraphTransformer;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::vertex::Vertex;
use std::collections::BTreeSet;

/// Restricts the graph to the targeted vertices and everything they depend on.
///
/// A target is a vertex address (`aws_instance.web`,
/// `module.network.aws_subnet.a`) or a module address, which selects every
/// vertex inside the module. With no targets the pass does nothing.
pub struct TargetsTransformer {
    targets: Vec<String>,
}

impl TargetsTransformer {
    pub fn new(targets: Vec<String>) -> Self {
        Self { targets }
    }
}

impl GraphTransformer for TargetsTransformer {
    fn name(&self) -> &'static str {
        "targets"
    }

    fn transform(&self, graph: &mut Graph) -> Result<()> {
        if self.targets.is_empty() {
            return Ok(());
        }

        let mut keep = BTreeSet::new();
        for target in &self.targets {
            let matched: Vec<String> = graph
                .vertices()
                .filter(|v| matches_target(*v, target))
                .map(|v| v.name())
                .collect();
            if matched.is_empty() {
                return Err(Error::UnknownVertex { name: target.clone() });
            }
            keep.extend(matched);
        }

        // Everything a kept vertex waits for must run too
        let mut pending: Vec<String> = keep.iter().cloned().collect();
        while let Some(name) = pending.pop() {
            for dependency in graph.dependencies_of(&name) {
                if keep.insert(dependency.clone()) {
                    pending.push(dependency);
                }
            }
        }

        let removed: Vec<String> = graph
            .names()
            .into_iter()
            .filter(|name| !keep.contains(name))
            .collect();
        for name in &removed {
            graph.remove_vertex(name);
        }
        log::debug!("Targeting kept {} vertices, removed {}", keep.len(), removed.len());
        Ok(())
    }
}

fn matches_target(vertex: &dyn Vertex, target: &str) -> bool {
    let address = vertex.dependable_name();
    vertex.name() == target
        || address == target
        || address
            .strip_prefix(target)
            .is_some_and(|rest| target.starts_with("module.") && rest.starts_with('.'))
}
