//! Graph transformers
//!
//! A transformer is one pass over the graph under construction. Passes are
//! run in a fixed order by [`crate::planner::GraphBuilder`]; each one only
//! sees the graph the previous passes left behind.

mod config;
mod dependency;
mod module;
mod orphan;
mod targets;

pub use config::ConfigTransformer;
pub use dependency::DependencyTransformer;
pub use module::ModuleTransformer;
pub use orphan::OrphanTransformer;
pub use targets::TargetsTransformer;

use crate::error::Result;
use crate::graph::Graph;

/// One pass of the graph construction pipeline
pub trait GraphTransformer {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    fn transform(&self, graph: &mut Graph) -> Result<()>;
}
