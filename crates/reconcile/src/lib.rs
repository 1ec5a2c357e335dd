//! # Reconcile
//!
//! Reconciles a declared configuration tree against recorded state.
//!
//! A run builds a dependency graph from configuration, adds a vertex for
//! everything state still holds but configuration no longer declares
//! (orphans), then walks the graph: every vertex is refreshed, diffed,
//! applied and committed back into state once everything it depends on
//! has finished.
//!
//! ## Core Concepts
//!
//! - **Vertex**: one unit of work, a resource or a nested module
//! - **Graph transformer**: a pass that adds vertices or edges to the graph
//!   under construction
//! - **Execution plan**: the Refresh/Diff/Apply/CommitState steps of a
//!   vertex, driven as a state machine
//! - **Walk**: concurrent execution of every plan in dependency order
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{
//!     Attributes, Diff, EvalContext, ExecuteOptions, ModuleConfig, Provider,
//!     ResourceConfig, State, reconcile,
//! };
//! use std::sync::Arc;
//!
//! struct Memory;
//!
//! impl Provider for Memory {
//!     fn refresh(&self, _kind: &str, attrs: &Attributes) -> anyhow::Result<Option<Attributes>> {
//!         Ok(Some(attrs.clone()))
//!     }
//!
//!     fn apply(
//!         &self,
//!         _kind: &str,
//!         current: Option<&Attributes>,
//!         diff: &Diff,
//!     ) -> anyhow::Result<Attributes> {
//!         Ok(diff.apply_to(current))
//!     }
//! }
//!
//! let config = ModuleConfig::new()
//!     .with_resource("local_file.a", ResourceConfig::default())
//!     .with_resource("local_file.b", ResourceConfig::default().depends_on(["local_file.a"]));
//! let state = State::new();
//! let ctx = EvalContext::new().with_provider("local", Arc::new(Memory));
//!
//! let report = reconcile(&config, &state, &ctx, &ExecuteOptions::default())?;
//! assert_eq!(report.summary.created, 2);
//! ```
//!
//! ## Collaborator Traits
//!
//! The crate never talks to a real system itself:
//!
//! - [`ConfigTree`]: read-only view of the declared configuration
//! - [`Provider`]: refreshes, diffs and applies resources of one provider
//! - [`WalkObserver`]: receives progress updates during a walk
//!
//! All of them are passed in explicitly through [`EvalContext`] or as
//! arguments, so a run has no global state.

pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod eval;
pub mod executor;
pub mod graph;
pub mod path;
pub mod planner;
pub mod state;
pub mod transform;
pub mod types;
pub mod vertex;

// Re-export main types at crate root
pub use config::{ConfigTree, ModuleConfig, ResourceConfig};
pub use context::{CancelToken, EvalContext, NoObserver, Provider, WalkObserver};
pub use diff::{Action, AttributeDiff, Diff, DiffSummary, ResourceChange};
pub use error::{AggregateError, Error, Result, StepKind, VertexError};
pub use eval::{EvalTarget, ExecutionPlan, Step, VertexState};
pub use executor::{WalkReport, walk, walk_simple};
pub use graph::Graph;
pub use path::{ModulePath, ROOT_MODULE, provider_name, resource_kind};
pub use planner::GraphBuilder;
pub use state::{ModuleState, State, StateSnapshot};
pub use transform::GraphTransformer;
pub use types::{
    Attributes, ExecuteOptions, ExecuteSummary, Operation, ResourceState, VertexOutcome,
};
pub use vertex::{BoxedVertex, Evaluable, Providable, Vertex, VertexKind};

/// Build the graph for `config` and `state`, walk it, and prune empty modules.
///
/// Fails with a structural or lookup error before anything runs, or with
/// [`Error::Aggregate`] if any vertex failed. State keeps every change that
/// did succeed either way.
pub fn reconcile(
    config: &dyn ConfigTree,
    state: &State,
    ctx: &EvalContext,
    opts: &ExecuteOptions,
) -> Result<WalkReport> {
    let graph = GraphBuilder::new(config, state).build()?;
    let report = walk_simple(&graph, state, ctx, opts)?;
    if opts.operation == Operation::Apply {
        state.prune();
    }
    report.into_result()
}
