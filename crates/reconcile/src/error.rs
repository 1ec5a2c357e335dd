//! Error types for graph construction and walking.
//!
//! Errors fall into two groups. Structural and lookup errors abort graph
//! construction before anything is executed. Vertex errors are local to one
//! vertex; the walk collects them and reports them together as an
//! [`AggregateError`].

use crate::path::ModulePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced by the reconciliation core.
#[derive(Debug, Error)]
pub enum Error {
    /// A vertex with the same name is already in the graph
    #[error("duplicate vertex: {name}")]
    DuplicateVertex { name: String },

    /// An edge endpoint does not exist in the graph
    #[error("unknown vertex: {name}")]
    UnknownVertex { name: String },

    /// The graph contains a dependency cycle
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// A module required during orphan detection is missing from configuration
    #[error("configuration not found for module: {path}")]
    ConfigurationNotFound { path: ModulePath },

    /// A module node was removed from state while it still held resources
    #[error("module {path} still has {resources} resource(s) in state")]
    ModuleNotEmpty { path: ModulePath, resources: usize },

    /// The worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    ThreadPool(String),

    /// One or more vertices failed during the walk
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl Error {
    /// Whether this error was raised while building the graph.
    ///
    /// Structural errors are fatal and surface before any vertex runs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateVertex { .. } | Self::UnknownVertex { .. } | Self::Cycle { .. }
        )
    }

    /// Whether this error came from a configuration lookup.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::ConfigurationNotFound { .. })
    }
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// The execution step a vertex error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Refresh,
    Diff,
    Apply,
    Commit,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Refresh => "refresh",
            Self::Diff => "diff",
            Self::Apply => "apply",
            Self::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// A failure local to a single vertex.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{vertex}: {step} failed: {message}")]
pub struct VertexError {
    /// Name of the vertex that failed
    pub vertex: String,
    /// Step the failure happened in
    pub step: StepKind,
    /// Rendered error message, including its cause chain
    pub message: String,
}

impl VertexError {
    pub fn new(vertex: impl Into<String>, step: StepKind, message: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            step,
            message: message.into(),
        }
    }

    /// Build from a collaborator error, keeping the whole context chain.
    pub fn from_anyhow(vertex: impl Into<String>, step: StepKind, err: &anyhow::Error) -> Self {
        Self::new(vertex, step, format!("{err:#}"))
    }
}

/// Every vertex failure of a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateError {
    pub errors: Vec<VertexError>,
}

impl AggregateError {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Find the error reported for a vertex, if any
    pub fn for_vertex(&self, vertex: &str) -> Option<&VertexError> {
        self.errors.iter().find(|e| e.vertex == vertex)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vertex error(s) occurred:", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n  * {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let dup = Error::DuplicateVertex { name: "a".into() };
        assert!(dup.is_structural());
        assert!(!dup.is_lookup());

        let lookup = Error::ConfigurationNotFound {
            path: ModulePath::root().child("network"),
        };
        assert!(lookup.is_lookup());
        assert!(!lookup.is_structural());

        let agg = Error::from(AggregateError::default());
        assert!(!agg.is_structural());
    }

    #[test]
    fn test_cycle_message_shows_path() {
        let err = Error::Cycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn test_aggregate_lists_every_vertex() {
        let agg = AggregateError {
            errors: vec![
                VertexError::new("aws_instance.web", StepKind::Apply, "quota exceeded"),
                VertexError::new("aws_eip.ip", StepKind::Refresh, "timeout"),
            ],
        };
        let msg = agg.to_string();
        assert!(msg.starts_with("2 vertex error(s)"));
        assert!(msg.contains("aws_instance.web: apply failed: quota exceeded"));
        assert!(msg.contains("aws_eip.ip: refresh failed: timeout"));
        assert_eq!(
            agg.for_vertex("aws_eip.ip").map(|e| e.step),
            Some(StepKind::Refresh)
        );
    }
}
