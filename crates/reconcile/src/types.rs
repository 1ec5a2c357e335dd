//! Core types for reconciliation

use crate::diff::{Action, ResourceChange};
use crate::error::VertexError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat attribute map of a resource
pub type Attributes = BTreeMap<String, String>;

/// What state records about one resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Attributes as of the last successful apply or refresh
    #[serde(default)]
    pub attributes: Attributes,
    /// Dependency names (relative to the module) at the time of the apply
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ResourceState {
    pub fn new(attributes: Attributes, dependencies: Vec<String>) -> Self {
        Self {
            attributes,
            dependencies,
        }
    }
}

/// Whether a walk only computes changes or also applies them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Refresh and diff, never mutate anything
    Plan,
    /// Refresh, diff, apply and commit
    #[default]
    Apply,
}

/// Final status of a vertex after a walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexOutcome {
    /// Changes were applied and committed
    Applied { changes: Vec<ResourceChange> },
    /// Changes were computed but not applied (plan mode)
    Planned { changes: Vec<ResourceChange> },
    /// Nothing to do
    Skipped,
    /// The vertex failed
    Failed { error: VertexError },
    /// Never started because a dependency failed
    Blocked { by: String },
    /// Never started because the walk was cancelled
    Cancelled,
}

impl VertexOutcome {
    /// Check if the outcome represents success (no failure of its own)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Whether this vertex reached a terminal state of its own
    pub fn was_executed(&self) -> bool {
        matches!(
            self,
            Self::Applied { .. } | Self::Planned { .. } | Self::Skipped | Self::Failed { .. }
        )
    }

    /// Changes carried by this outcome
    pub fn changes(&self) -> &[ResourceChange] {
        match self {
            Self::Applied { changes } | Self::Planned { changes } => changes,
            _ => &[],
        }
    }

    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Planned { .. } => "planned",
            Self::Skipped => "skipped",
            Self::Failed { .. } => "failed",
            Self::Blocked { .. } => "blocked",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Summary of walk results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub blocked: usize,
    pub cancelled: usize,
    /// Number of changes computed in plan mode
    pub planned: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if the walk was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.blocked += other.blocked;
        self.cancelled += other.cancelled;
        self.planned += other.planned;
    }

    /// Add a vertex outcome to the summary
    pub fn add_outcome(&mut self, outcome: &VertexOutcome) {
        match outcome {
            VertexOutcome::Applied { changes } => {
                for change in changes {
                    match change.action() {
                        Action::Create => self.created += 1,
                        Action::Update => self.modified += 1,
                        Action::Destroy => self.removed += 1,
                        Action::NoOp => {}
                    }
                }
            }
            VertexOutcome::Planned { changes } => self.planned += changes.len(),
            VertexOutcome::Skipped => self.skipped += 1,
            VertexOutcome::Failed { .. } => self.failed += 1,
            VertexOutcome::Blocked { .. } => self.blocked += 1,
            VertexOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

/// Options for a walk
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Plan only, or apply
    pub operation: Operation,
    /// Maximum number of vertices executing at once
    pub jobs: usize,
}

impl ExecuteOptions {
    pub fn plan() -> Self {
        Self {
            operation: Operation::Plan,
            ..Self::default()
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            operation: Operation::Apply,
            jobs: 4,
        }
    }
}
