//! Evaluation context and collaborator traits
//!
//! These traits keep the core free of any concrete provider, progress UI or
//! signal handling. A run builds one [`EvalContext`] and hands it to every
//! vertex plan; nothing is kept in globals.

use crate::diff::Diff;
use crate::types::{Attributes, VertexOutcome};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Executes operations for one family of resource kinds
///
/// Implement this trait to bind resource kinds to a real system.
/// `kind` is the part of the resource name before the first `.`.
pub trait Provider: Send + Sync {
    /// Read the real-world attributes of an existing resource.
    ///
    /// Returns `None` if the resource no longer exists.
    fn refresh(&self, kind: &str, attributes: &Attributes) -> Result<Option<Attributes>>;

    /// Compute the change needed to reach `declared` from `current`.
    ///
    /// Default implementation compares declared attributes one by one.
    fn diff(
        &self,
        kind: &str,
        declared: &Attributes,
        current: Option<&Attributes>,
    ) -> Result<Diff> {
        let _ = kind;
        Ok(Diff::compute(declared, current))
    }

    /// Apply a diff, returning the resulting attributes.
    ///
    /// `current` is the refreshed state the diff was computed against.
    /// The returned attributes are ignored for destroy diffs.
    fn apply(&self, kind: &str, current: Option<&Attributes>, diff: &Diff) -> Result<Attributes>;
}

/// Per-run execution context shared by every vertex plan
#[derive(Clone, Default)]
pub struct EvalContext {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    fallback: Option<Arc<dyn Provider>>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under a name (builder style)
    pub fn with_provider(mut self, name: &str, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(name.to_string(), provider);
        self
    }

    /// Provider used for names that have no registered provider
    pub fn with_fallback(mut self, provider: Arc<dyn Provider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Look up the provider for a provider name
    pub fn provider(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(name)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No provider configured for '{}'", name))
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.fallback.is_some() || self.providers.contains_key(name)
    }

    /// Registered provider names
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("providers", &self.provider_names())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Progress callback for walk operations
///
/// Implement this trait to receive progress updates during a walk.
/// Callbacks are invoked from the scheduling thread only.
pub trait WalkObserver: Send {
    /// Called once before any vertex is dispatched
    fn on_walk_start(&mut self, total: usize);

    /// Called when a vertex is handed to a worker
    fn on_vertex_start(&mut self, name: &str);

    /// Called when a vertex reaches its final outcome, including blocked
    /// and cancelled vertices that never started
    fn on_vertex_complete(&mut self, name: &str, outcome: &VertexOutcome);

    /// Called once after the walk finished
    fn on_walk_complete(&mut self);
}

/// No-op walk observer
pub struct NoObserver;

impl WalkObserver for NoObserver {
    fn on_walk_start(&mut self, _total: usize) {}
    fn on_vertex_start(&mut self, _name: &str) {}
    fn on_vertex_complete(&mut self, _name: &str, _outcome: &VertexOutcome) {}
    fn on_walk_complete(&mut self) {}
}

/// Cancellation signal for a walk
///
/// Cloning shares the flag. Once cancelled, the walk stops dispatching new
/// vertices and lets the ones already running finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
