//! Graph walker - runs every vertex plan in dependency order with bounded parallelism

use crate::context::{CancelToken, EvalContext, NoObserver, WalkObserver};
use crate::diff::ResourceChange;
use crate::error::{AggregateError, Error, Result, StepKind, VertexError};
use crate::graph::Graph;
use crate::state::State;
use crate::types::{ExecuteOptions, ExecuteSummary, Operation, VertexOutcome};
use crate::vertex::Vertex;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;

/// Result of a walk: the outcome of every vertex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    /// Vertex name to outcome, for every vertex of the graph
    pub outcomes: BTreeMap<String, VertexOutcome>,
    pub summary: ExecuteSummary,
}

impl WalkReport {
    pub fn outcome(&self, name: &str) -> Option<&VertexOutcome> {
        self.outcomes.get(name)
    }

    /// Every vertex failure, sorted by vertex name
    pub fn errors(&self) -> Vec<VertexError> {
        self.outcomes
            .values()
            .filter_map(|outcome| match outcome {
                VertexOutcome::Failed { error } => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every change applied or planned, sorted by vertex name
    pub fn changes(&self) -> Vec<&ResourceChange> {
        self.outcomes.values().flat_map(VertexOutcome::changes).collect()
    }

    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }

    /// Turn a walk with failed vertices into [`Error::Aggregate`]
    pub fn into_result(self) -> Result<Self> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(Error::Aggregate(AggregateError { errors }))
        }
    }
}

/// Walk a validated graph.
///
/// A vertex is dispatched to the worker pool once every vertex it depends on
/// reached a terminal outcome. When a vertex fails, everything that depends
/// on it (transitively) is reported as blocked and never runs; unrelated
/// vertices keep going. After `cancel` is set nothing new is dispatched,
/// running vertices finish and the rest are reported as cancelled.
///
/// Vertex failures do not make this function fail; they are part of the
/// report. Use [`WalkReport::into_result`] to turn them into an error.
pub fn walk<O: WalkObserver>(
    graph: &Graph,
    state: &State,
    ctx: &EvalContext,
    opts: &ExecuteOptions,
    observer: &mut O,
    cancel: &CancelToken,
) -> Result<WalkReport> {
    let nodes = graph.node_indices();
    let count = nodes.len();
    let position: HashMap<_, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let names: Vec<String> = nodes.iter().map(|&n| graph.name_of(n)).collect();
    let neighbors = |direction: Direction| -> Vec<Vec<usize>> {
        nodes
            .iter()
            .map(|&n| {
                graph
                    .sorted_neighbors(n, direction)
                    .iter()
                    .filter_map(|m| position.get(m).copied())
                    .collect()
            })
            .collect()
    };
    let dependents = neighbors(Direction::Incoming);
    let mut remaining: Vec<usize> = neighbors(Direction::Outgoing).iter().map(Vec::len).collect();
    let mut outcomes: Vec<Option<VertexOutcome>> = vec![None; count];

    observer.on_walk_start(count);
    log::debug!("Walking {count} vertices with {} worker(s)", opts.jobs);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    let (tx, rx) = mpsc::channel::<(usize, VertexOutcome)>();
    let mut ready: VecDeque<usize> = (0..count).filter(|&i| remaining[i] == 0).collect();
    let operation = opts.operation;

    pool.in_place_scope(|scope| {
        let mut in_flight = 0usize;
        loop {
            while !cancel.is_cancelled() {
                let Some(i) = ready.pop_front() else {
                    break;
                };
                if outcomes[i].is_some() {
                    continue;
                }
                observer.on_vertex_start(&names[i]);
                let vertex = graph.node(nodes[i]);
                let name = names[i].clone();
                let tx = tx.clone();
                in_flight += 1;
                scope.spawn(move |_| {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        evaluate(vertex, &name, operation, ctx, state)
                    }))
                    .unwrap_or_else(|panic| VertexOutcome::Failed {
                        error: VertexError::new(
                            &name,
                            StepKind::Apply,
                            panic_message(panic.as_ref()),
                        ),
                    });
                    // The receiver outlives every job of the scope
                    let _ = tx.send((i, outcome));
                });
            }

            if in_flight == 0 {
                break;
            }
            let Ok((i, outcome)) = rx.recv() else {
                break;
            };
            in_flight -= 1;

            observer.on_vertex_complete(&names[i], &outcome);
            if let VertexOutcome::Failed { error } = &outcome {
                log::debug!("{error}");
                block_dependents(i, &names, &dependents, &mut outcomes, observer);
            } else {
                for &d in &dependents[i] {
                    remaining[d] = remaining[d].saturating_sub(1);
                    if remaining[d] == 0 && outcomes[d].is_none() {
                        ready.push_back(d);
                    }
                }
            }
            outcomes[i] = Some(outcome);
        }
    });

    if cancel.is_cancelled() {
        let not_started = outcomes.iter().filter(|o| o.is_none()).count();
        log::warn!("Walk cancelled, {} vertices not started", not_started);
    }

    let mut report = WalkReport::default();
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let outcome = outcome.unwrap_or_else(|| {
            let outcome = VertexOutcome::Cancelled;
            observer.on_vertex_complete(&names[i], &outcome);
            outcome
        });
        report.summary.add_outcome(&outcome);
        report.outcomes.insert(names[i].clone(), outcome);
    }
    observer.on_walk_complete();
    Ok(report)
}

/// Walk without progress reporting or cancellation
pub fn walk_simple(
    graph: &Graph,
    state: &State,
    ctx: &EvalContext,
    opts: &ExecuteOptions,
) -> Result<WalkReport> {
    walk(graph, state, ctx, opts, &mut NoObserver, &CancelToken::new())
}

/// Run one vertex plan to completion
fn evaluate(
    vertex: Option<&dyn Vertex>,
    name: &str,
    operation: Operation,
    ctx: &EvalContext,
    state: &State,
) -> VertexOutcome {
    let Some(evaluable) = vertex.and_then(|v| v.as_evaluable()) else {
        return VertexOutcome::Skipped;
    };

    let mut plan = evaluable.plan(operation);
    if let Some(providable) = vertex.and_then(|v| v.as_providable()) {
        plan = plan.with_provider(providable.provided_by());
    }
    plan.run(ctx, state).into_outcome(name)
}

/// Mark every transitive dependent of a failed vertex as blocked by it
fn block_dependents<O: WalkObserver>(
    failed: usize,
    names: &[String],
    dependents: &[Vec<usize>],
    outcomes: &mut [Option<VertexOutcome>],
    observer: &mut O,
) {
    let mut pending = dependents[failed].clone();
    while let Some(d) = pending.pop() {
        if outcomes[d].is_some() {
            continue;
        }
        let outcome = VertexOutcome::Blocked {
            by: names[failed].clone(),
        };
        observer.on_vertex_complete(&names[d], &outcome);
        outcomes[d] = Some(outcome);
        pending.extend(&dependents[d]);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
