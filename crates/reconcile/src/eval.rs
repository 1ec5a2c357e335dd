//! Vertex execution plans
//!
//! An [`ExecutionPlan`] is the ordered list of steps a vertex goes through
//! during a walk, plus the [`EvalTarget`] those steps operate on. The plan
//! is driven through [`VertexState`], an explicit state machine:
//!
//! ```text
//! Pending -> Refreshed -> Diffed -> Applied -> Committed
//!               |           |
//!               |           +-> Skipped (empty diff)
//!               +-----------+-> Failed  (from any non-terminal state)
//! ```

use crate::context::EvalContext;
use crate::diff::{Action, AttributeDiff, Diff, ResourceChange};
use crate::error::{StepKind, VertexError};
use crate::path::{ModulePath, provider_name, resource_kind};
use crate::state::{ModuleState, State};
use crate::types::{Attributes, Operation, ResourceState, VertexOutcome};
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One typed step of an execution plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Refresh,
    Diff,
    Apply,
    CommitState,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Refresh => StepKind::Refresh,
            Self::Diff => StepKind::Diff,
            Self::Apply => StepKind::Apply,
            Self::CommitState => StepKind::Commit,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

/// What a plan operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalTarget {
    /// A single resource. `desired: None` means it must be destroyed.
    Resource {
        path: ModulePath,
        name: String,
        desired: Option<Attributes>,
        dependencies: Vec<String>,
    },
    /// Record module-level dependencies of a declared module
    ModuleDependencies {
        path: ModulePath,
        dependencies: Vec<String>,
    },
    /// Destroy everything recorded in a module subtree and drop the modules
    DestroyModule { path: ModulePath },
}

/// Ordered steps for one vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Name of the vertex the plan belongs to
    pub vertex: String,
    pub target: EvalTarget,
    pub steps: Vec<Step>,
    /// Provider that executes a single-resource target
    pub provider: Option<String>,
}

impl ExecutionPlan {
    pub fn new(vertex: String, target: EvalTarget, operation: Operation) -> Self {
        Self {
            vertex,
            target,
            steps: Self::steps_for(operation),
            provider: None,
        }
    }

    /// Step sequence for an operation
    pub fn steps_for(operation: Operation) -> Vec<Step> {
        match operation {
            Operation::Plan => vec![Step::Refresh, Step::Diff],
            Operation::Apply => vec![Step::Refresh, Step::Diff, Step::Apply, Step::CommitState],
        }
    }

    pub fn with_provider(mut self, provider: String) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Drive the state machine through every step, stopping at a terminal state
    pub fn run(&self, ctx: &EvalContext, state: &State) -> VertexState {
        let mut current = VertexState::Pending;
        for step in &self.steps {
            current = current.advance(*step, self, ctx, state);
            log::trace!("{}: {} -> {}", self.vertex, step, current.label());
            if current.is_terminal() {
                break;
            }
        }
        current
    }
}

/// One resource handled by a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub path: ModulePath,
    pub name: String,
    pub kind: String,
    pub provider: String,
    /// Declared attributes, `None` when the resource must be destroyed
    pub desired: Option<Attributes>,
    /// Dependencies recorded into state on commit
    pub dependencies: Vec<String>,
    /// What state held before this walk
    pub recorded: Option<ResourceState>,
    /// Refreshed attributes, `None` if the resource does not exist
    pub current: Option<Attributes>,
    pub diff: Diff,
    /// Declared dependencies differ from the recorded ones
    pub dependencies_changed: bool,
    /// Attributes returned by the provider; `None` after a destroy
    pub applied: Option<Attributes>,
    /// Whether the provider operation completed
    pub done: bool,
}

impl Instance {
    pub fn address(&self) -> String {
        self.path.qualify(&self.name)
    }

    /// Only the dependency list needs to be written
    fn dependencies_only(&self) -> bool {
        self.diff.is_empty() && self.dependencies_changed
    }
}

fn depends_on_change(address: String, old: Option<&[String]>, new: &[String]) -> ResourceChange {
    ResourceChange {
        address,
        diff: Diff {
            action: Action::Update,
            attributes: BTreeMap::from([(
                "depends_on".to_string(),
                AttributeDiff {
                    old: old.map(|deps| deps.join(", ")),
                    new: Some(new.join(", ")),
                },
            )]),
        },
    }
}

/// Module-level dependency bookkeeping of a declared module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub path: ModulePath,
    pub dependencies: Vec<String>,
    /// Dependencies currently in state, `None` if the module has no node
    pub recorded: Option<Vec<String>>,
    pub changed: bool,
}

/// Data a plan accumulates as it moves through its steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workset {
    pub instances: Vec<Instance>,
    pub module_record: Option<ModuleRecord>,
    /// Module nodes to drop from state, deepest first
    pub remove_modules: Vec<ModulePath>,
}

impl Workset {
    /// Changes this workset carries, in execution order
    pub fn changes(&self) -> Vec<ResourceChange> {
        let mut changes: Vec<ResourceChange> = Vec::new();
        for instance in &self.instances {
            if instance.dependencies_only() {
                changes.push(depends_on_change(
                    instance.address(),
                    instance.recorded.as_ref().map(|r| r.dependencies.as_slice()),
                    &instance.dependencies,
                ));
            } else if !instance.diff.is_empty() {
                changes.push(ResourceChange {
                    address: instance.address(),
                    diff: instance.diff.clone(),
                });
            }
        }

        if let Some(record) = &self.module_record
            && record.changed
        {
            changes.push(depends_on_change(
                record.path.module_address(),
                record.recorded.as_deref(),
                &record.dependencies,
            ));
        }

        changes.extend(self.remove_modules.iter().map(|path| ResourceChange {
            address: path.module_address(),
            diff: Diff::destroy(None),
        }));
        changes
    }

    pub fn has_changes(&self) -> bool {
        self.instances
            .iter()
            .any(|i| !i.diff.is_empty() || i.dependencies_changed)
            || self.module_record.as_ref().is_some_and(|r| r.changed)
            || !self.remove_modules.is_empty()
    }
}

/// Execution state of one vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexState {
    Pending,
    Refreshed(Workset),
    Diffed(Workset),
    Applied(Workset),
    Committed(Vec<ResourceChange>),
    Skipped,
    Failed(VertexError),
}

impl VertexState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed(_) | Self::Skipped | Self::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Refreshed(_) => "refreshed",
            Self::Diffed(_) => "diffed",
            Self::Applied(_) => "applied",
            Self::Committed(_) => "committed",
            Self::Skipped => "skipped",
            Self::Failed(_) => "failed",
        }
    }

    /// Transition function.
    ///
    /// Terminal states absorb every step. A step that does not follow the
    /// current state moves the vertex to `Failed`.
    pub fn advance(
        self,
        step: Step,
        plan: &ExecutionPlan,
        ctx: &EvalContext,
        state: &State,
    ) -> Self {
        match (self, step) {
            (current, _) if current.is_terminal() => current,
            (Self::Pending, Step::Refresh) => refresh(plan, ctx, state),
            (Self::Refreshed(workset), Step::Diff) => diff(plan, ctx, workset),
            (Self::Diffed(workset), Step::Apply) => apply(plan, ctx, state, workset),
            (Self::Applied(workset), Step::CommitState) => commit(plan, state, workset),
            (current, step) => Self::Failed(VertexError::new(
                &plan.vertex,
                step.kind(),
                format!("invalid transition: cannot {} from {}", step, current.label()),
            )),
        }
    }

    /// Final outcome of a vertex whose plan has finished
    pub fn into_outcome(self, vertex: &str) -> VertexOutcome {
        match self {
            Self::Committed(changes) => VertexOutcome::Applied { changes },
            Self::Diffed(workset) => VertexOutcome::Planned {
                changes: workset.changes(),
            },
            Self::Skipped => VertexOutcome::Skipped,
            Self::Failed(error) => VertexOutcome::Failed { error },
            other => VertexOutcome::Failed {
                error: VertexError::new(
                    vertex,
                    StepKind::Commit,
                    format!("plan ended in non-terminal state {}", other.label()),
                ),
            },
        }
    }
}

fn failed(plan: &ExecutionPlan, step: StepKind, err: &anyhow::Error) -> VertexState {
    VertexState::Failed(VertexError::from_anyhow(&plan.vertex, step, err))
}

fn refresh(plan: &ExecutionPlan, ctx: &EvalContext, state: &State) -> VertexState {
    let mut workset = Workset::default();

    match &plan.target {
        EvalTarget::Resource {
            path,
            name,
            desired,
            dependencies,
        } => {
            let provider = plan
                .provider
                .clone()
                .unwrap_or_else(|| provider_name(resource_kind(name)).to_string());
            let recorded = state.resource(path, name);
            let refreshed = refresh_instance(
                ctx,
                path,
                name,
                provider,
                desired.clone(),
                dependencies.clone(),
                recorded,
            );
            match refreshed {
                Ok(instance) => workset.instances.push(instance),
                Err(err) => return failed(plan, StepKind::Refresh, &err),
            }
        }
        EvalTarget::ModuleDependencies { path, dependencies } => {
            workset.module_record = Some(ModuleRecord {
                path: path.clone(),
                dependencies: dependencies.clone(),
                recorded: state.module_state(path).map(|m| m.dependencies),
                changed: false,
            });
        }
        EvalTarget::DestroyModule { path } => {
            let paths = state.subtree_paths(path);
            for module_path in &paths {
                let Some(module) = state.module_state(module_path) else {
                    continue;
                };
                for name in destroy_order(&module) {
                    let Some(recorded) = module.resources.get(&name).cloned() else {
                        continue;
                    };
                    let provider = provider_name(resource_kind(&name)).to_string();
                    let dependencies = recorded.dependencies.clone();
                    let refreshed = refresh_instance(
                        ctx,
                        module_path,
                        &name,
                        provider,
                        None,
                        dependencies,
                        Some(recorded),
                    );
                    match refreshed {
                        Ok(instance) => workset.instances.push(instance),
                        Err(err) => return failed(plan, StepKind::Refresh, &err),
                    }
                }
            }
            workset.remove_modules = paths.into_iter().filter(|p| !p.is_root()).collect();
        }
    }

    VertexState::Refreshed(workset)
}

fn refresh_instance(
    ctx: &EvalContext,
    path: &ModulePath,
    name: &str,
    provider: String,
    desired: Option<Attributes>,
    dependencies: Vec<String>,
    recorded: Option<ResourceState>,
) -> anyhow::Result<Instance> {
    let address = path.qualify(name);
    let kind = resource_kind(name).to_string();
    let handle = ctx
        .provider(&provider)
        .with_context(|| format!("Cannot refresh {address}"))?;

    let current = match &recorded {
        Some(recorded) => handle
            .refresh(&kind, &recorded.attributes)
            .with_context(|| format!("Failed to refresh {address}"))?,
        None => None,
    };

    Ok(Instance {
        path: path.clone(),
        name: name.to_string(),
        kind,
        provider,
        desired,
        dependencies,
        recorded,
        current,
        diff: Diff::empty(),
        dependencies_changed: false,
        applied: None,
        done: false,
    })
}

/// Resource names of a module in an order where dependents come before
/// the resources they depend on
fn destroy_order(module: &ModuleState) -> Vec<String> {
    let mut remaining: BTreeSet<&String> = module.resources.keys().collect();
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let free: Vec<&String> = remaining
            .iter()
            .filter(|name| {
                !remaining.iter().any(|other| {
                    other != *name
                        && module
                            .resources
                            .get(*other)
                            .is_some_and(|r| r.dependencies.iter().any(|d| d == **name))
                })
            })
            .copied()
            .collect();

        // Recorded dependencies may be cyclic; fall back to name order
        let batch = if free.is_empty() {
            remaining.iter().copied().collect()
        } else {
            free
        };
        for name in batch {
            remaining.remove(name);
            order.push(name.clone());
        }
    }
    order
}

fn diff(plan: &ExecutionPlan, ctx: &EvalContext, mut workset: Workset) -> VertexState {
    for instance in &mut workset.instances {
        instance.diff = match &instance.desired {
            None => Diff::destroy(instance.current.as_ref()),
            Some(desired) => {
                let result = ctx.provider(&instance.provider).and_then(|provider| {
                    provider
                        .diff(&instance.kind, desired, instance.current.as_ref())
                        .with_context(|| format!("Failed to diff {}", instance.address()))
                });
                match result {
                    Ok(diff) => diff,
                    Err(err) => return failed(plan, StepKind::Diff, &err),
                }
            }
        };
        instance.dependencies_changed = instance.desired.is_some()
            && instance
                .recorded
                .as_ref()
                .is_some_and(|recorded| recorded.dependencies != instance.dependencies);
    }

    // A module with no node of its own still records a non-empty list
    if let Some(record) = &mut workset.module_record {
        record.changed = match &record.recorded {
            Some(recorded) => recorded != &record.dependencies,
            None => !record.dependencies.is_empty(),
        };
    }

    if !workset.has_changes() {
        return VertexState::Skipped;
    }
    VertexState::Diffed(workset)
}

fn apply(
    plan: &ExecutionPlan,
    ctx: &EvalContext,
    state: &State,
    mut workset: Workset,
) -> VertexState {
    for index in 0..workset.instances.len() {
        let instance = &mut workset.instances[index];
        if instance.dependencies_only() {
            instance.applied = instance
                .current
                .clone()
                .or_else(|| instance.recorded.as_ref().map(|r| r.attributes.clone()));
            instance.done = true;
            continue;
        }
        if instance.diff.is_empty() {
            continue;
        }
        if instance.desired.is_none() && !instance.diff.is_destroy() {
            let err = anyhow::anyhow!(
                "{} is no longer declared and can only be destroyed",
                instance.address()
            );
            commit_instances(state, &workset.instances);
            return failed(plan, StepKind::Apply, &err);
        }

        let result = ctx.provider(&instance.provider).and_then(|provider| {
            provider
                .apply(&instance.kind, instance.current.as_ref(), &instance.diff)
                .with_context(|| {
                    format!("Failed to {} {}", instance.diff.action, instance.address())
                })
        });

        match result {
            Ok(attributes) => {
                instance.applied = (!instance.diff.is_destroy()).then_some(attributes);
                instance.done = true;
            }
            Err(err) => {
                // Keep state truthful about whatever was already changed
                commit_instances(state, &workset.instances);
                return failed(plan, StepKind::Apply, &err);
            }
        }
    }
    VertexState::Applied(workset)
}

fn commit(plan: &ExecutionPlan, state: &State, workset: Workset) -> VertexState {
    commit_instances(state, &workset.instances);

    if let Some(record) = &workset.module_record
        && record.changed
    {
        state.set_module_dependencies(&record.path, record.dependencies.clone());
    }

    for path in &workset.remove_modules {
        if let Err(err) = state.commit_module(path, false) {
            return VertexState::Failed(VertexError::new(
                &plan.vertex,
                StepKind::Commit,
                err.to_string(),
            ));
        }
    }

    VertexState::Committed(workset.changes())
}

fn commit_instances(state: &State, instances: &[Instance]) {
    for instance in instances.iter().filter(|i| i.done) {
        let recorded = instance
            .applied
            .clone()
            .map(|attributes| ResourceState::new(attributes, instance.dependencies.clone()));
        state.commit_resource(&instance.path, &instance.name, recorded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Provider;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records attributes as given and hands out sequential ids
    #[derive(Default)]
    struct FakeProvider {
        applies: AtomicUsize,
        fail_on: Option<String>,
    }

    impl Provider for FakeProvider {
        fn refresh(
            &self,
            _kind: &str,
            attributes: &Attributes,
        ) -> anyhow::Result<Option<Attributes>> {
            Ok(Some(attributes.clone()))
        }

        fn apply(
            &self,
            kind: &str,
            current: Option<&Attributes>,
            diff: &Diff,
        ) -> anyhow::Result<Attributes> {
            if self.fail_on.as_deref() == Some(kind) {
                anyhow::bail!("provider rejected {kind}");
            }
            let n = self.applies.fetch_add(1, Ordering::SeqCst);
            let mut attrs = diff.apply_to(current);
            attrs.entry("id".into()).or_insert_with(|| format!("id-{n}"));
            Ok(attrs)
        }
    }

    fn ctx(provider: FakeProvider) -> EvalContext {
        EvalContext::new().with_fallback(Arc::new(provider))
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resource_plan(
        name: &str,
        desired: Option<Attributes>,
        operation: Operation,
    ) -> ExecutionPlan {
        ExecutionPlan::new(
            name.to_string(),
            EvalTarget::Resource {
                path: ModulePath::root(),
                name: name.to_string(),
                desired,
                dependencies: vec![],
            },
            operation,
        )
    }

    #[test]
    fn test_create_runs_every_step() {
        let state = State::new();
        let plan = resource_plan("web", Some(attrs(&[("ami", "a-1")])), Operation::Apply);

        let result = plan.run(&ctx(FakeProvider::default()), &state);
        let VertexState::Committed(changes) = result else {
            panic!("expected committed, got {result:?}");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), Action::Create);

        let recorded = state.resource(&ModulePath::root(), "web").unwrap();
        assert_eq!(recorded.attributes["ami"], "a-1");
        assert_eq!(recorded.attributes["id"], "id-0");
    }

    #[test]
    fn test_no_diff_is_skipped() {
        let state = State::new();
        state.commit_resource(
            &ModulePath::root(),
            "web",
            Some(ResourceState::new(attrs(&[("ami", "a-1"), ("id", "i")]), vec![])),
        );
        let plan = resource_plan("web", Some(attrs(&[("ami", "a-1")])), Operation::Apply);
        assert_eq!(plan.run(&ctx(FakeProvider::default()), &state), VertexState::Skipped);
    }

    #[test]
    fn test_plan_mode_stops_after_diff() {
        let state = State::new();
        let plan = resource_plan("web", Some(Attributes::new()), Operation::Plan);
        let result = plan.run(&ctx(FakeProvider::default()), &state);
        assert_eq!(result.label(), "diffed");
        assert!(state.is_empty());

        let outcome = result.into_outcome("web");
        assert_eq!(outcome.changes().len(), 1);
    }

    #[test]
    fn test_orphan_always_destroys() {
        let state = State::new();
        state.commit_resource(
            &ModulePath::root(),
            "b",
            Some(ResourceState::new(attrs(&[("id", "i")]), vec!["a".into()])),
        );
        let plan = resource_plan("b (orphan)", None, Operation::Apply);
        let result = plan.run(&ctx(FakeProvider::default()), &state);
        let VertexState::Committed(changes) = result else {
            panic!("expected committed");
        };
        assert_eq!(changes[0].action(), Action::Destroy);
        assert!(state.resource(&ModulePath::root(), "b").is_none());
    }

    #[test]
    fn test_apply_failure_is_recorded() {
        let state = State::new();
        let provider = FakeProvider {
            fail_on: Some("web".into()),
            ..Default::default()
        };
        let plan = resource_plan("web", Some(Attributes::new()), Operation::Apply);
        let VertexState::Failed(error) = plan.run(&ctx(provider), &state) else {
            panic!("expected failure");
        };
        assert_eq!(error.step, StepKind::Apply);
        assert!(error.message.contains("provider rejected web"));
        assert!(error.message.contains("Failed to create web"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_missing_provider_fails_refresh() {
        let state = State::new();
        let plan = resource_plan("aws_instance.web", Some(Attributes::new()), Operation::Apply);
        let VertexState::Failed(error) = plan.run(&EvalContext::new(), &state) else {
            panic!("expected failure");
        };
        assert_eq!(error.step, StepKind::Refresh);
        assert!(error.message.contains("aws"));
    }

    #[test]
    fn test_invalid_transition_fails() {
        let state = State::new();
        let plan = resource_plan("web", Some(Attributes::new()), Operation::Apply);
        let next = VertexState::Pending.advance(Step::Apply, &plan, &EvalContext::new(), &state);
        let VertexState::Failed(error) = next else {
            panic!("expected failure");
        };
        assert!(error.message.contains("cannot apply from pending"));

        // Terminal states absorb further steps
        let skipped =
            VertexState::Skipped.advance(Step::Refresh, &plan, &EvalContext::new(), &state);
        assert_eq!(skipped, VertexState::Skipped);
    }

    #[test]
    fn test_destroy_module_removes_subtree() {
        let state = State::new();
        let net = ModulePath::root().child("network");
        let edge = net.child("edge");
        state.commit_resource(
            &net,
            "subnet",
            Some(ResourceState::new(attrs(&[("id", "s")]), vec!["vpc".into()])),
        );
        state.commit_resource(&net, "vpc", Some(ResourceState::new(attrs(&[("id", "v")]), vec![])));
        state.commit_resource(&edge, "gw", Some(ResourceState::default()));

        let plan = ExecutionPlan::new(
            "module.network (orphan)".into(),
            EvalTarget::DestroyModule { path: net.clone() },
            Operation::Apply,
        );
        let VertexState::Committed(changes) = plan.run(&ctx(FakeProvider::default()), &state) else {
            panic!("expected committed");
        };

        let addresses: Vec<&str> = changes.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "module.network.module.edge.gw",
                "module.network.subnet",
                "module.network.vpc",
                "module.network.module.edge",
                "module.network",
            ]
        );
        assert!(!state.contains_module(&net));
        assert!(!state.contains_module(&edge));
    }

    #[test]
    fn test_partial_destroy_commits_completed_removals() {
        let state = State::new();
        let net = ModulePath::root().child("network");
        state.commit_resource(&net, "a", Some(ResourceState::default()));
        state.commit_resource(&net, "b", Some(ResourceState::default()));

        let provider = FakeProvider {
            fail_on: Some("b".into()),
            ..Default::default()
        };
        let plan = ExecutionPlan::new(
            "module.network (orphan)".into(),
            EvalTarget::DestroyModule { path: net.clone() },
            Operation::Apply,
        );
        assert_eq!(plan.run(&ctx(provider), &state).label(), "failed");

        // `a` was destroyed before `b` failed and must be gone from state
        assert!(state.resource(&net, "a").is_none());
        assert!(state.resource(&net, "b").is_some());
        assert!(state.contains_module(&net));
    }

    #[test]
    fn test_module_record_only_when_changed() {
        let state = State::new();
        let net = ModulePath::root().child("network");
        let plan = |dependencies: Vec<String>| {
            ExecutionPlan::new(
                "module.network".into(),
                EvalTarget::ModuleDependencies {
                    path: net.clone(),
                    dependencies,
                },
                Operation::Apply,
            )
        };

        // Nothing to record for a module without node or dependencies
        assert_eq!(plan(vec![]).run(&EvalContext::new(), &state), VertexState::Skipped);
        assert!(!state.contains_module(&net));

        // A module holding only child modules has no node yet; it gets one
        let declared = plan(vec!["aws_vpc.main".into()]);
        let result = declared.run(&EvalContext::new(), &state);
        let VertexState::Committed(changes) = result else {
            panic!("expected committed, got {result:?}");
        };
        assert_eq!(changes[0].address, "module.network");
        assert_eq!(
            state.module_state(&net).unwrap().dependencies,
            vec!["aws_vpc.main".to_string()]
        );
        assert_eq!(declared.run(&EvalContext::new(), &state), VertexState::Skipped);

        let changed = plan(vec!["dns".into()]);
        assert_eq!(changed.run(&EvalContext::new(), &state).label(), "committed");
        assert_eq!(state.module_state(&net).unwrap().dependencies, vec!["dns"]);
    }

    #[test]
    fn test_dependency_change_alone_is_recorded() {
        let state = State::new();
        let root = ModulePath::root();
        let recorded = attrs(&[("ami", "a-1"), ("id", "i")]);
        state.commit_resource(
            &root,
            "web",
            Some(ResourceState::new(recorded.clone(), vec!["db".into()])),
        );
        let provider = FakeProvider::default();
        let plan = ExecutionPlan::new(
            "web".into(),
            EvalTarget::Resource {
                path: root.clone(),
                name: "web".into(),
                desired: Some(attrs(&[("ami", "a-1")])),
                dependencies: vec!["cache".into()],
            },
            Operation::Apply,
        );

        let ctx = EvalContext::new().with_fallback(Arc::new(provider));
        let result = plan.run(&ctx, &state);
        let VertexState::Committed(changes) = result else {
            panic!("expected committed, got {result:?}");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), Action::Update);
        assert!(changes[0].diff.attributes.contains_key("depends_on"));

        let web = state.resource(&root, "web").unwrap();
        assert_eq!(web.dependencies, vec!["cache"]);
        assert_eq!(web.attributes, recorded);
        assert_eq!(plan.run(&ctx, &state), VertexState::Skipped);
    }

    #[test]
    fn test_destroy_order_puts_dependents_first() {
        let mut module = ModuleState::default();
        module.resources.insert("a".into(), ResourceState::default());
        module
            .resources
            .insert("b".into(), ResourceState::new(Attributes::new(), vec!["a".into()]));
        module
            .resources
            .insert("c".into(), ResourceState::new(Attributes::new(), vec!["b".into()]));
        assert_eq!(destroy_order(&module), vec!["c", "b", "a"]);
    }
}
