//! Vertex trait and the concrete vertex kinds
//!
//! A vertex is one unit of work in the dependency graph: a resource or a
//! module. Optional behavior is exposed through capability queries rather
//! than downcasting: a vertex that is executed by a provider answers
//! [`Vertex::as_providable`], a vertex that has work to do during the walk
//! answers [`Vertex::as_evaluable`].

use crate::eval::{EvalTarget, ExecutionPlan};
use crate::path::{ModulePath, provider_name, resource_kind};
use crate::types::{Attributes, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to the name of orphan vertices
pub const ORPHAN_SUFFIX: &str = " (orphan)";

/// Category tag of a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexKind {
    /// Resource declared in configuration
    Resource,
    /// Resource recorded in state but no longer declared
    OrphanResource,
    /// Nested module declared in configuration
    Module,
    /// Module recorded in state but no longer declared
    OrphanModule,
}

impl VertexKind {
    pub fn is_orphan(&self) -> bool {
        matches!(self, Self::OrphanResource | Self::OrphanModule)
    }
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resource => "resource",
            Self::OrphanResource => "orphan resource",
            Self::Module => "module",
            Self::OrphanModule => "orphan module",
        };
        f.write_str(name)
    }
}

/// Core trait for graph vertices
///
/// # Example
///
/// ```ignore
/// use reconcile::{ModulePath, Vertex, VertexKind};
///
/// #[derive(Debug)]
/// struct Marker {
///     path: ModulePath,
/// }
///
/// impl Vertex for Marker {
///     fn name(&self) -> String {
///         "marker".into()
///     }
///
///     fn path(&self) -> &ModulePath {
///         &self.path
///     }
///
///     fn depends_on(&self) -> &[String] {
///         &[]
///     }
///
///     fn kind(&self) -> VertexKind {
///         VertexKind::Module
///     }
/// }
/// ```
pub trait Vertex: Send + Sync + fmt::Debug {
    /// Unique name of this vertex within the graph
    fn name(&self) -> String;

    /// Name other vertices use to depend on this one.
    ///
    /// Same as [`Vertex::name`] unless the vertex decorates its name
    /// (orphans do).
    fn dependable_name(&self) -> String {
        self.name()
    }

    /// Module whose scope the dependency names are resolved in
    fn path(&self) -> &ModulePath;

    /// Declared dependency names, relative to [`Vertex::path`]
    fn depends_on(&self) -> &[String];

    fn kind(&self) -> VertexKind;

    /// Provider capability
    fn as_providable(&self) -> Option<&dyn Providable> {
        None
    }

    /// Execution capability; vertices without it are no-ops during the walk
    fn as_evaluable(&self) -> Option<&dyn Evaluable> {
        None
    }
}

/// A vertex executed by an external provider
pub trait Providable {
    /// Name of the provider instance that executes this vertex
    fn provided_by(&self) -> String;
}

/// A vertex with work to do during the walk
pub trait Evaluable {
    /// Execution plan for the given operation
    fn plan(&self, operation: Operation) -> ExecutionPlan;
}

/// A boxed vertex for type-erased storage
pub type BoxedVertex = Box<dyn Vertex>;

// ============================================================================
// Resource vertices
// ============================================================================

/// A resource declared in configuration
#[derive(Debug, Clone)]
pub struct ResourceVertex {
    pub path: ModulePath,
    pub resource: String,
    pub declared: Attributes,
    pub depends_on: Vec<String>,
}

impl ResourceVertex {
    pub fn new(
        path: ModulePath,
        resource: &str,
        declared: Attributes,
        depends_on: Vec<String>,
    ) -> Self {
        Self {
            path,
            resource: resource.to_string(),
            declared,
            depends_on,
        }
    }
}

impl Vertex for ResourceVertex {
    fn name(&self) -> String {
        self.path.qualify(&self.resource)
    }

    fn path(&self) -> &ModulePath {
        &self.path
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    fn kind(&self) -> VertexKind {
        VertexKind::Resource
    }

    fn as_providable(&self) -> Option<&dyn Providable> {
        Some(self)
    }

    fn as_evaluable(&self) -> Option<&dyn Evaluable> {
        Some(self)
    }
}

impl Providable for ResourceVertex {
    fn provided_by(&self) -> String {
        provider_name(resource_kind(&self.resource)).to_string()
    }
}

impl Evaluable for ResourceVertex {
    fn plan(&self, operation: Operation) -> ExecutionPlan {
        ExecutionPlan::new(
            self.name(),
            EvalTarget::Resource {
                path: self.path.clone(),
                name: self.resource.clone(),
                desired: Some(self.declared.clone()),
                dependencies: self.depends_on.clone(),
            },
            operation,
        )
    }
}

/// A resource recorded in state that configuration no longer declares.
///
/// Carries the dependency list state recorded for it when it was detected.
#[derive(Debug, Clone)]
pub struct OrphanResourceVertex {
    pub path: ModulePath,
    pub resource: String,
    pub depends_on: Vec<String>,
}

impl OrphanResourceVertex {
    pub fn new(path: ModulePath, resource: &str, depends_on: Vec<String>) -> Self {
        Self {
            path,
            resource: resource.to_string(),
            depends_on,
        }
    }
}

impl Vertex for OrphanResourceVertex {
    fn name(&self) -> String {
        format!("{}{ORPHAN_SUFFIX}", self.dependable_name())
    }

    fn dependable_name(&self) -> String {
        self.path.qualify(&self.resource)
    }

    fn path(&self) -> &ModulePath {
        &self.path
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    fn kind(&self) -> VertexKind {
        VertexKind::OrphanResource
    }

    fn as_providable(&self) -> Option<&dyn Providable> {
        Some(self)
    }

    fn as_evaluable(&self) -> Option<&dyn Evaluable> {
        Some(self)
    }
}

impl Providable for OrphanResourceVertex {
    fn provided_by(&self) -> String {
        provider_name(resource_kind(&self.resource)).to_string()
    }
}

impl Evaluable for OrphanResourceVertex {
    fn plan(&self, operation: Operation) -> ExecutionPlan {
        ExecutionPlan::new(
            self.name(),
            EvalTarget::Resource {
                path: self.path.clone(),
                name: self.resource.clone(),
                desired: None,
                dependencies: self.depends_on.clone(),
            },
            operation,
        )
    }
}

// ============================================================================
// Module vertices
// ============================================================================

/// A nested module declared in configuration.
///
/// Groups everything declared inside the module; its own work is limited to
/// recording the module-level dependencies in state.
#[derive(Debug, Clone)]
pub struct ModuleVertex {
    /// Parent module, where the module's name and dependencies resolve
    pub scope: ModulePath,
    /// The module itself
    pub module: ModulePath,
    pub depends_on: Vec<String>,
}

impl ModuleVertex {
    /// Vertex for a non-root module
    pub fn new(module: ModulePath, depends_on: Vec<String>) -> Option<Self> {
        Some(Self {
            scope: module.parent()?,
            module,
            depends_on,
        })
    }
}

impl Vertex for ModuleVertex {
    fn name(&self) -> String {
        self.module.module_address()
    }

    fn path(&self) -> &ModulePath {
        &self.scope
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    fn kind(&self) -> VertexKind {
        VertexKind::Module
    }

    fn as_evaluable(&self) -> Option<&dyn Evaluable> {
        Some(self)
    }
}

impl Evaluable for ModuleVertex {
    fn plan(&self, operation: Operation) -> ExecutionPlan {
        ExecutionPlan::new(
            self.name(),
            EvalTarget::ModuleDependencies {
                path: self.module.clone(),
                dependencies: self.depends_on.clone(),
            },
            operation,
        )
    }
}

/// A module recorded in state that configuration no longer declares.
///
/// Its plan destroys every resource recorded in the module and below it,
/// then removes the module nodes from state.
#[derive(Debug, Clone)]
pub struct OrphanModuleVertex {
    pub scope: ModulePath,
    pub module: ModulePath,
    pub depends_on: Vec<String>,
}

impl OrphanModuleVertex {
    pub fn new(module: ModulePath, depends_on: Vec<String>) -> Option<Self> {
        Some(Self {
            scope: module.parent()?,
            module,
            depends_on,
        })
    }
}

impl Vertex for OrphanModuleVertex {
    fn name(&self) -> String {
        format!("{}{ORPHAN_SUFFIX}", self.dependable_name())
    }

    fn dependable_name(&self) -> String {
        self.module.module_address()
    }

    fn path(&self) -> &ModulePath {
        &self.scope
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    fn kind(&self) -> VertexKind {
        VertexKind::OrphanModule
    }

    fn as_evaluable(&self) -> Option<&dyn Evaluable> {
        Some(self)
    }
}

impl Evaluable for OrphanModuleVertex {
    fn plan(&self, operation: Operation) -> ExecutionPlan {
        ExecutionPlan::new(
            self.name(),
            EvalTarget::DestroyModule {
                path: self.module.clone(),
            },
            operation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Step;

    #[test]
    fn test_resource_names() {
        let net = ModulePath::root().child("network");
        let v = ResourceVertex::new(net.clone(), "aws_subnet.a", Attributes::new(), vec![]);
        assert_eq!(v.name(), "module.network.aws_subnet.a");
        assert_eq!(v.dependable_name(), v.name());
        assert_eq!(v.as_providable().map(|p| p.provided_by()), Some("aws".into()));

        let o = OrphanResourceVertex::new(net, "aws_subnet.b", vec!["aws_subnet.a".into()]);
        assert_eq!(o.name(), "module.network.aws_subnet.b (orphan)");
        assert_eq!(o.dependable_name(), "module.network.aws_subnet.b");
        assert!(o.kind().is_orphan());
    }

    #[test]
    fn test_module_names() {
        let net = ModulePath::root().child("network");
        let m = ModuleVertex::new(net.clone(), vec![]).unwrap();
        assert_eq!(m.name(), "module.network");
        assert_eq!(m.path(), &ModulePath::root());
        assert!(m.as_providable().is_none());

        let o = OrphanModuleVertex::new(net, vec![]).unwrap();
        assert_eq!(o.name(), "module.network (orphan)");
        assert_eq!(o.dependable_name(), "module.network");

        assert!(ModuleVertex::new(ModulePath::root(), vec![]).is_none());
    }

    #[test]
    fn test_orphan_plan_destroys() {
        let o = OrphanResourceVertex::new(ModulePath::root(), "b", vec!["a".into()]);
        let plan = o.plan(Operation::Apply);
        assert_eq!(plan.vertex, "b (orphan)");
        assert!(matches!(plan.target, EvalTarget::Resource { desired: None, .. }));
        assert_eq!(
            plan.steps,
            vec![Step::Refresh, Step::Diff, Step::Apply, Step::CommitState]
        );

        let plan = o.plan(Operation::Plan);
        assert_eq!(plan.steps, vec![Step::Refresh, Step::Diff]);
    }
}
