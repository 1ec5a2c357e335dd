//! Configuration tree interface
//!
//! The core never parses configuration. It reads the desired-state tree
//! through [`ConfigTree`]; [`ModuleConfig`] is a plain in-memory tree that
//! implements it and can be deserialized from any serde format.

use crate::path::ModulePath;
use crate::types::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Read-only view of the declared configuration.
///
/// All lookups for a module that does not exist return empty values;
/// callers that need to distinguish use [`ConfigTree::contains_module`].
pub trait ConfigTree: Send + Sync {
    /// Whether a module exists at `path`
    fn contains_module(&self, path: &ModulePath) -> bool;

    /// Names of the resources declared directly in the module
    fn declared_resources(&self, path: &ModulePath) -> BTreeSet<String>;

    /// Paths of the direct child modules
    fn child_modules(&self, path: &ModulePath) -> BTreeSet<ModulePath>;

    /// Declared dependencies of a resource, relative to its module
    fn dependencies_of(&self, path: &ModulePath, name: &str) -> Vec<String>;

    /// Declared attributes of a resource
    fn declared_attributes(&self, path: &ModulePath, name: &str) -> Option<Attributes>;

    /// Declared dependencies of a module, relative to its parent
    fn module_dependencies(&self, path: &ModulePath) -> Vec<String>;

    /// Every module path in the tree, parents before children
    fn module_paths(&self) -> Vec<ModulePath> {
        let mut paths = Vec::new();
        let mut pending = vec![ModulePath::root()];
        while let Some(path) = pending.pop() {
            if !self.contains_module(&path) {
                continue;
            }
            let children = self.child_modules(&path);
            paths.push(path);
            pending.extend(children.into_iter().rev());
        }
        paths
    }
}

/// A declared resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ResourceConfig {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }
}

/// One module of the in-memory configuration tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource (builder style)
    pub fn with_resource(mut self, name: &str, resource: ResourceConfig) -> Self {
        self.resources.insert(name.to_string(), resource);
        self
    }

    /// Add a child module (builder style)
    pub fn with_module(mut self, name: &str, module: ModuleConfig) -> Self {
        self.modules.insert(name.to_string(), module);
        self
    }

    /// Set module-level dependencies (builder style)
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Find the module at `path`, where `self` is the root
    pub fn module(&self, path: &ModulePath) -> Option<&ModuleConfig> {
        path.segments()[1..]
            .iter()
            .try_fold(self, |module, name| module.modules.get(name))
    }

    /// Total number of declared resources in the tree
    pub fn resource_count(&self) -> usize {
        self.resources.len()
            + self
                .modules
                .values()
                .map(ModuleConfig::resource_count)
                .sum::<usize>()
    }
}

impl ConfigTree for ModuleConfig {
    fn contains_module(&self, path: &ModulePath) -> bool {
        self.module(path).is_some()
    }

    fn declared_resources(&self, path: &ModulePath) -> BTreeSet<String> {
        self.module(path)
            .map(|m| m.resources.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn child_modules(&self, path: &ModulePath) -> BTreeSet<ModulePath> {
        self.module(path)
            .map(|m| m.modules.keys().map(|name| path.child(name)).collect())
            .unwrap_or_default()
    }

    fn dependencies_of(&self, path: &ModulePath, name: &str) -> Vec<String> {
        self.module(path)
            .and_then(|m| m.resources.get(name))
            .map(|r| r.depends_on.clone())
            .unwrap_or_default()
    }

    fn declared_attributes(&self, path: &ModulePath, name: &str) -> Option<Attributes> {
        self.module(path)
            .and_then(|m| m.resources.get(name))
            .map(|r| r.attributes.clone())
    }

    fn module_dependencies(&self, path: &ModulePath) -> Vec<String> {
        self.module(path)
            .map(|m| m.depends_on.clone())
            .unwrap_or_default()
    }
}
