//! State model
//!
//! [`State`] is the recorded state of one reconciliation run. It is loaded
//! once, mutated in place as vertices commit, and handed back to the caller
//! for persistence. Every module node sits behind its own mutex so that
//! commits under different modules never contend, while two commits under
//! the same module never interleave.

use crate::config::ConfigTree;
use crate::error::{Error, Result};
use crate::path::ModulePath;
use crate::types::ResourceState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Recorded state of a single module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Resource name to recorded state
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
    /// Module-level dependencies, relative to the parent module
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ModuleState {
    /// Resources recorded here but not declared in `declared`.
    ///
    /// With no configuration for the module every resource is an orphan.
    pub fn orphans(&self, declared: Option<&BTreeSet<String>>) -> Vec<String> {
        self.resources
            .keys()
            .filter(|name| declared.is_none_or(|d| !d.contains(*name)))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Serializable copy of a whole [`State`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub modules: Vec<ModuleSnapshot>,
}

/// One module entry of a [`StateSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    pub path: ModulePath,
    #[serde(flatten)]
    pub state: ModuleState,
}

type ModuleIndex = BTreeMap<ModulePath, Arc<Mutex<ModuleState>>>;

/// Recorded state, shared between walk workers
#[derive(Debug, Default)]
pub struct State {
    modules: RwLock<ModuleIndex>,
}

impl State {
    /// Empty state, as on a first-ever apply
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        let modules = snapshot
            .modules
            .into_iter()
            .map(|m| (m.path, Arc::new(Mutex::new(m.state))))
            .collect();
        Self {
            modules: RwLock::new(modules),
        }
    }

    /// Copy of the current contents, parents before children
    pub fn snapshot(&self) -> StateSnapshot {
        let index = self.read_index();
        StateSnapshot {
            modules: index
                .iter()
                .map(|(path, module)| ModuleSnapshot {
                    path: path.clone(),
                    state: lock_module(module).clone(),
                })
                .collect(),
        }
    }

    /// Copy of the state recorded for one module
    pub fn module_state(&self, path: &ModulePath) -> Option<ModuleState> {
        self.read_index()
            .get(path)
            .map(|module| lock_module(module).clone())
    }

    pub fn contains_module(&self, path: &ModulePath) -> bool {
        self.read_index().contains_key(path)
    }

    /// Every recorded module path, parents before children
    pub fn all_module_paths(&self) -> Vec<ModulePath> {
        self.read_index().keys().cloned().collect()
    }

    /// Direct children of `path` that have recorded state at or below them
    pub fn child_paths(&self, path: &ModulePath) -> Vec<ModulePath> {
        let depth = path.segments().len();
        let children: BTreeSet<ModulePath> = self
            .read_index()
            .keys()
            .filter(|p| p.segments().len() > depth && p.starts_with(path))
            .filter_map(|p| ModulePath::from_segments(p.segments()[..=depth].iter().cloned()))
            .collect();
        children.into_iter().collect()
    }

    /// `path` and every recorded module below it, deepest first
    pub fn subtree_paths(&self, path: &ModulePath) -> Vec<ModulePath> {
        let mut paths: Vec<ModulePath> = self
            .read_index()
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        paths.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)));
        paths
    }

    /// Recorded state of a single resource
    pub fn resource(&self, path: &ModulePath, name: &str) -> Option<ResourceState> {
        self.read_index()
            .get(path)
            .and_then(|module| lock_module(module).resources.get(name).cloned())
    }

    /// Resources recorded at `path` that `config` no longer declares
    pub fn orphans(&self, path: &ModulePath, config: &dyn ConfigTree) -> Vec<String> {
        let Some(module) = self.module_state(path) else {
            return Vec::new();
        };
        if config.contains_module(path) {
            module.orphans(Some(&config.declared_resources(path)))
        } else {
            module.orphans(None)
        }
    }

    /// Direct child modules recorded under `path` that `config` no longer declares
    pub fn module_orphans(&self, path: &ModulePath, config: &dyn ConfigTree) -> Vec<ModulePath> {
        self.child_paths(path)
            .into_iter()
            .filter(|child| !config.contains_module(child))
            .collect()
    }

    /// Write or remove one resource.
    ///
    /// `Some` records the new state, creating the module node if needed;
    /// `None` removes the resource.
    pub fn commit_resource(&self, path: &ModulePath, name: &str, state: Option<ResourceState>) {
        {
            let index = self.read_index();
            if let Some(module) = index.get(path) {
                let mut module = lock_module(module);
                match state {
                    Some(state) => {
                        module.resources.insert(name.to_string(), state);
                    }
                    None => {
                        module.resources.remove(name);
                    }
                }
                return;
            }
        }

        let Some(state) = state else {
            return;
        };
        let mut index = self.write_index();
        let module = index.entry(path.clone()).or_default();
        lock_module(module)
            .resources
            .insert(name.to_string(), state);
    }

    /// Ensure a module node exists, or remove it.
    ///
    /// Removing a module that still holds resources fails with
    /// [`Error::ModuleNotEmpty`]; resources must be destroyed first.
    pub fn commit_module(&self, path: &ModulePath, exists: bool) -> Result<()> {
        let mut index = self.write_index();
        if exists {
            index.entry(path.clone()).or_default();
            return Ok(());
        }

        if let Some(module) = index.get(path) {
            let resources = lock_module(module).resources.len();
            if resources > 0 {
                return Err(Error::ModuleNotEmpty {
                    path: path.clone(),
                    resources,
                });
            }
            index.remove(path);
        }
        Ok(())
    }

    /// Record module-level dependencies, creating the module node if needed
    pub fn set_module_dependencies(&self, path: &ModulePath, dependencies: Vec<String>) {
        let mut index = self.write_index();
        let module = index.entry(path.clone()).or_default();
        lock_module(module).dependencies = dependencies;
    }

    /// Remove non-root modules with no resources, no recorded dependencies
    /// and no child modules.
    ///
    /// Returns the removed paths.
    pub fn prune(&self) -> Vec<ModulePath> {
        let mut index = self.write_index();
        let mut paths: Vec<ModulePath> = index.keys().cloned().collect();
        paths.sort_by(|a, b| b.depth().cmp(&a.depth()));

        let mut removed = Vec::new();
        for path in paths {
            if path.is_root() {
                continue;
            }
            let has_children = index.keys().any(|p| p.is_child_of(&path));
            let is_empty = index.get(&path).is_some_and(|m| {
                let module = lock_module(m);
                module.is_empty() && module.dependencies.is_empty()
            });
            if is_empty && !has_children {
                index.remove(&path);
                removed.push(path);
            }
        }

        if !removed.is_empty() {
            log::debug!("Pruned {} empty module(s) from state", removed.len());
        }
        removed
    }

    /// Total number of recorded resources
    pub fn resource_count(&self) -> usize {
        self.read_index()
            .values()
            .map(|m| lock_module(m).resources.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.resource_count() == 0
    }

    fn read_index(&self) -> RwLockReadGuard<'_, ModuleIndex> {
        match self.modules.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, ModuleIndex> {
        match self.modules.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Clone for State {
    fn clone(&self) -> Self {
        Self::from_snapshot(self.snapshot())
    }
}

fn lock_module(module: &Mutex<ModuleState>) -> MutexGuard<'_, ModuleState> {
    match module.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModuleConfig, ResourceConfig};
    use crate::types::Attributes;

    fn recorded(deps: &[&str]) -> ResourceState {
        ResourceState::new(
            Attributes::from([("id".to_string(), "x".to_string())]),
            deps.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn test_commit_and_lookup() {
        let state = State::new();
        let root = ModulePath::root();

        state.commit_resource(&root, "a", Some(recorded(&[])));
        state.commit_resource(&root, "b", Some(recorded(&["a"])));
        assert_eq!(state.resource_count(), 2);
        assert_eq!(state.resource(&root, "b").unwrap().dependencies, vec!["a"]);

        state.commit_resource(&root, "b", None);
        assert!(state.resource(&root, "b").is_none());

        // Removing from a missing module does not create it
        let missing = root.child("missing");
        state.commit_resource(&missing, "x", None);
        assert!(!state.contains_module(&missing));
    }

    #[test]
    fn test_orphans_against_config() {
        let state = State::new();
        let root = ModulePath::root();
        state.commit_resource(&root, "a", Some(recorded(&[])));
        state.commit_resource(&root, "b", Some(recorded(&["a"])));
        state.commit_resource(&root.child("network"), "subnet", Some(recorded(&[])));

        let config = ModuleConfig::new().with_resource("a", ResourceConfig::default());
        assert_eq!(state.orphans(&root, &config), vec!["b".to_string()]);
        assert_eq!(
            state.orphans(&root.child("network"), &config),
            vec!["subnet".to_string()]
        );
        assert_eq!(state.module_orphans(&root, &config), vec![root.child("network")]);
    }

    #[test]
    fn test_child_paths_through_missing_intermediate() {
        let state = State::new();
        let deep = ModulePath::root().child("a").child("b");
        state.commit_resource(&deep, "r", Some(recorded(&[])));

        assert_eq!(
            state.child_paths(&ModulePath::root()),
            vec![ModulePath::root().child("a")]
        );
        assert_eq!(state.subtree_paths(&ModulePath::root()), vec![deep]);
    }

    #[test]
    fn test_commit_module_refuses_non_empty() {
        let state = State::new();
        let net = ModulePath::root().child("network");
        state.commit_resource(&net, "subnet", Some(recorded(&[])));

        let err = state.commit_module(&net, false).unwrap_err();
        assert!(matches!(err, Error::ModuleNotEmpty { resources: 1, .. }));

        state.commit_resource(&net, "subnet", None);
        state.commit_module(&net, false).unwrap();
        assert!(!state.contains_module(&net));
    }

    #[test]
    fn test_prune_removes_empty_leaves_bottom_up() {
        let state = State::new();
        let a = ModulePath::root().child("a");
        let b = a.child("b");
        state.commit_module(&ModulePath::root(), true).unwrap();
        state.commit_module(&a, true).unwrap();
        state.commit_module(&b, true).unwrap();
        state.commit_resource(&ModulePath::root().child("keep"), "r", Some(recorded(&[])));

        let removed = state.prune();
        assert_eq!(removed, vec![b, a]);
        assert!(state.contains_module(&ModulePath::root()));
        assert!(state.contains_module(&ModulePath::root().child("keep")));
    }

    #[test]
    fn test_prune_keeps_modules_with_dependencies() {
        let state = State::new();
        let net = ModulePath::root().child("network");
        let dns = ModulePath::root().child("dns");
        state.set_module_dependencies(&net, vec!["vpc".into()]);
        state.commit_module(&dns, true).unwrap();

        assert_eq!(state.prune(), vec![dns]);
        assert!(state.contains_module(&net));
    }

    #[test]
    fn test_snapshot_roundtrip_through_json() {
        let state = State::new();
        let net = ModulePath::root().child("network");
        state.commit_resource(&net, "subnet", Some(recorded(&["vpc"])));
        state.set_module_dependencies(&net, vec!["aws_vpc.main".into()]);

        let json = serde_json::to_string(&state.snapshot()).unwrap();
        assert!(json.contains("\"path\":[\"root\",\"network\"]"));

        let restored = State::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.snapshot(), state.snapshot());
        assert_eq!(
            restored.module_state(&net).unwrap().dependencies,
            vec!["aws_vpc.main".to_string()]
        );
    }

    #[test]
    fn test_concurrent_commits_same_module() {
        let state = Arc::new(State::new());
        let root = ModulePath::root();

        std::thread::scope(|s| {
            for i in 0..8 {
                let state = Arc::clone(&state);
                let root = root.clone();
                s.spawn(move || {
                    for j in 0..50 {
                        state.commit_resource(&root, &format!("r{i}_{j}"), Some(recorded(&[])));
                    }
                });
            }
        });

        assert_eq!(state.resource_count(), 400);
    }
}
