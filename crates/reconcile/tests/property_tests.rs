//! Property-based tests for graph construction invariants.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use proptest::prelude::*;

use reconcile::{
    Attributes, GraphBuilder, ModuleConfig, ModulePath, ResourceConfig, ResourceState, State,
    VertexKind,
};

/// Resource names drawn from a small pool so that config and state overlap
fn arb_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("r[0-9]{1,2}", 0..12)
}

/// A configuration whose dependencies only point at earlier resources
fn arb_acyclic_config() -> impl Strategy<Value = ModuleConfig> {
    let deps = prop::collection::vec(any::<prop::sample::Index>(), 0..3);
    prop::collection::vec(deps, 1..15).prop_map(|resources| {
        let mut config = ModuleConfig::new();
        for (i, deps) in resources.iter().enumerate() {
            let depends_on: Vec<String> = if i == 0 {
                Vec::new()
            } else {
                deps.iter().map(|d| format!("r{}", d.index(i))).collect()
            };
            let resource = ResourceConfig::default().depends_on(depends_on);
            config = config.with_resource(&format!("r{i}"), resource);
        }
        config
    })
}

proptest! {
    /// Every recorded, undeclared resource yields exactly one orphan; nothing else does.
    #[test]
    fn prop_orphan_completeness(
        declared in arb_names(),
        recorded in arb_names(),
        nested_declared in arb_names(),
        nested_recorded in arb_names(),
    ) {
        let net = ModulePath::root().child("network");
        let mut network = ModuleConfig::new();
        for name in &nested_declared {
            network = network.with_resource(name, ResourceConfig::default());
        }
        let mut config = ModuleConfig::new().with_module("network", network);
        for name in &declared {
            config = config.with_resource(name, ResourceConfig::default());
        }

        let state = State::new();
        for name in &recorded {
            let recorded = ResourceState::new(Attributes::new(), vec![]);
            state.commit_resource(&ModulePath::root(), name, Some(recorded));
        }
        for name in &nested_recorded {
            state.commit_resource(&net, name, Some(ResourceState::new(Attributes::new(), vec![])));
        }

        let graph = GraphBuilder::new(&config, &state).build().unwrap();
        let orphans: BTreeSet<String> = graph
            .vertices()
            .filter(|v| v.kind() == VertexKind::OrphanResource)
            .map(|v| v.dependable_name())
            .collect();

        let expected: BTreeSet<String> = recorded
            .difference(&declared)
            .cloned()
            .chain(nested_recorded.difference(&nested_declared).map(|n| net.qualify(n)))
            .collect();
        prop_assert_eq!(orphans, expected);
    }

    /// Orphans that depend on each other are wired, whatever order they were found in.
    #[test]
    fn prop_orphan_chain_is_wired(len in 2usize..10) {
        let state = State::new();
        for i in 0..len {
            let deps = if i == 0 { vec![] } else { vec![format!("o{}", i - 1)] };
            let recorded = ResourceState::new(Attributes::new(), deps);
            state.commit_resource(&ModulePath::root(), &format!("o{i}"), Some(recorded));
        }

        let config = ModuleConfig::new();
        let graph = GraphBuilder::new(&config, &state).build().unwrap();
        prop_assert_eq!(graph.edge_count(), len - 1);
        for i in 1..len {
            prop_assert_eq!(
                graph.dependencies_of(&format!("o{i} (orphan)")),
                vec![format!("o{} (orphan)", i - 1)]
            );
        }
    }

    /// Orphan modules depending on other orphan modules are wired in either direction.
    #[test]
    fn prop_orphan_module_chain_is_wired(len in 2usize..8, forward in any::<bool>()) {
        let root = ModulePath::root();
        let dependency = |i: usize| {
            let dep = if forward { Some(i + 1) } else { i.checked_sub(1) };
            dep.filter(|&d| d < len)
        };

        let state = State::new();
        for i in 0..len {
            let module = root.child(&format!("m{i}"));
            let recorded = ResourceState::new(Attributes::new(), vec![]);
            state.commit_resource(&module, "r", Some(recorded));
            if let Some(dep) = dependency(i) {
                state.set_module_dependencies(&module, vec![format!("module.m{dep}")]);
            }
        }

        let graph = GraphBuilder::new(&ModuleConfig::new(), &state).build().unwrap();
        prop_assert_eq!(graph.len(), len);
        prop_assert_eq!(graph.edge_count(), len - 1);
        for i in 0..len {
            let expected: Vec<String> =
                dependency(i).map(|d| format!("module.m{d} (orphan)")).into_iter().collect();
            prop_assert_eq!(graph.dependencies_of(&format!("module.m{i} (orphan)")), expected);
        }
    }

    /// Acyclic configurations always produce a valid graph.
    #[test]
    fn prop_acyclic_config_builds(config in arb_acyclic_config()) {
        let state = State::new();
        let graph = GraphBuilder::new(&config, &state).build();
        prop_assert!(graph.is_ok());
        prop_assert_eq!(graph.unwrap().len(), config.resource_count());
    }
}
