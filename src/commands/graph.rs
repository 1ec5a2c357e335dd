//! `converge graph` - print the dependency graph

use anyhow::Result;
use reconcile::Graph;

use super::Workspace;
use crate::Context;
use crate::cli::{GraphArgs, GraphFormat};

pub fn run(ctx: &Context, args: GraphArgs) -> Result<()> {
    let workspace = Workspace::open(ctx)?;
    let state = workspace.state_file.to_state();
    let graph = workspace.graph(&state, &args.targets)?;

    let rendered = match args.format {
        GraphFormat::Text => render_text(&graph),
        GraphFormat::Dot => render_dot(&graph),
    };
    print!("{}", rendered);
    Ok(())
}

/// One line per vertex followed by the vertices it waits for
pub fn render_text(graph: &Graph) -> String {
    let mut out = String::new();
    for name in graph.names() {
        let kind = graph
            .vertex(&name)
            .map(|v| v.kind().to_string())
            .unwrap_or_default();
        out.push_str(&format!("{} [{}]\n", name, kind));
        for dep in graph.dependencies_of(&name) {
            out.push_str(&format!("  -> {}\n", dep));
        }
    }
    out
}

/// Graphviz rendering; orphans are drawn dashed
pub fn render_dot(graph: &Graph) -> String {
    let mut out = String::from("digraph {\n  rankdir = \"RL\"\n");
    for vertex in graph.vertices() {
        let style = if vertex.kind().is_orphan() {
            ", style = \"dashed\""
        } else {
            ""
        };
        out.push_str(&format!(
            "  {:?} [label = {:?}{}]\n",
            vertex.name(),
            vertex.name(),
            style
        ));
    }
    for (from, to) in graph.edges() {
        out.push_str(&format!("  {:?} -> {:?}\n", from, to));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{
        Attributes, GraphBuilder, ModuleConfig, ModulePath, ResourceConfig, ResourceState, State,
    };

    fn sample() -> Graph {
        let config = ModuleConfig::new()
            .with_resource("a", ResourceConfig::default())
            .with_resource("b", ResourceConfig::default().depends_on(["a"]));
        let state = State::new();
        state.commit_resource(
            &ModulePath::root(),
            "old",
            Some(ResourceState::new(Attributes::new(), vec!["a".to_string()])),
        );
        GraphBuilder::new(&config, &state).build().unwrap()
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&sample());
        assert_eq!(
            text,
            "a [resource]\nb [resource]\n  -> a\nold (orphan) [orphan resource]\n  -> a\n"
        );
    }

    #[test]
    fn test_render_dot() {
        let dot = render_dot(&sample());
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.contains("\"b\" -> \"a\"\n"));
        assert!(dot.contains("\"old (orphan)\" -> \"a\"\n"));
        assert!(dot.contains("[label = \"old (orphan)\", style = \"dashed\"]"));
        assert!(dot.ends_with("}\n"));
    }
}
