//! Command implementations
//!
//! Every command loads the same inputs: the configuration tree and the
//! state file. Only `apply` writes state back.

pub mod apply;
pub mod graph;
pub mod plan;
pub mod show;

use anyhow::{Context as AnyhowContext, Result};
use reconcile::{
    ExecuteSummary, Graph, GraphBuilder, ModuleConfig, Operation, State, VertexError,
    VertexOutcome, WalkReport,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::Context;
use crate::config;
use crate::paths;
use crate::state::StateFile;
use crate::ui;

/// Inputs of one run
pub struct Workspace {
    pub config: ModuleConfig,
    pub state_file: StateFile,
    pub state_path: PathBuf,
}

impl Workspace {
    /// Load configuration and state for the paths in `ctx`
    pub fn open(ctx: &Context) -> Result<Self> {
        let config_path = paths::config_file(ctx.config_path.as_deref())?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
        let (state_file, state_path) = open_state(ctx)?;
        Ok(Self {
            config,
            state_file,
            state_path,
        })
    }

    /// Build the validated dependency graph against `state`
    pub fn graph(&self, state: &State, targets: &[String]) -> Result<Graph> {
        let graph = GraphBuilder::new(&self.config, state)
            .with_targets(targets.to_vec())
            .build()
            .context("Failed to build dependency graph")?;
        log::info!(
            "Graph has {} vertices and {} edges",
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

/// Load only the state file
pub fn open_state(ctx: &Context) -> Result<(StateFile, PathBuf)> {
    let state_path = paths::state_file(ctx.state_path.as_deref())?;
    let state_file = StateFile::load(&state_path)?;
    Ok((state_file, state_path))
}

/// Machine-readable walk report
#[derive(Serialize)]
struct JsonReport<'a> {
    operation: Operation,
    success: bool,
    summary: &'a ExecuteSummary,
    outcomes: &'a BTreeMap<String, VertexOutcome>,
    errors: Vec<VertexError>,
}

pub fn print_json(report: &WalkReport, operation: Operation) -> Result<()> {
    let json = JsonReport {
        operation,
        success: report.is_success(),
        summary: &report.summary,
        outcomes: &report.outcomes,
        errors: report.errors(),
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Print the failures of a walk and turn them into an error
pub fn finish(report: WalkReport) -> Result<()> {
    {
        let blocked: Vec<(&str, &str)> = report
            .outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                VertexOutcome::Blocked { by } => Some((name.as_str(), by.as_str())),
                _ => None,
            })
            .collect();
        ui::errors(&report.errors(), &blocked);
    }
    report.into_result()?;
    Ok(())
}
