//! `converge plan` - show what apply would change

use anyhow::Result;
use reconcile::{DiffSummary, ExecuteOptions, Operation, WalkReport, walk_simple};

use super::{Workspace, finish, print_json};
use crate::Context;
use crate::cli::PlanArgs;
use crate::provider;
use crate::ui;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let workspace = Workspace::open(ctx)?;
    let state = workspace.state_file.to_state();
    let graph = workspace.graph(&state, &args.targets)?;

    let opts = ExecuteOptions::plan().with_jobs(usize::from(args.jobs));
    let report = walk_simple(&graph, &state, &provider::context(), &opts)?;

    if args.json {
        print_json(&report, Operation::Plan)?;
        report.into_result()?;
        return Ok(());
    }

    render(&report);
    finish(report)
}

/// Print the changes a plan walk computed; returns how many there are
pub fn render(report: &WalkReport) -> usize {
    let changes = report.changes();
    if changes.is_empty() {
        if report.is_success() {
            ui::success("No changes. Recorded state matches the configuration.");
        }
        return 0;
    }

    ui::header("Execution Plan");
    for change in &changes {
        ui::change(change);
    }
    let summary = DiffSummary::from_changes(changes.iter().copied());
    ui::plan_totals(&summary);
    summary.total()
}
