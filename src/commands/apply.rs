//! `converge apply` - make recorded state match the configuration

use anyhow::{Result, bail};
use colored::Colorize;
use reconcile::{
    Action, CancelToken, ExecuteOptions, Operation, VertexOutcome, WalkObserver, walk, walk_simple,
};

use super::{Workspace, finish, plan, print_json};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::provider;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    if args.json && !args.yes {
        bail!("--json output cannot prompt for confirmation; pass --yes");
    }

    let mut workspace = Workspace::open(ctx)?;
    let state = workspace.state_file.to_state();
    let graph = workspace.graph(&state, &args.targets)?;
    let providers = provider::context();
    let jobs = usize::from(args.jobs);

    if !args.json {
        let preview = walk_simple(
            &graph,
            &state,
            &providers,
            &ExecuteOptions::plan().with_jobs(jobs),
        )?;
        let pending = plan::render(&preview);
        if !preview.is_success() {
            return finish(preview);
        }
        if pending == 0 {
            return Ok(());
        }
        let destroys = preview
            .changes()
            .iter()
            .filter(|c| c.action() == Action::Destroy)
            .count();
        println!();
        if destroys > 0 {
            ui::warn(&format!("{} resources will be destroyed", destroys));
        }
        if !args.yes && !confirm_proceed()? {
            ui::info("Apply cancelled");
            return Ok(());
        }
    }

    let opts = ExecuteOptions::default().with_jobs(jobs);
    let mut progress = Progress::new(ctx.quiet || args.json, ctx.verbose > 0);
    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel);
    let report = walk(&graph, &state, &providers, &opts, &mut progress, &cancel)?;

    for path in state.prune() {
        log::info!("Pruned empty module {}", path);
    }
    if workspace.state_file.update_from(&state) {
        workspace.state_file.save(&workspace.state_path)?;
        log::info!(
            "State serial {} written to {}",
            workspace.state_file.serial,
            workspace.state_path.display()
        );
    }

    let cancelled = report.summary.cancelled;
    if args.json {
        print_json(&report, Operation::Apply)?;
        report.into_result()?;
    } else {
        ui::apply_summary(&report.summary);
        finish(report)?;
    }

    if cancelled > 0 {
        bail!("Apply interrupted; {} vertices were not run", cancelled);
    }
    Ok(())
}

/// Stop dispatching on Ctrl-C so running vertices finish and state is saved.
/// A second Ctrl-C exits at once.
fn install_interrupt_handler(cancel: &CancelToken) {
    let token = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if interrupt(&token) {
            ui::error("Interrupted again, exiting without saving state");
            std::process::exit(130);
        }
        ui::warn("Interrupted, waiting for running operations to finish...");
    });
    if let Err(e) = installed {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }
}

/// Cancel the walk; returns whether it was already cancelled
fn interrupt(token: &CancelToken) -> bool {
    let again = token.is_cancelled();
    token.cancel();
    again
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Apply these changes?")
        .default(false)
        .interact()?;

    Ok(confirmed)
}

/// Prints one line per finished vertex
struct Progress {
    quiet: bool,
    /// Also print when a vertex starts
    verbose: bool,
    total: usize,
    done: usize,
}

impl Progress {
    fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            total: 0,
            done: 0,
        }
    }
}

impl WalkObserver for Progress {
    fn on_walk_start(&mut self, total: usize) {
        self.total = total;
        if !self.quiet {
            ui::section(&format!("Applying {} vertices", total));
        }
    }

    fn on_vertex_start(&mut self, name: &str) {
        log::debug!("Started {}", name);
        if self.verbose && !self.quiet {
            ui::dim(&format!("started {}", name));
        }
    }

    fn on_vertex_complete(&mut self, name: &str, outcome: &VertexOutcome) {
        self.done += 1;
        if self.quiet {
            return;
        }

        let detail = match outcome {
            VertexOutcome::Applied { changes } => changes
                .iter()
                .map(|c| c.action().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            VertexOutcome::Blocked { by } => format!("blocked by {}", by),
            other => other.label().to_string(),
        };
        ui::step(
            self.done,
            self.total,
            &format!("{} {} {}", ui::outcome_symbol(outcome), name, detail.dimmed()),
        );
    }

    fn on_walk_complete(&mut self) {
        log::debug!("Walk finished after {} vertices", self.done);
    }
}
