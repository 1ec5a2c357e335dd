use colored::{ColoredString, Colorize};
use reconcile::{Action, DiffSummary, ExecuteSummary, ResourceChange, VertexError, VertexOutcome};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{}/{}]", num, total).blue().bold(), msg);
}

// ============================================================================
// Plan and Report Rendering
// ============================================================================

/// Colored symbol for a change action
pub fn action_symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Destroy => action.symbol().red(),
        Action::NoOp => action.symbol().dimmed(),
    }
}

/// Colored symbol for a vertex outcome
pub fn outcome_symbol(outcome: &VertexOutcome) -> ColoredString {
    match outcome {
        VertexOutcome::Applied { .. } | VertexOutcome::Planned { .. } => "✓".green(),
        VertexOutcome::Skipped => "○".dimmed(),
        VertexOutcome::Failed { .. } => "✗".red(),
        VertexOutcome::Blocked { .. } => "⊘".yellow(),
        VertexOutcome::Cancelled => "⊘".dimmed(),
    }
}

/// Print one resource change with its attribute-level details
pub fn change(change: &ResourceChange) {
    let action = change.action();
    println!(
        "  {} {} {}",
        action_symbol(action),
        change.address.bold(),
        format!("({})", action).dimmed()
    );

    for (key, attr) in &change.diff.attributes {
        let line = match (&attr.old, &attr.new) {
            (None, Some(new)) => format!("{} = {:?}", key, new),
            (Some(old), None) => format!("{} = {:?}", key, old),
            (Some(old), Some(new)) => format!("{} = {:?} → {:?}", key, old, new),
            (None, None) => continue,
        };
        println!("      {}", line.dimmed());
    }
}

/// Print the one-line plan total
pub fn plan_totals(summary: &DiffSummary) {
    println!();
    println!(
        "Plan: {} to add, {} to change, {} to destroy.",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
}

/// Print vertex failures and why other vertices did not run
pub fn errors(errors: &[VertexError], blocked: &[(&str, &str)]) {
    if errors.is_empty() && blocked.is_empty() {
        return;
    }
    section("Errors");
    for err in errors {
        error(&format!("{} [{}]: {}", err.vertex, err.step, err.message));
    }
    for (name, by) in blocked {
        dim(&format!("{} not run: depends on failed {}", name, by));
    }
}

/// Print final apply summary
pub fn apply_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "vertices".red());
    }
    if summary.blocked > 0 {
        println!("    • {} vertices blocked", summary.blocked);
    }
    if summary.cancelled > 0 {
        println!("    • {} vertices cancelled", summary.cancelled);
    }
}
