//! `converge show` - print recorded state

use anyhow::Result;
use colored::Colorize;

use super::open_state;
use crate::Context;
use crate::cli::ShowArgs;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: ShowArgs) -> Result<()> {
    let (state_file, state_path) = open_state(ctx)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state_file)?);
        return Ok(());
    }

    ui::header("Recorded State");
    ui::kv("file", &state_path.display().to_string());
    ui::kv("serial", &state_file.serial.to_string());
    ui::kv(
        "last updated",
        &state_file
            .last_updated
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
    );

    render(&state_file);
    Ok(())
}

fn render(state_file: &StateFile) {
    let modules = &state_file.snapshot.modules;
    if modules.iter().all(|m| m.state.is_empty()) {
        println!();
        ui::info("No resources recorded");
        return;
    }

    for module in modules {
        ui::section(&module.path.to_string());
        if !module.state.dependencies.is_empty() {
            ui::dim(&format!("depends on {}", module.state.dependencies.join(", ")));
        }
        for (name, resource) in &module.state.resources {
            println!("  {}", name.bold());
            for (key, value) in &resource.attributes {
                println!("      {} = {:?}", key.dimmed(), value);
            }
            if !resource.dependencies.is_empty() {
                println!(
                    "      {} {}",
                    "depends on".dimmed(),
                    resource.dependencies.join(", ")
                );
            }
        }
    }
}
