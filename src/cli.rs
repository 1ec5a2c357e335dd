use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile declared configuration against recorded state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: <config dir>/main.toml)
    #[arg(long, global = true, env = "CONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// State file (default: <state dir>/state.toml)
    #[arg(long, global = true, env = "CONVERGE_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change, without changing anything
    Plan(PlanArgs),

    /// Make recorded state match the configuration
    Apply(ApplyArgs),

    /// Print the dependency graph
    Graph(GraphArgs),

    /// Show recorded state
    Show(ShowArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Limit the run to these vertices and their dependencies
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Limit the run to these vertices and their dependencies
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Limit the graph to these vertices and their dependencies
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: GraphFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// One vertex per line with its dependencies
    Text,
    /// Graphviz dot
    Dot,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Print the state as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_args() {
        let cli = Cli::try_parse_from([
            "converge", "-vv", "apply", "--yes", "-t", "a", "-t", "module.net", "--jobs", "2",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert!(args.yes);
                assert_eq!(args.jobs, 2);
                assert_eq!(args.targets, vec!["a", "module.net"]);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_global_paths() {
        let cli =
            Cli::try_parse_from(["converge", "plan", "--config", "c.toml", "--state", "s.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert_eq!(cli.state, Some(PathBuf::from("s.toml")));
    }

    #[test]
    fn test_graph_format_default() {
        let cli = Cli::try_parse_from(["converge", "graph"]).unwrap();
        match cli.command {
            Command::Graph(args) => assert_eq!(args.format, GraphFormat::Text),
            _ => panic!("expected graph"),
        }
    }
}
