#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::ActorOverrides;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use relgraph_core::config::resolve_config;
use std::env;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "relg: typed relationships between governance records",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json and FORMAT).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Act as this user id instead of the configured one.
    #[arg(long, global = true, value_name = "ID")]
    user: Option<i64>,

    /// Act as a trusted external application.
    #[arg(long)]
    external: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn actor_overrides(&self) -> ActorOverrides {
        ActorOverrides {
            user: self.user,
            external: self.external,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a relgraph project",
        long_about = "Create .relgraph/ in the current directory and migrate the store.",
        after_help = "EXAMPLES:\n    relg init\n\n    # Reset config.toml to the template\n    relg init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Objects",
        about = "Add, show, list, or delete objects",
        after_help = "EXAMPLES:\n    relg object add Control 1 --title \"Access review\"\n    relg object add Snapshot 9 --child Control#1\n    relg object show Control#1\n    relg object rm Control#1"
    )]
    Object(cmd::object::ObjectArgs),

    #[command(
        next_help_heading = "Relationships",
        about = "Map two objects",
        after_help = "EXAMPLES:\n    relg map Control#1 Objective#2\n\n    # As an integration, which may map restricted pairs\n    relg --external map Control#1 Regulation#3"
    )]
    Map(cmd::map::MapArgs),

    #[command(
        next_help_heading = "Relationships",
        about = "Delete a relationship by id"
    )]
    Unmap(cmd::map::UnmapArgs),

    #[command(
        next_help_heading = "Relationships",
        about = "List relationships by endpoint type and id",
        after_help = "EXAMPLES:\n    relg edges --type1 Control --id1 1 --type2 Objective"
    )]
    Edges(cmd::edges::EdgesArgs),

    #[command(
        next_help_heading = "Read",
        about = "Objects related to an object",
        after_help = "EXAMPLES:\n    relg related Control#1\n    relg related Control#1 --type Risk --type Issue"
    )]
    Related(cmd::related::RelatedArgs),

    #[command(
        next_help_heading = "Read",
        about = "Neighbor sets for many objects in one query",
        after_help = "EXAMPLES:\n    relg neighbors Control#1 Control#2 --type Risk"
    )]
    Neighbors(cmd::neighbors::NeighborsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Check whether a type pair may be mapped",
        after_help = "EXAMPLES:\n    relg check Control Regulation\n    relg --external check Control Regulation"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        next_help_heading = "Jobs",
        about = "Track import/export jobs"
    )]
    Jobs(cmd::jobs::JobsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RELGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "relgraph_core=debug,relg=debug,info"
        } else {
            "relgraph_core=info,relg=info,warn"
        })
    });

    let format = env::var("RELGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let fallback = resolve_output_mode(cli.format, if cli.json { "json" } else { "text" });
    let result = env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|root| resolve_config(&root, cli.json).map(|cfg| (root, cfg)));
    let (project_root, effective) = match result {
        Ok(pair) => pair,
        Err(err) => return fail(fallback, &err),
    };

    let output = resolve_output_mode(cli.format, &effective.resolved_output);
    let config = &effective.project;
    let overrides = cli.actor_overrides();

    let command_result = match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Object(args) => {
            cmd::object::run_object(args, output, &project_root, config, overrides)
        }
        Commands::Map(args) => cmd::map::run_map(args, output, &project_root, config, overrides),
        Commands::Unmap(args) => {
            cmd::map::run_unmap(args, output, &project_root, config, overrides)
        }
        Commands::Edges(args) => {
            cmd::edges::run_edges(args, output, &project_root, config, overrides)
        }
        Commands::Related(args) => {
            cmd::related::run_related(args, output, &project_root, config, overrides)
        }
        Commands::Neighbors(args) => {
            cmd::neighbors::run_neighbors(args, output, &project_root, config, overrides)
        }
        Commands::Check(args) => cmd::check::run_check(args, output, config, overrides),
        Commands::Jobs(args) => cmd::jobs::run_jobs(args, output, &project_root, config, overrides),
    };

    match command_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(output, &err),
    }
}

fn fail(output: OutputMode, err: &anyhow::Error) -> ExitCode {
    tracing::debug!(error = %format!("{err:#}"), "command failed");
    if let Err(render_err) = render_error(output, &CliError::from(err)) {
        eprintln!("error: {err:#} (while rendering: {render_err})");
    }
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use relgraph_core::Stub;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["relg", "related", "Control#1", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Related(_)));
    }

    #[test]
    fn format_flag_accepts_value_enum() {
        let cli = Cli::parse_from(["relg", "--format", "pretty", "check", "A", "B"]);
        assert_eq!(cli.format, Some(OutputMode::Pretty));
    }

    #[test]
    fn actor_flags_feed_overrides() {
        let cli = Cli::parse_from(["relg", "--external", "--user", "42", "check", "A", "B"]);
        let overrides = cli.actor_overrides();
        assert_eq!(overrides.user, Some(42));
        assert!(overrides.external);
    }

    #[test]
    fn map_parses_stubs_and_edge_flag() {
        let cli = Cli::parse_from(["relg", "map", "Control#1", "Issue:2", "--external"]);
        let Commands::Map(args) = cli.command else {
            panic!("expected map");
        };
        assert_eq!(args.source, Stub::new("Control", 1));
        assert_eq!(args.destination, Stub::new("Issue", 2));
        assert!(args.external);
        assert!(!cli.external);
    }

    #[test]
    fn malformed_stub_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["relg", "related", "Control"]);
        assert!(result.is_err());
    }

    #[test]
    fn neighbors_requires_at_least_one_stub() {
        assert!(Cli::try_parse_from(["relg", "neighbors"]).is_err());
        let cli = Cli::parse_from(["relg", "neighbors", "Risk#5", "Control#9", "--type", "Risk"]);
        let Commands::Neighbors(args) = cli.command else {
            panic!("expected neighbors");
        };
        assert_eq!(args.stubs.len(), 2);
        assert_eq!(args.types, vec!["Risk".to_string()]);
    }

    #[test]
    fn job_status_accepts_kebab_case() {
        let cli = Cli::parse_from(["relg", "jobs", "status", "3", "in-progress"]);
        let Commands::Jobs(args) = cli.command else {
            panic!("expected jobs");
        };
        assert!(matches!(
            args.command,
            cmd::jobs::JobsCommand::Status {
                id: 3,
                status: relgraph_core::jobs::JobStatus::InProgress
            }
        ));
    }
}
