#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Context;
use output::{OutputMode, classify_failure, render_error};
use std::env;
use std::process::ExitCode;
use stockroom_core::config;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "stockroom: track where every item is, and where it has been",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (id or username); overrides `STOCKROOM_USER`.
    #[arg(long = "as", value_name = "USER", global = true)]
    acting_as: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a stockroom project",
        long_about = "Create .stockroom/ with a default config and an empty, migrated store.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    sr init\n\n    # Reset the project config to defaults\n    sr init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Manage locations",
        after_help = "EXAMPLES:\n    # Add a location\n    sr location add \"Back room\" -d \"behind the counter\"\n\n    # List active locations\n    sr location list"
    )]
    Location {
        #[command(subcommand)]
        command: cmd::location::LocationCommand,
    },

    #[command(
        next_help_heading = "Setup",
        about = "Manage users",
        after_help = "EXAMPLES:\n    # Add a user\n    sr user add ada --name \"Ada Admin\"\n\n    # List users\n    sr user list --json"
    )]
    User {
        #[command(subcommand)]
        command: cmd::user::UserCommand,
    },

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create an item",
        long_about = "Create an item at its first location and record a `created` event.",
        after_help = "EXAMPLES:\n    # Create an item on a shelf\n    sr --as ada create -r REF-1 -g XYZ --at \"Shelf 1\"\n\n    # With an asset tag\n    sr create -r REF-2 -g XYZ --at \"Shelf 1\" -i INV-0042"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Move an item",
        long_about = "Record that an item moved to a location, or was handed to a user.",
        after_help = "EXAMPLES:\n    # Move to another location\n    sr track INV-0042 --to \"Back room\"\n\n    # Hand to a person\n    sr track INV-0042 --to-user una"
    )]
    Track(cmd::track::TrackArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Update item fields",
        long_about = "Change reference, group or description. Only changed fields are recorded.",
        after_help = "EXAMPLES:\n    # Regroup an item\n    sr update INV-0042 --group ABC\n\n    # Clear the description\n    sr update INV-0042 --description \"\""
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Soft-delete an item",
        long_about = "Mark an item deleted. Its history is kept and it can be restored."
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Restore a deleted item"
    )]
    Restore(cmd::delete::RestoreArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one item",
        long_about = "Show an item with its current location or holder.",
        after_help = "EXAMPLES:\n    # By identifier\n    sr show INV-0042\n\n    # Machine-readable\n    sr show INV-0042 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "List items",
        long_about = "List items, newest first, with optional group and position filters.",
        after_help = "EXAMPLES:\n    # Everything in a group\n    sr list --group XYZ\n\n    # What is in the back room\n    sr list --location \"Back room\"\n\n    # Include deleted items\n    sr list --all"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "List item groups",
        after_help = "EXAMPLES:\n    # Groups containing \"xy\"\n    sr groups xy\n\n    # Fail unless an active item is in group XYZ\n    sr groups --exists XYZ"
    )]
    Groups(cmd::groups::GroupsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show an item's history",
        long_about = "Show every recorded event for an item, newest first."
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Read",
        about = "Export an item's history as CSV",
        after_help = "EXAMPLES:\n    # To stdout\n    sr export INV-0042\n\n    # To a file\n    sr export INV-0042 -o inv-0042.csv"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STOCKROOM_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "stockroom=debug,info"
        } else {
            "stockroom=info,warn"
        })
    });

    let format = env::var("STOCKROOM_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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

/// Build the command context: project root, config, output mode.
///
/// `sr init` works on the current directory; every other command finds the
/// nearest enclosing project.
fn load_context(cli: &Cli) -> anyhow::Result<Context> {
    let cwd = env::current_dir()?;
    let root = if matches!(cli.command, Commands::Init(_)) {
        cwd
    } else {
        cmd::find_project_root(&cwd).unwrap_or(cwd)
    };
    let config = config::resolve_config(&root, cli.json)?;
    debug!(root = %root.display(), output = %config.resolved_output, "resolved context");
    Ok(Context {
        output: OutputMode::from_resolved(&config.resolved_output),
        root,
        config,
        acting_as: cli.acting_as.clone(),
    })
}

fn dispatch(cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, ctx),
        Commands::Location { command } => cmd::location::run_location(command, ctx),
        Commands::User { command } => cmd::user::run_user(command, ctx),
        Commands::Create(args) => cmd::create::run_create(args, ctx),
        Commands::Track(args) => cmd::track::run_track(args, ctx),
        Commands::Update(args) => cmd::update::run_update(args, ctx),
        Commands::Delete(args) => cmd::delete::run_delete(args, ctx),
        Commands::Restore(args) => cmd::delete::run_restore(args, ctx),
        Commands::Show(args) => cmd::show::run_show(args, ctx),
        Commands::List(args) => cmd::list::run_list(args, ctx),
        Commands::Groups(args) => cmd::groups::run_groups(args, ctx),
        Commands::History(args) => cmd::history::run_history(args, ctx),
        Commands::Export(args) => cmd::export::run_export(args, ctx),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

/// Render a failure and turn it into the process exit status.
fn fail(mode: OutputMode, err: &anyhow::Error) -> ExitCode {
    let (body, status) = classify_failure(err);
    debug!(error = %format!("{err:#}"), status, "command failed");
    if render_error(mode, &body).is_err() {
        eprintln!("error: {}", body.message);
    }
    ExitCode::from(status)
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let fallback = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let ctx = match load_context(&cli) {
        Ok(ctx) => ctx,
        Err(err) => return fail(fallback, &err),
    };

    match dispatch(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(ctx.output, &err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use output::CliError;

    #[test]
    fn json_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["sr", "--json", "list"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["sr", "list", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn as_flag_parsed_anywhere() {
        let cli = Cli::parse_from(["sr", "--as", "ada", "delete", "INV-1"]);
        assert_eq!(cli.acting_as.as_deref(), Some("ada"));

        let cli = Cli::parse_from(["sr", "delete", "INV-1", "--as", "ada"]);
        assert_eq!(cli.acting_as.as_deref(), Some("ada"));
    }

    #[test]
    fn as_flag_none_by_default() {
        let cli = Cli::parse_from(["sr", "list"]);
        assert!(cli.acting_as.is_none());
    }

    #[test]
    fn location_subcommands_parse() {
        let cli = Cli::parse_from(["sr", "location", "add", "Shelf 1"]);
        assert!(matches!(
            cli.command,
            Commands::Location {
                command: cmd::location::LocationCommand::Add(_)
            }
        ));
        let cli = Cli::parse_from(["sr", "location", "list", "--all"]);
        assert!(matches!(
            cli.command,
            Commands::Location {
                command: cmd::location::LocationCommand::List(_)
            }
        ));
    }

    #[test]
    fn user_list_parses() {
        let cli = Cli::parse_from(["sr", "user", "list"]);
        assert!(matches!(
            cli.command,
            Commands::User {
                command: cmd::user::UserCommand::List
            }
        ));
    }

    #[test]
    fn track_subcommand_parses() {
        let cli = Cli::parse_from(["sr", "track", "INV-1", "--to", "L2"]);
        assert!(matches!(cli.command, Commands::Track(_)));
    }

    #[test]
    fn export_output_flag_parses() {
        let cli = Cli::parse_from(["sr", "export", "INV-1", "-o", "out.csv"]);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.csv")));
            }
            other => panic!("expected export, got {other:?}"),
        }
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["sr", "completions", "bash"]);
        assert!(matches!(cli.command, Commands::Completions(_)));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn missing_user_error_is_client_failure() {
        let err = anyhow::Error::new(CliError::new("no acting user"));
        let (_, status) = classify_failure(&err);
        assert_eq!(status, output::EXIT_CLIENT);
    }
}
