use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

/// Skyline project compiler.
///
/// Generates the runtime artifacts of a Skyline project (application data
/// skeleton, merged configuration, entry-point script, protection files) by
/// running compiler units in dependency order.
///
/// EXAMPLES:
///     skyline compile                  Compile the project in the current directory
///     skyline compile --dev            Compile for development
///     skyline order                    Show the resolved compiler order
///     skyline sources '\.php$'         List PHP sources of the default banks
///
/// ENVIRONMENT VARIABLES:
///     SKYLINE_DEBUG       Set to '1' to compile for development
///     SKYLINE_TEST        Set to '1' to compile for testing
///     SKYLINE_ZERO_LINKS  Set to '1' to emit absolute paths
///     SKYLINE_OUTPUT      Set to 'json' for JSON output by default
///     NO_COLOR            Set to disable colored output
#[derive(Parser)]
#[command(name = "skyline")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Skyline project
    ///
    /// Resolves every registered compiler into one dependency order and runs
    /// them. The process exits with a non-zero status when the run aborts.
    ///
    /// EXAMPLES:
    ///     skyline compile --project-dir ../shop
    ///     skyline compile --only create-directories --only entry-point
    #[command(visible_alias = "c")]
    Compile {
        /// Project directory (defaults to the current directory)
        #[arg(long, short = 'p')]
        project_dir: Option<PathBuf>,
        /// Compile for development
        #[arg(long)]
        dev: bool,
        /// Compile for testing
        #[arg(long)]
        test: bool,
        /// Emit absolute paths instead of relative links
        #[arg(long)]
        zero: bool,
        /// Only run the compilers with these ids
        #[arg(long, value_name = "ID")]
        only: Vec<String>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved compiler order without running it
    Order {
        /// Project directory (defaults to the current directory)
        #[arg(long, short = 'p')]
        project_dir: Option<PathBuf>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// List discovered source files
    ///
    /// EXAMPLES:
    ///     skyline sources
    ///     skyline sources '(?i)\.json$' --bank config
    Sources {
        /// Regex matched against file base names
        pattern: Option<String>,
        /// Banks to search (defaults to sources, vendor, classes and modules)
        #[arg(long, value_name = "NAME")]
        bank: Vec<String>,
        /// Sort by composer package precedence
        #[arg(long)]
        package_order: bool,
        /// Project directory (defaults to the current directory)
        #[arg(long, short = 'p')]
        project_dir: Option<PathBuf>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    init_logging(cli.verbose);
    if cli_config.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Compile {
            project_dir,
            dev,
            test,
            zero,
            only,
            json,
        } => {
            let args = commands::compile::CompileArgs {
                project: commands::ProjectArgs {
                    project_dir,
                    dev,
                    test,
                    zero_links: zero,
                },
                only,
                json: json || cli_config.default_json,
            };
            commands::compile::run(args)?;
        }
        Commands::Order { project_dir, json } => {
            let project = commands::ProjectArgs {
                project_dir,
                ..Default::default()
            };
            commands::order::run(&project, json || cli_config.default_json)?;
        }
        Commands::Sources {
            pattern,
            bank,
            package_order,
            project_dir,
            json,
        } => {
            let args = commands::sources::SourcesArgs {
                project: commands::ProjectArgs {
                    project_dir,
                    ..Default::default()
                },
                pattern,
                banks: bank,
                package_order,
                json: json || cli_config.default_json,
            };
            commands::sources::run(args)?;
        }
    }

    Ok(())
}
