//! dspace-migrate - Command line front end for the DSpace item migration.
//!
//! Every command loads the JSON run configuration, does its work against the
//! configured repositories and prints a one-line JSON summary on stdout.
//! Logs go to stderr.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dspace_migrate::{MigrateError, MigrationConfig};
use std::path::PathBuf;
use tracing::{debug, error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "dspace-migrate")]
#[command(version, about = "Migrate DSpace items into a target repository by title match")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate the source items holding a metadata value
    Migrate(commands::migrate::MigrateArgs),

    /// Export selected metadata fields of source items as CSV
    MetadataReport(commands::metadata_report::MetadataReportArgs),

    /// Rewrite destination handles from a CSV export
    UpdateHandles(commands::update_handles::UpdateHandlesArgs),

    /// Create the repository schema in an empty database
    InitSchema(commands::init_schema::InitSchemaArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(summary) => {
            // Machine-readable summary on stdout
            println!("{}", summary);
        }
        Err(e) => {
            error!("{}", render_error(&e));
            std::process::exit(exit_code(&e));
        }
    }
}

fn init_logging(debug: bool) {
    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact();

    // RUST_LOG wins over --debug when set
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        builder.with_env_filter(EnvFilter::from_default_env()).init();
    } else {
        let level = if debug { Level::DEBUG } else { Level::INFO };
        builder.with_max_level(level).init();
    }
}

fn load_config(path: Option<PathBuf>) -> Result<MigrationConfig> {
    let path = match path {
        Some(path) => path,
        None => MigrationConfig::default_path()?,
    };
    debug!("Loading configuration from {}", path.display());
    MigrationConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn run(cli: Cli) -> Result<serde_json::Value> {
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(args, &config),
        Commands::MetadataReport(args) => commands::metadata_report::execute(args, &config),
        Commands::UpdateHandles(args) => commands::update_handles::execute(args, &config),
        Commands::InitSchema(args) => commands::init_schema::execute(args, &config),
    }
}

/// Library errors keep their own exit code; anything else exits with 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<MigrateError>()
        .map(MigrateError::exit_code)
        .unwrap_or(1)
}

/// Join the error chain, skipping causes already spelled out by an outer error.
fn render_error(err: &anyhow::Error) -> String {
    let mut rendered = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
    }
    rendered
}
