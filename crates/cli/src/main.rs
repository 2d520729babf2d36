//! date-store CLI - inspect and update a date store from the shell

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use date_store::{DateStore, StoreOptions, TimestampFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

/// date-store - remember when things last happened
#[derive(Parser)]
#[command(name = "date-store")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Store name (file stem under the store directory)
    #[arg(long, global = true, default_value = "date-store")]
    name: String,

    /// Full path of the store file (overrides --name and --dir)
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    /// Directory holding the store file
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Indent width of the JSON file (0 = compact)
    #[arg(long, global = true, default_value = "2")]
    indent: usize,

    /// Timestamp rendering for new records (display, rfc3339)
    #[arg(long, global = true, default_value = "display")]
    format: TimestampFormat,
}

impl StoreArgs {
    fn options(&self) -> StoreOptions {
        // One process per command: write through instead of coalescing
        let mut options = StoreOptions::named(&self.name)
            .with_indent(self.indent)
            .with_format(self.format)
            .with_write_delay(Duration::ZERO);

        if let Some(dir) = &self.dir {
            options = options.with_directory(dir);
        }
        if let Some(path) = &self.path {
            options = options.with_path(path);
        }
        options
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Record the current time for one or more keys
    Set {
        /// Keys to record
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show the stored date for a key
    Get {
        key: String,
    },
    /// Print the raw stored string for a key
    Raw {
        key: String,
    },
    /// Exit 0 if a valid date is stored for a key, 1 otherwise
    Has {
        key: String,
    },
    /// Delete one or more keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Remove every key
    Clear,
    /// Seconds between a stored date and a time expression
    Diff {
        key: String,
        /// Time expression, e.g. "10 minutes ago"
        expr: String,
    },
    /// List keys recorded after a time expression
    Since {
        expr: String,
    },
    /// Compare a stored date against a time expression
    Check {
        key: String,

        #[command(flatten)]
        test: cmd::check::CheckArgs,
    },
    /// Resolve a time expression
    Date {
        expr: String,
    },
    /// Print the store as JSON
    Json,
    /// Print the resolved store file path
    Path,
}

fn main() -> Result<ExitCode> {
    // Initialize tracing (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = DateStore::open(cli.store.options())
        .context("Failed to open date store")?;
    debug!(
        "Opened {} ({} entries)",
        store.path().display(),
        store.len()
    );

    match cli.command {
        Commands::Set { keys } => cmd::record::set(&store, &keys),
        Commands::Get { key } => cmd::query::get(&store, &key),
        Commands::Raw { key } => cmd::query::raw(&store, &key),
        Commands::Has { key } => cmd::query::has(&store, &key),
        Commands::Del { keys } => cmd::record::delete(&store, &keys),
        Commands::Clear => cmd::record::clear(&store),
        Commands::Diff { key, expr } => cmd::query::diff(&store, &key, &expr),
        Commands::Since { expr } => cmd::query::since(&store, &expr),
        Commands::Check { key, test } => cmd::check::run(&store, &key, &test),
        Commands::Date { expr } => cmd::query::date(&store, &expr),
        Commands::Json => cmd::show::json(&store),
        Commands::Path => cmd::show::path(&store),
    }
}
