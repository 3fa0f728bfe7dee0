//! `rvm`: offline tools for recoverable virtual memory stores.
//!
//! `inspect`, `dump-log` and `verify` only read the log and never take the
//! store lock. `truncate` opens the store and folds its log.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CliResult, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Inspect and maintain RVM stores.
#[derive(Parser)]
#[command(name = "rvm", author, version, about, long_about = None)]
struct Cli {
    /// Store directory
    #[arg(global = true, short, long, env = "RVM_STORE")]
    path: Option<PathBuf>,

    /// Log engine activity at debug level
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment files and what the log still owes each of them
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Decode log entries in commit order
    DumpLog {
        /// Stop after this many entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print redo bytes as hex
        #[arg(short, long)]
        bytes: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Check every log entry's framing and checksum
    Verify,

    /// Apply the log to the segment files, then empty it
    Truncate,

    /// Print crate versions
    Version,
}

impl Cli {
    fn store(&self, command: &str) -> CliResult<PathBuf> {
        self.path
            .clone()
            .ok_or_else(|| format!("{command} needs a store: pass --path or set RVM_STORE").into())
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Inspect { format } => commands::inspect::run(&cli.store("inspect")?, *format),
        Commands::DumpLog {
            limit,
            bytes,
            format,
        } => commands::dump_log::run(&cli.store("dump-log")?, *limit, *bytes, *format),
        Commands::Verify => commands::verify::run(&cli.store("verify")?),
        Commands::Truncate => commands::truncate::run(&cli.store("truncate")?),
        Commands::Version => {
            println!("rvm {}", env!("CARGO_PKG_VERSION"));
            println!("rvm_core {}", rvm_core::VERSION);
            Ok(())
        }
    }
}
