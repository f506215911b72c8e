mod commands;
mod config;
mod content;
mod error;
mod export;
mod files;
mod frontend;
mod golang;
mod href;
mod page;
mod references;
mod relative;
mod site;
mod types;
mod version;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Tool version, embedded in versioned asset names.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cross-referenced documentation sites for Go codebases.
#[derive(Parser)]
#[command(name = "symdocs", version, about)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log progress at info level (otherwise `RUST_LOG`, default warn).
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Analyse a Go module and export its documentation site
    Export {
        /// Directory to analyse
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Output directory; omitted, pages are rendered and discarded
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Suppress per-page progress
        #[arg(long)]
        silent: bool,
    },
    /// Print every occurrence of a package-level symbol (`Name`, `Type.Member`,
    /// optionally prefixed with `<import path>..`)
    Refs {
        /// Symbol to look up
        symbol: String,
        /// Directory to analyse
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Export { output, root, silent } => commands::export(&root, output, silent, VERSION),
        Commands::Refs { root, symbol } => commands::refs(&symbol, &root),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    };
}
