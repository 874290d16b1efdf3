//! MenuCache CLI - developer tool for warming and inspecting a cache
//! directory.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::clear::ClearArgs;
use commands::preload::PreloadArgs;

#[derive(Parser)]
#[command(name = "menucache")]
#[command(version = menucache::VERSION)]
#[command(about = "Warm and inspect a kiosk menu cache", long_about = None)]
struct Cli {
    /// Directory for the persistent cache tier
    #[arg(long, default_value = "cache", global = true)]
    cache_dir: PathBuf,

    /// Persistent-tier quota in megabytes (unlimited when omitted)
    #[arg(long, global = true)]
    quota_mb: Option<u64>,

    /// Skip log file setup; errors still print to stderr
    #[arg(long, global = true)]
    no_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Warm the cache for a restaurant from a fixture file
    Preload(PreloadArgs),
    /// Print a diagnostics report for the cache directory
    Stats,
    /// Remove cached entries
    Clear(ClearArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _logging_guard = if cli.no_log {
        None
    } else {
        match menucache::logging::init_logging(
            menucache::logging::default_log_dir(),
            menucache::logging::default_log_file(),
        ) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: could not set up logging: {e}");
                None
            }
        }
    };

    let result = match cli.command {
        Command::Preload(args) => commands::preload::run(cli.cache_dir, cli.quota_mb, args).await,
        Command::Stats => commands::stats::run(cli.cache_dir, cli.quota_mb).await,
        Command::Clear(args) => commands::clear::run(cli.cache_dir, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
