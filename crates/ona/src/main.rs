//! Ona CLI - content server.
//!
//! Provides commands for:
//! - `serve`: Load a site directory and serve it over HTTP
//! - `export`: Render every enabled node to static files

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ExportArgs, ServeArgs};
use error::CliError;
use output::Output;

/// Ona - content server.
#[derive(Parser)]
#[command(name = "ona", version, about)]
struct Cli {
    /// Enable verbose output (info level logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Include timestamps in log lines.
    #[arg(long, global = true)]
    log_timestamps: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the content server.
    Serve(ServeArgs),
    /// Render the site to static files.
    Export(ExportArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    init_tracing(cli.verbose, cli.log_timestamps);
    if running_as_root() {
        tracing::warn!("Running as root is not recommended");
    }

    let result = match cli.command {
        Commands::Serve(args) => serve(args),
        Commands::Export(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

/// Install the tracing subscriber.
///
/// `--verbose` forces INFO level, otherwise `RUST_LOG` is used with a
/// default of WARN.
fn init_tracing(verbose: bool, timestamps: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if timestamps {
        builder.init();
    } else {
        builder.without_time().init();
    }
}

fn serve(args: ServeArgs) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(args.execute())
}

/// Whether the process runs with root privileges.
#[cfg(unix)]
fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;

    // /proc/self is owned by the effective user of the process
    std::fs::metadata("/proc/self").is_ok_and(|m| m.uid() == 0)
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}
