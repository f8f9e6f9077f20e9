mod cli;
mod config;
mod conflict;
mod core;
mod cpu;
mod daemon;
mod engine;
mod monitor;
mod power;
#[cfg(test)]
mod test_utils;
mod util;

use crate::config::LogLevel;
use crate::util::error::AppError;
use clap::Parser;
use log::LevelFilter;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[clap(long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Run the frequency controller in the foreground (default)
    Daemon,
    /// Display frequency controls and power state without changing anything
    Info,
}

fn init_logging(log_level: LogLevel, verbose: bool) {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::from(log_level)
    };

    // RUST_LOG still wins when set
    env_logger::Builder::new()
        .filter_level(level_filter)
        .parse_default_env()
        .init();
}

fn run(args: Cli) -> Result<(), AppError> {
    let config = config::load_config(args.config.as_deref())?;

    init_logging(config.controller.log_level, args.verbose);
    log::debug!("Effective configuration: {config:?}");

    match args.command {
        Some(Commands::Info) => cli::info::run_info(&config),
        Some(Commands::Daemon) | None => daemon::run_daemon(config),
    }
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error executing command: {e}");
        if let Some(source) = e.source() {
            eprintln!("Caused by: {source}");
        }
        if e.is_permission_denied() {
            eprintln!(
                "Hint: This operation may require administrator privileges (e.g., run with sudo)."
            );
        }

        std::process::exit(1);
    }
}
