use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod agent;
mod cli;
mod commands;
mod config;
mod history;
mod metrics;
mod observability;
mod perception;
mod policy;
mod reflection;
mod reporting;
mod runner;
mod state;
mod supervisor;
mod weave;
mod world;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel, verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loopforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("loopforge.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    let filter = if verbose {
        log::LevelFilter::Debug.max(log_level.as_filter())
    } else {
        log_level.as_filter()
    };

    if std::env::var("RUST_LOG").is_ok() {
        // Let env_logger parse RUST_LOG
        builder.parse_default_env();
    } else {
        builder.filter_level(filter);
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        filter,
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            steps_per_day,
            days,
            episodes,
            episode_index,
            perception_mode,
            log_dir,
            from_store,
            fresh,
            format,
        } => commands::run::run(
            commands::run::RunArgs {
                steps_per_day,
                days,
                episodes,
                episode_index,
                perception_mode,
                log_dir,
                from_store,
                fresh,
                format,
                quiet: cli.quiet,
            },
            &config,
        ),
        Commands::Report { action } => commands::report::run(action, &config),
        Commands::Metrics {
            episode,
            log_dir,
            format,
        } => commands::metrics::run(episode, log_dir, format, &config),
        Commands::Weave {
            recompute,
            write,
            log_dir,
            format,
        } => commands::weave::run(recompute, write, log_dir, format, &config),
        Commands::Agents { action } => commands::agents::run(action, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with log level from config (or RUST_LOG env var)
    setup_logging(&config.log_level, cli.verbose).context("Failed to setup logging")?;

    info!("Starting loopforge with config from: {:?}", cli.config);

    // Run the command
    run(cli, config).context("Command failed")?;

    Ok(())
}
