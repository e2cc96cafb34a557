//! One module per subcommand

pub mod agents;
pub mod completions;
pub mod config;
pub mod metrics;
pub mod report;
pub mod run;
pub mod weave;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::history::LogPaths;

/// Log locations for a command; `--log-dir` replaces the configured paths,
/// per-stream env overrides still win
pub fn log_paths(config: &Config, log_dir: Option<&Path>) -> LogPaths {
    match log_dir {
        Some(dir) => LogPaths::resolve_in_dir(&Config::expand_path(dir)),
        None => LogPaths::resolve(&config.paths),
    }
}

/// Sidecar file for observability events, next to the action log
pub fn events_path(paths: &LogPaths) -> PathBuf {
    paths.actions.with_file_name("loopforge_events.jsonl")
}
