//! Episode weave command

use colored::*;
use eyre::Result;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::history::{JsonlLog, read_action_log, read_reflection_log};
use crate::weave::{compute_all_snapshots, read_snapshots, write_snapshots};

use super::log_paths;

pub fn run(
    recompute: bool,
    write: bool,
    log_dir: Option<PathBuf>,
    format: Option<OutputFormat>,
    config: &Config,
) -> Result<()> {
    let paths = log_paths(config, log_dir.as_deref());
    let weave_log = JsonlLog::new(&paths.weave);

    let snapshots = if recompute {
        let snapshots = compute_all_snapshots(&read_action_log(&paths.actions), &read_reflection_log(&paths.reflections));
        if write {
            write_snapshots(&weave_log, &snapshots)?;
            log::info!("Rewrote {} with {} snapshot(s)", weave_log.path().display(), snapshots.len());
        }
        snapshots
    } else {
        read_snapshots(&weave_log)
    };

    match OutputFormat::resolve(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshots)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&snapshots)?),
        OutputFormat::Text => {
            println!("{}", "Episode Weave".bold());
            println!();
            if snapshots.is_empty() {
                println!("  {} No snapshots in {}", "(none)".dimmed(), paths.weave.display());
            }
            for snap in &snapshots {
                println!(
                    "  {} episode {}  tension={:.2}  days={} actions={} reflections={}",
                    "●".cyan(),
                    snap.episode_index.to_string().bold(),
                    snap.tension_index,
                    snap.num_days,
                    snap.num_actions,
                    snap.num_reflections
                );
                println!(
                    "    incident={:.2} belief={:.2} guardrail={:.2} punitive={:.2}",
                    snap.incident_rate, snap.belief_rate, snap.guardrail_rate, snap.punitive_rate
                );
                println!("    {}", snap.notes.dimmed());
            }
        }
    }
    Ok(())
}
