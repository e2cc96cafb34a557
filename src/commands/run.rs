//! Simulation run command

use colored::*;
use eyre::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::agent::{AgentStore, RobotAgent, initial_robots};
use crate::cli::{OutputFormat, PerceptionArg};
use crate::config::{Config, ObservabilitySink};
use crate::history::{LogPaths, LogStream, read_action_log, read_reflection_log};
use crate::observability::EventEmitter;
use crate::policy::HttpDecisionProvider;
use crate::runner::{RunPlan, RunReport, Simulation};
use crate::weave::EpisodeTensionSnapshot;
use crate::world::Environment;

use super::{events_path, log_paths};

pub struct RunArgs {
    pub steps_per_day: Option<u64>,
    pub days: Option<u64>,
    pub episodes: Option<u64>,
    pub episode_index: Option<i64>,
    pub perception_mode: Option<PerceptionArg>,
    pub log_dir: Option<PathBuf>,
    pub from_store: bool,
    pub fresh: bool,
    pub format: Option<OutputFormat>,
    pub quiet: bool,
}

#[derive(Serialize)]
struct DayLine {
    episode_index: Option<i64>,
    day_index: i64,
    actions: usize,
    incidents: usize,
    messages: usize,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    logs: &'a LogPaths,
    days: Vec<DayLine>,
    snapshots: &'a [EpisodeTensionSnapshot],
}

pub fn run(args: RunArgs, config: &Config) -> Result<()> {
    let mut config = config.clone();
    let sim_config = &mut config.simulation;
    if let Some(s) = args.steps_per_day {
        sim_config.steps_per_day = s;
    }
    if let Some(d) = args.days {
        sim_config.num_days = d;
    }
    if let Some(e) = args.episodes {
        sim_config.num_episodes = e;
    }
    if let Some(i) = args.episode_index {
        sim_config.episode_index = i;
    }
    if let Some(mode) = args.perception_mode {
        sim_config.perception_mode = mode.into();
    }

    let paths = log_paths(&config, args.log_dir.as_deref());
    if args.fresh {
        truncate_logs(&paths)?;
    } else if args.episode_index.is_none()
        && let Some(next) = next_episode_index(&paths)
        && next > config.simulation.episode_index
    {
        log::warn!(
            "Logs in {} already hold episodes up to {}, continuing at episode {}",
            paths.actions.display(),
            next - 1,
            next
        );
        config.simulation.episode_index = next;
    }

    let mut store = AgentStore::new(config.agents_dir());
    let agents = load_agents(&mut store, args.from_store)?;

    let mut observability = config.observability.clone();
    if args.quiet {
        observability.sinks.retain(|s| *s != ObservabilitySink::Stdout);
    }
    let emitter = EventEmitter::new(observability, events_path(&paths));

    let mut sim =
        Simulation::new(agents, Environment::new(config.simulation.perception_mode), paths).with_emitter(emitter);
    if config.provider.enabled {
        match HttpDecisionProvider::from_config(&config.provider) {
            Ok(provider) => {
                log::info!("Using decision provider {}", config.provider.model);
                sim = sim.with_provider(Box::new(provider));
            }
            Err(e) => log::warn!("Decision provider unavailable, using deterministic policy: {}", e),
        }
    }

    let plan = RunPlan::from(&config.simulation);
    log::info!("Starting run: {:?}", plan);
    let report = sim.run(&plan);
    log::info!("Run finished in phase {:?}", sim.phase());

    if args.from_store {
        store
            .save_agents(&sim.agents)
            .context("Failed to write agents back to the store")?;
    }

    if !args.quiet {
        print_summary(&report, sim.paths(), OutputFormat::resolve(args.format))?;
    }
    Ok(())
}

fn load_agents(store: &mut AgentStore, from_store: bool) -> Result<Vec<RobotAgent>> {
    if !from_store {
        return Ok(initial_robots());
    }
    let records = store.load_all().context("Failed to load agent store")?;
    if records.is_empty() {
        log::warn!("Agent store {} is empty, using the starting cast", store.dir().display());
        return Ok(initial_robots());
    }
    Ok(records.into_iter().map(|r| r.into_agent()).collect())
}

/// Episode after the highest label already in the action or reflection log
fn next_episode_index(paths: &LogPaths) -> Option<i64> {
    let actions = read_action_log(&paths.actions);
    let reflections = read_reflection_log(&paths.reflections);
    actions
        .iter()
        .filter_map(|a| a.episode_index)
        .chain(reflections.iter().filter_map(|r| r.episode_index))
        .max()
        .map(|last| last + 1)
}

fn truncate_logs(paths: &LogPaths) -> Result<()> {
    for stream in LogStream::ALL {
        let path = paths.get(stream);
        if path.exists() {
            fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

fn print_summary(report: &RunReport, paths: &LogPaths, format: OutputFormat) -> Result<()> {
    let summary = RunSummary {
        logs: paths,
        days: report
            .days
            .iter()
            .map(|d| DayLine {
                episode_index: d.episode_index,
                day_index: d.day_index,
                actions: d.actions.len(),
                incidents: d.incidents(),
                messages: d.messages.len(),
            })
            .collect(),
        snapshots: &report.snapshots,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summary)?),
        OutputFormat::Text => {
            println!("{}", "Run complete".bold());
            println!();
            for day in &summary.days {
                let incidents = if day.incidents > 0 {
                    day.incidents.to_string().red()
                } else {
                    day.incidents.to_string().green()
                };
                println!(
                    "  ep {} day {}: {} actions, {} incidents, {} messages",
                    day.episode_index.map(|e| e.to_string()).unwrap_or_else(|| "-".to_string()),
                    day.day_index,
                    day.actions,
                    incidents,
                    day.messages
                );
            }
            println!();
            for snap in summary.snapshots {
                println!(
                    "  {} episode {}: tension {:.2}",
                    "●".cyan(),
                    snap.episode_index,
                    snap.tension_index
                );
                println!("    {}", snap.notes.dimmed());
            }
            println!();
            println!("  actions:     {}", paths.actions.display());
            println!("  reflections: {}", paths.reflections.display());
            println!("  supervisor:  {}", paths.supervisor.display());
            println!("  weave:       {}", paths.weave.display());
        }
    }
    Ok(())
}
