//! Metrics command

use colored::*;
use eyre::Result;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::history::{read_action_log, read_reflection_log, read_supervisor_log};
use crate::metrics::{Distribution, MetricsReport};

use super::log_paths;

pub fn run(episode: Option<i64>, log_dir: Option<PathBuf>, format: Option<OutputFormat>, config: &Config) -> Result<()> {
    let paths = log_paths(config, log_dir.as_deref());
    let keep = |label: Option<i64>| episode.is_none() || label == episode;

    let mut actions = read_action_log(&paths.actions);
    actions.retain(|a| keep(a.episode_index));
    let mut reflections = read_reflection_log(&paths.reflections);
    reflections.retain(|r| keep(r.episode_index));
    let mut messages = read_supervisor_log(&paths.supervisor);
    messages.retain(|m| keep(m.episode_index));

    let report = MetricsReport::compute(&actions, &reflections, &messages);

    match OutputFormat::resolve(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn print_distribution(title: &str, dist: &Distribution) {
    println!("{} {}", title.cyan(), format!("(n={})", dist.total).dimmed());
    if dist.total == 0 {
        println!("  {}", "(none)".dimmed());
    }
    for (label, count) in &dist.counts {
        println!("  {:<20} {:>5}  {:>5.1}%", label, count, dist.rate(label) * 100.0);
    }
}

fn print_text(report: &MetricsReport) {
    println!("{}", "Loopforge Metrics".bold());
    println!();
    println!(
        "{} {}/{} = {:.3}",
        "Incident rate:".cyan(),
        report.incidents.incidents,
        report.incidents.total_steps,
        report.incidents.incident_rate
    );
    println!(
        "{} {}/{} = {:.3}",
        "Belief drift:".cyan(),
        report.belief_drift.belief_events,
        report.belief_drift.total_events,
        report.belief_drift.belief_rate
    );
    println!();
    print_distribution("Decision modes", &report.modes);
    println!();
    print_distribution("Perception modes", &report.perception_modes);
    println!();
    print_distribution("Perceived supervisor intent", &report.supervisor_intents.perceived);
    println!();
    print_distribution("Sent supervisor intent", &report.supervisor_intents.actual);
    println!();
    println!("{}", "Actions per episode".cyan());
    for (ep, n) in &report.actions_per_episode {
        println!("  {:<8} {}", ep, n);
    }
}
