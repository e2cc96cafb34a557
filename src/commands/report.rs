//! Day and episode report commands

use colored::*;
use eyre::Result;

use crate::cli::{OutputFormat, ReportAction};
use crate::config::Config;
use crate::reporting::{DaySummary, EpisodeSummary, compute_day_summary, compute_episode_summary};

use super::log_paths;

pub fn run(action: ReportAction, config: &Config) -> Result<()> {
    match action {
        ReportAction::Day {
            day,
            episode,
            steps_per_day,
            log_dir,
            format,
        } => {
            let paths = log_paths(config, log_dir.as_deref());
            let steps = steps_per_day.unwrap_or(config.simulation.steps_per_day);
            let summary = compute_day_summary(&paths, day, steps, episode);
            show_day(&summary, OutputFormat::resolve(format))
        }
        ReportAction::Episode {
            episode,
            steps_per_day,
            log_dir,
            format,
        } => {
            let paths = log_paths(config, log_dir.as_deref());
            let steps = steps_per_day.unwrap_or(config.simulation.steps_per_day);
            let summary = compute_episode_summary(&paths, steps, episode);
            show_episode(&summary, OutputFormat::resolve(format))
        }
    }
}

fn tension_colored(t: f64) -> ColoredString {
    let text = format!("{:.2}", t);
    if t >= 0.7 {
        text.red()
    } else if t >= 0.4 {
        text.yellow()
    } else {
        text.green()
    }
}

fn print_day_text(day: &DaySummary) {
    println!(
        "{} {}  mode={}  tension={}  incidents={}",
        "Day".bold(),
        day.day_index.to_string().bold(),
        day.perception_mode.to_string().cyan(),
        tension_colored(day.tension_score),
        day.total_incidents
    );
    if day.agent_stats.is_empty() {
        println!("  {}", "(no actions logged)".dimmed());
    }
    for stats in day.agent_stats.values() {
        println!(
            "  {} {} ({}): guardrail={} context={} stress={:.2} incidents={}",
            "●".green(),
            stats.name.bold(),
            stats.role.dimmed(),
            stats.guardrail_count,
            stats.context_count,
            stats.avg_stress,
            stats.incidents
        );
        if let Some(ref r) = stats.reflection {
            println!("    {}", r.self_assessment.dimmed());
        }
    }
}

fn show_day(day: &DaySummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(day)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(day)?),
        OutputFormat::Text => print_day_text(day),
    }
    Ok(())
}

fn show_episode(episode: &EpisodeSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(episode)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(episode)?),
        OutputFormat::Text => {
            let label = episode
                .episode_index
                .map(|e| e.to_string())
                .unwrap_or_else(|| "(all)".to_string());
            println!("{} {}", "Episode".bold(), label.bold());
            println!();
            for day in &episode.days {
                print_day_text(day);
                println!();
            }

            let trend: Vec<String> = episode.tension_trend.iter().map(|t| format!("{:.2}", t)).collect();
            println!("{} {}", "Tension trend:".cyan(), trend.join(" → "));
            println!();

            for agent in episode.agents.values() {
                let arc = match (agent.stress_start, agent.stress_end) {
                    (Some(a), Some(b)) => format!("{:.2} → {:.2}", a, b),
                    _ => "-".to_string(),
                };
                println!(
                    "  {} {} ({}): guardrail={} context={} stress {}",
                    "●".green(),
                    agent.name.bold(),
                    agent.role.dimmed(),
                    agent.guardrail_total,
                    agent.context_total,
                    arc
                );
                let moved: Vec<String> = agent
                    .trait_deltas
                    .iter()
                    .filter(|(_, d)| d.abs() > 1e-9)
                    .map(|(k, d)| format!("{}{:+.2}", k, d))
                    .collect();
                if !moved.is_empty() {
                    println!("    traits: {}", moved.join(", ").magenta());
                }
                if let Some(ref r) = agent.representative_reflection {
                    println!("    {}", r.intended_changes.dimmed());
                }
            }
        }
    }
    Ok(())
}
