//! Agent store commands

use colored::*;
use eyre::{Result, eyre};
use serde::Serialize;

use crate::agent::cast::{CHARACTERS, Character, character};
use crate::agent::{AgentRecord, AgentStore, initial_robots};
use crate::cli::{AgentsAction, OutputFormat};
use crate::config::Config;

pub fn run(action: AgentsAction, config: &Config) -> Result<()> {
    let mut store = AgentStore::new(config.agents_dir());
    match action {
        AgentsAction::List { format } => list_agents(&mut store, OutputFormat::resolve(format)),
        AgentsAction::Seed { names, cast, force } => {
            let records = seed_records(&names, cast)?;
            seed_agents(&mut store, &records, force)
        }
    }
}

/// Record for a registry character, persona text kept as personality
pub fn character_record(character: &Character) -> AgentRecord {
    let mut record = AgentRecord::from(&character.to_agent());
    for (key, value) in [
        ("visual", character.visual),
        ("vibe", character.vibe),
        ("tagline", character.tagline),
    ] {
        record.personality.insert(key.to_string(), value.to_string());
    }
    record
}

fn list_agents(store: &mut AgentStore, format: OutputFormat) -> Result<()> {
    let records = store.load_all()?;

    #[derive(Serialize)]
    struct AgentSummary<'a> {
        name: &'a str,
        role: &'a str,
        location: &'a str,
        battery_level: u32,
        stress: f64,
        guardrail_reliance: f64,
        risk_aversion: f64,
    }

    let summaries: Vec<AgentSummary> = records
        .iter()
        .map(|r| AgentSummary {
            name: &r.name,
            role: &r.role,
            location: &r.location,
            battery_level: r.battery_level,
            stress: r.emotions.stress,
            guardrail_reliance: r.traits.guardrail_reliance,
            risk_aversion: r.traits.risk_aversion,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summaries)?),
        OutputFormat::Text => {
            println!("{}", "Stored Agents:".bold());
            println!();

            if records.is_empty() {
                println!("  {} No agents found in {}", "(none)".dimmed(), store.dir().display());
                println!();
                println!("  Seed the store with: {}", "loopforge agents seed".cyan());
            } else {
                for record in &records {
                    println!("  {} {} ({})", "●".green(), record.name.bold(), record.role.dimmed());
                    println!(
                        "    at {} • battery {}% • stress {:.2}",
                        record.location, record.battery_level, record.emotions.stress
                    );
                    println!(
                        "    guardrail_reliance {:.2} • risk_aversion {:.2}",
                        record.traits.guardrail_reliance, record.traits.risk_aversion
                    );
                    if let Some(tagline) = record.personality.get("tagline") {
                        println!("    {}", tagline.magenta());
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

/// Records to seed: named registry characters, the whole registry, or the starting robots
fn seed_records(names: &[String], cast: bool) -> Result<Vec<AgentRecord>> {
    if !names.is_empty() {
        return names
            .iter()
            .map(|name| {
                character(name)
                    .map(character_record)
                    .ok_or_else(|| eyre!("Unknown character '{}'", name))
            })
            .collect();
    }
    if cast {
        return Ok(CHARACTERS.iter().map(character_record).collect());
    }
    Ok(initial_robots().iter().map(AgentRecord::from).collect())
}

fn seed_agents(store: &mut AgentStore, records: &[AgentRecord], force: bool) -> Result<()> {
    store.load_all()?;

    let mut written = 0;
    for record in records {
        if !force && store.get(&record.name).is_some() {
            println!("  {} {} already stored (use --force)", "○".yellow(), record.name);
            continue;
        }
        let path = store.save(record)?;
        println!("  {} {} → {}", "✓".green(), record.name.bold(), path.display());
        written += 1;
    }

    println!();
    println!("{} Seeded {} agent(s) into {}", "→".blue(), written, store.dir().display());
    Ok(())
}
