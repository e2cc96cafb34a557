use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;
use crate::history::{LogPaths, LogStream};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Path => paths(config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "Loopforge Configuration".bold());
            println!();

            println!("{}:", "simulation".cyan());
            println!("  steps_per_day: {}", config.simulation.steps_per_day);
            println!("  num_days: {}", config.simulation.num_days);
            println!("  num_episodes: {}", config.simulation.num_episodes);
            println!("  episode_index: {}", config.simulation.episode_index);
            println!("  perception_mode: {}", config.simulation.perception_mode);
            println!();

            println!("{}:", "provider".cyan());
            println!("  enabled: {}", config.provider.enabled);
            println!("  model: {}", config.provider.model);
            println!("  endpoint: {}", config.provider.endpoint);
            println!("  api_key_env: {}", config.provider.api_key_env);
            println!("  timeout_secs: {}", config.provider.timeout_secs);
            println!();

            println!("{}:", "observability".cyan());
            println!("  enabled: {}", config.observability.enabled);
            println!("  sinks: {:?}", config.observability.sinks);
            println!("  include_steps: {}", config.observability.include_steps);
            println!("  http_timeout_ms: {}", config.observability.http_timeout_ms);
            println!();

            println!("{}: {}", "log_level".cyan(), config.log_level.as_filter());
        }
    }

    Ok(())
}

fn paths(config: &Config) -> Result<()> {
    let logs = LogPaths::resolve(&config.paths);
    println!("{}", "Resolved locations".bold());
    println!();
    println!("  config dir: {}", Config::loopforge_dir().display());
    println!("  agents:     {}", config.agents_dir().display());
    for stream in LogStream::ALL {
        let source = if std::env::var(stream.env_var()).is_ok_and(|v| !v.trim().is_empty()) {
            stream.env_var().yellow()
        } else {
            "config/default".dimmed()
        };
        println!("  {:<11} {} ({})", format!("{:?}:", stream).to_lowercase(), logs.get(stream).display(), source);
    }
    Ok(())
}
