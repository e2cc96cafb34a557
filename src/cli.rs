use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::state::PerceptionMode;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

/// Perception regime as a CLI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PerceptionArg {
    Accurate,
    Partial,
    Spin,
}

impl From<PerceptionArg> for PerceptionMode {
    fn from(arg: PerceptionArg) -> Self {
        match arg {
            PerceptionArg::Accurate => PerceptionMode::Accurate,
            PerceptionArg::Partial => PerceptionMode::Partial,
            PerceptionArg::Spin => PerceptionMode::Spin,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "loopforge",
    about = "Deterministic multi-agent robot factory simulation with reflection and supervisor feedback",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/loopforge/logs/loopforge.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to loopforge.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the simulation
    Run {
        /// Steps per simulated day
        #[arg(long)]
        steps_per_day: Option<u64>,

        /// Days per episode
        #[arg(long)]
        days: Option<u64>,

        /// Number of episodes
        #[arg(long)]
        episodes: Option<u64>,

        /// Label of the first episode
        #[arg(long)]
        episode_index: Option<i64>,

        /// Perception regime
        #[arg(long, value_enum)]
        perception_mode: Option<PerceptionArg>,

        /// Write every log stream into this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Start from the agent store instead of the built-in cast
        #[arg(long)]
        from_store: bool,

        /// Truncate the log streams before running
        #[arg(long)]
        fresh: bool,

        /// Output format for the run summary
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Summaries built from the logs
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Aggregate metrics over the logs
    Metrics {
        /// Restrict to one episode label
        #[arg(long)]
        episode: Option<i64>,

        /// Read every log stream from this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Output format
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Episode tension snapshots
    Weave {
        /// Recompute from the action and reflection logs instead of reading the weave log
        #[arg(long)]
        recompute: bool,

        /// Append recomputed snapshots to the weave log
        #[arg(long, requires = "recompute")]
        write: bool,

        /// Read every log stream from this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Output format
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage the agent record store
    Agents {
        #[command(subcommand)]
        action: AgentsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// Summarize one day
    Day {
        /// Day index
        day: i64,

        /// Restrict to one episode label
        #[arg(long)]
        episode: Option<i64>,

        /// Steps per day used for unlabeled entries
        #[arg(long)]
        steps_per_day: Option<u64>,

        /// Read every log stream from this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Output format
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Summarize every day of an episode
    Episode {
        /// Episode label (omit to summarize the whole log)
        episode: Option<i64>,

        /// Steps per day used for unlabeled entries
        #[arg(long)]
        steps_per_day: Option<u64>,

        /// Read every log stream from this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Output format
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand)]
pub enum AgentsAction {
    /// List stored agents
    List {
        /// Output format
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Write agent records into the store
    Seed {
        /// Registry characters to seed by name
        names: Vec<String>,

        /// Seed the full character registry instead of the three starting robots
        #[arg(long, conflicts_with = "names")]
        cast: bool,

        /// Overwrite existing records
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show resolved file locations
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "loopforge",
            "run",
            "--steps-per-day",
            "10",
            "--days",
            "2",
            "--perception-mode",
            "spin",
            "--fresh",
        ]);
        match cli.command {
            Commands::Run {
                steps_per_day,
                days,
                perception_mode,
                fresh,
                ..
            } => {
                assert_eq!(steps_per_day, Some(10));
                assert_eq!(days, Some(2));
                assert_eq!(perception_mode.map(PerceptionMode::from), Some(PerceptionMode::Spin));
                assert!(fresh);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_report_episode_without_label() {
        let cli = Cli::parse_from(["loopforge", "report", "episode"]);
        assert!(matches!(
            cli.command,
            Commands::Report {
                action: ReportAction::Episode { episode: None, .. }
            }
        ));
    }

    #[test]
    fn test_parse_seed_names() {
        let cli = Cli::parse_from(["loopforge", "agents", "seed", "iron jaw", "Delta", "--force"]);
        match cli.command {
            Commands::Agents {
                action: AgentsAction::Seed { names, cast, force },
            } => {
                assert_eq!(names, vec!["iron jaw", "Delta"]);
                assert!(!cast);
                assert!(force);
            }
            _ => panic!("expected agents seed"),
        }
    }

    #[test]
    fn test_output_format_explicit_wins() {
        assert_eq!(OutputFormat::resolve(Some(OutputFormat::Yaml)), OutputFormat::Yaml);
    }
}
