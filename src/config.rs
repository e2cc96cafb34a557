use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::PerceptionMode;

/// Main Loopforge configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub paths: PathsConfig,
    pub simulation: SimulationConfig,
    pub provider: ProviderConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Explicit stream locations; unset falls back to the built-in defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub action_log: Option<PathBuf>,
    pub reflection_log: Option<PathBuf>,
    pub supervisor_log: Option<PathBuf>,
    pub weave_log: Option<PathBuf>,
    pub agents: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub steps_per_day: u64,
    pub num_days: u64,
    pub num_episodes: u64,
    /// Label of the first episode of a run
    pub episode_index: i64,
    pub perception_mode: PerceptionMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// Name of the env var holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

/// Observability sink type
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObservabilitySink {
    /// Append to a JSONL file next to the action log
    File,
    /// Print colored progress lines
    Stdout,
    /// POST to an HTTP endpoint
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub enabled: bool,
    pub sinks: Vec<ObservabilitySink>,
    /// HTTP endpoint for http sink
    pub http_endpoint: Option<String>,
    /// Emit every agent step, not just day and episode boundaries
    pub include_steps: bool,
    /// Upper bound on one http sink request
    pub http_timeout_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps_per_day: 50,
            num_days: 1,
            num_episodes: 1,
            episode_index: 0,
            perception_mode: PerceptionMode::Accurate,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sinks: vec![ObservabilitySink::Stdout],
            http_endpoint: None,
            include_steps: false,
            http_timeout_ms: 2000,
        }
    }
}

fn env_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("LOOPFORGE_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from LOOPFORGE_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("LOOPFORGE_DIR") {
            let path = PathBuf::from(dir).join("loopforge.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from LOOPFORGE_DIR: {}", e);
                    }
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("loopforge").join("loopforge.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./loopforge.yaml (for development)
        let local_config = PathBuf::from("loopforge.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Runtime knobs read from the environment. Log path overrides are
    /// resolved per stream in `history::paths`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("PERCEPTION_MODE") {
            self.simulation.perception_mode = PerceptionMode::parse_lossy(&mode);
        }
        if let Ok(flag) = std::env::var("USE_LLM_POLICY") {
            self.provider.enabled = env_flag(&flag);
        }
        if let Ok(model) = std::env::var("LLM_MODEL_NAME")
            && !model.trim().is_empty()
        {
            self.provider.model = model;
        }
    }

    /// The Loopforge directory (config and agent store live here)
    pub fn loopforge_dir() -> PathBuf {
        std::env::var("LOOPFORGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("loopforge"))
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.paths
            .agents
            .as_deref()
            .map(Self::expand_path)
            .unwrap_or_else(|| Self::loopforge_dir().join("agents"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
