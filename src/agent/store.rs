//! Agent record store
//!
//! One YAML file per agent under a store directory. Records are the durable
//! shape of a robot (no triggers; those are re-attached by persona on load).

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::state::{EmotionState, Traits};

use super::{BATTERY_MAX, RobotAgent};

fn default_location() -> String {
    "factory_floor".to_string()
}

fn default_battery() -> u32 {
    BATTERY_MAX
}

/// Persisted robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub role: String,

    /// Free-form personality knobs (vibe, tagline scores, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub personality: BTreeMap<String, String>,

    #[serde(default)]
    pub traits: Traits,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_battery")]
    pub battery_level: u32,

    #[serde(default)]
    pub emotions: EmotionState,
}

impl From<&RobotAgent> for AgentRecord {
    fn from(agent: &RobotAgent) -> Self {
        Self {
            name: agent.name.clone(),
            role: agent.role.clone(),
            personality: BTreeMap::new(),
            traits: agent.traits,
            location: agent.location.clone(),
            battery_level: agent.battery_level,
            emotions: agent.emotions,
        }
    }
}

impl AgentRecord {
    pub fn into_agent(self) -> RobotAgent {
        if !self.emotions.is_clamped() || !self.traits.is_clamped() {
            log::warn!("Agent record {} has values outside [0, 1], clamping", self.name);
        }
        let mut agent = RobotAgent::new(self.name, self.role, self.location)
            .with_traits(self.traits)
            .with_emotions(self.emotions);
        agent.battery_level = self.battery_level.min(BATTERY_MAX);
        agent
    }

    /// File stem for this record: lowercase, non-alphanumerics collapsed to '-'
    pub fn file_stem(&self) -> String {
        let mut stem = String::with_capacity(self.name.len());
        for c in self.name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                stem.push(c.to_ascii_lowercase());
            } else if !stem.ends_with('-') {
                stem.push('-');
            }
        }
        stem.trim_matches('-').to_string()
    }
}

/// Keyed record store over a directory of YAML files
pub struct AgentStore {
    dir: PathBuf,
    cache: BTreeMap<String, AgentRecord>,
}

impl AgentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            cache: BTreeMap::new(),
        }
    }

    /// Load every record in the store; unreadable files are skipped with a warning
    pub fn load_all(&mut self) -> Result<Vec<AgentRecord>> {
        let mut records = Vec::new();

        if !self.dir.exists() {
            return Ok(records);
        }

        for entry in WalkDir::new(&self.dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if !path.extension().map(|e| e == "yaml" || e == "yml").unwrap_or(false) {
                continue;
            }
            match Self::load_record(path) {
                Ok(record) => {
                    self.cache.insert(record.name.clone(), record.clone());
                    records.push(record);
                }
                Err(e) => {
                    log::warn!("Failed to load agent from {}: {:#}", path.display(), e);
                }
            }
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    pub fn load_record(path: &Path) -> Result<AgentRecord> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read agent file: {}", path.display()))?;

        let record: AgentRecord = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse agent file: {}", path.display()))?;

        Ok(record)
    }

    /// Cached record by name; call `load_all` first
    pub fn get(&self, name: &str) -> Option<&AgentRecord> {
        self.cache.get(name)
    }

    /// Write a record, replacing any previous file for the same name
    pub fn save(&mut self, record: &AgentRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create agent store: {}", self.dir.display()))?;

        let path = self.dir.join(format!("{}.yaml", record.file_stem()));
        let yaml = serde_yaml::to_string(record).context("Failed to serialize agent record")?;
        fs::write(&path, yaml).with_context(|| format!("Failed to write agent file: {}", path.display()))?;

        self.cache.insert(record.name.clone(), record.clone());
        Ok(path)
    }

    /// Persist live agents; personality of already known records is kept
    pub fn save_agents(&mut self, agents: &[RobotAgent]) -> Result<Vec<PathBuf>> {
        agents
            .iter()
            .map(|a| {
                let mut record = AgentRecord::from(a);
                if let Some(known) = self.cache.get(&a.name) {
                    record.personality = known.personality.clone();
                }
                self.save(&record)
            })
            .collect()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
