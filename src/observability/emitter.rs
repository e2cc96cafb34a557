//! Event emitter with multiple sink support

use chrono::{Local, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ObservabilityConfig, ObservabilitySink};
use crate::history::JsonlLog;
use crate::state::ActionLogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStarted,
    Step,
    DayCompleted,
    EpisodeCompleted,
    RunCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunStarted => "run_started",
            Self::Step => "step",
            Self::DayCompleted => "day_completed",
            Self::EpisodeCompleted => "episode_completed",
            Self::RunCompleted => "run_completed",
        }
    }
}

/// An observable event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Timestamp (UTC ISO 8601)
    pub timestamp: String,
    /// Local time for display
    pub local_time: String,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Event {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        let now = Utc::now();
        let local = Local::now();
        Self {
            timestamp: now.to_rfc3339(),
            local_time: local.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind,
            episode_index: None,
            day_index: None,
            step: None,
            agent_name: None,
            message: message.into(),
            payload: None,
        }
    }

    pub fn at(mut self, episode_index: Option<i64>, day_index: Option<i64>) -> Self {
        self.episode_index = episode_index;
        self.day_index = day_index;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// One agent's logged step
    pub fn from_action(entry: &ActionLogEntry) -> Self {
        let mut event = Self::new(
            EventKind::Step,
            format!("{} {} ({})", entry.agent_name, entry.intent, entry.mode),
        )
        .at(entry.episode_index, entry.day_index);
        event.step = Some(entry.step);
        event.agent_name = Some(entry.agent_name.clone());
        if entry.is_incident() {
            event.message.push_str(" incident");
        }
        event
    }

    /// Format for stdout display
    pub fn format_display(&self) -> String {
        let label = self.kind.as_str();
        let kind_colored = match self.kind {
            EventKind::RunStarted => label.green(),
            EventKind::RunCompleted => label.green().bold(),
            EventKind::Step => label.cyan(),
            EventKind::DayCompleted => label.blue(),
            EventKind::EpisodeCompleted => label.yellow(),
        };

        let mut parts = vec![self.local_time.dimmed().to_string(), kind_colored.to_string()];

        let mut position = Vec::new();
        if let Some(ep) = self.episode_index {
            position.push(format!("ep={}", ep));
        }
        if let Some(day) = self.day_index {
            position.push(format!("day={}", day));
        }
        if let Some(step) = self.step {
            position.push(format!("t={}", step));
        }
        if !position.is_empty() {
            parts.push(format!("[{}]", position.join(" ")).dimmed().to_string());
        }

        if self.message.ends_with("incident") {
            parts.push(self.message.red().to_string());
        } else {
            parts.push(self.message.bold().to_string());
        }

        parts.join(" ")
    }
}

/// Event emitter that sends to multiple sinks
pub struct EventEmitter {
    config: ObservabilityConfig,
    events_log: JsonlLog,
    http: ureq::Agent,
}

impl EventEmitter {
    pub fn new(config: ObservabilityConfig, events_path: PathBuf) -> Self {
        let timeout = Duration::from_millis(config.http_timeout_ms.max(1));
        let http: ureq::Agent = ureq::Agent::config_builder().timeout_global(Some(timeout)).build().into();
        Self {
            config,
            events_log: JsonlLog::new(events_path),
            http,
        }
    }

    /// An emitter that drops everything
    pub fn disabled() -> Self {
        Self::new(
            ObservabilityConfig {
                enabled: false,
                ..Default::default()
            },
            PathBuf::new(),
        )
    }

    pub fn wants_steps(&self) -> bool {
        self.config.enabled && self.config.include_steps
    }

    /// Emit an event to all configured sinks
    pub fn emit(&self, event: &Event) {
        if !self.config.enabled {
            return;
        }
        if event.kind == EventKind::Step && !self.config.include_steps {
            return;
        }

        for sink in &self.config.sinks {
            match sink {
                ObservabilitySink::File => {
                    if let Err(e) = self.events_log.append(event) {
                        log::warn!("Failed to emit to file sink: {:#}", e);
                    }
                }
                ObservabilitySink::Stdout => {
                    println!("{}", event.format_display());
                }
                ObservabilitySink::Http => {
                    if let Err(e) = self.emit_to_http(event) {
                        log::warn!("Failed to emit to HTTP sink: {}", e);
                    }
                }
            }
        }
    }

    /// POST event to HTTP endpoint
    fn emit_to_http(&self, event: &Event) -> Result<(), String> {
        let endpoint = self
            .config
            .http_endpoint
            .as_ref()
            .ok_or_else(|| "HTTP endpoint not configured".to_string())?;

        let body = serde_json::to_string(event).map_err(|e| e.to_string())?;

        match self
            .http
            .post(endpoint)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
        {
            Ok(_) => Ok(()),
            Err(e) => Err(format!("HTTP request failed: {}", e)),
        }
    }
}
