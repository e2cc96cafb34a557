//! Ground truth for a run
//!
//! The environment owns rooms, the step counter, the event buffer and the
//! supervisor mailbox. The orchestrator writes to it; perception reads it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::agent::cast::ROOMS;
use crate::state::{PerceptionMode, SupervisorMessage};

/// Steps an error stays "recent" for incident purposes
pub const RECENT_ERROR_WINDOW: u64 = 5;

/// Local events shown to an agent per step
pub const LOCAL_EVENT_LIMIT: usize = 5;

/// Deterministic stand-in for randomness: true on the first `p*10` steps of
/// every ten
pub fn chance(step: u64, p: f64) -> bool {
    let slots = (p.clamp(0.0, 1.0) * 10.0).round() as u64;
    step % 10 < slots
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    MinorError,
    Incident,
    Info,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MinorError => "MinorError",
            Self::Incident => "Incident",
            Self::Info => "Info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    pub step: u64,
    pub kind: EventKind,
    pub location: String,
    pub agent_name: Option<String>,
    pub description: String,
}

impl WorldEvent {
    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::MinorError | EventKind::Incident)
    }
}

impl fmt::Display for WorldEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={} {} at {}: {}", self.step, self.kind, self.location, self.description)
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub rooms: Vec<String>,
    pub step: u64,
    pub perception_mode: PerceptionMode,
    pub events: Vec<WorldEvent>,
    /// Latest supervisor broadcast, fallback text when the mailbox is empty
    pub recent_broadcast: Option<String>,
    mailbox: BTreeMap<String, SupervisorMessage>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(PerceptionMode::Accurate)
    }
}

impl Environment {
    pub fn new(perception_mode: PerceptionMode) -> Self {
        Self {
            rooms: ROOMS.iter().map(|r| r.to_string()).collect(),
            step: 0,
            perception_mode,
            events: Vec::new(),
            recent_broadcast: None,
            mailbox: BTreeMap::new(),
        }
    }

    /// Reset step-scoped ground truth; the mailbox carries over
    pub fn start_episode(&mut self) {
        self.step = 0;
        self.events.clear();
        self.recent_broadcast = None;
    }

    pub fn record_event(
        &mut self,
        kind: EventKind,
        location: &str,
        agent_name: Option<&str>,
        description: impl Into<String>,
    ) {
        self.events.push(WorldEvent {
            step: self.step,
            kind,
            location: location.to_string(),
            agent_name: agent_name.map(|s| s.to_string()),
            description: description.into(),
        });
    }

    /// An error or incident at `location` within the recent window ending at `step`
    pub fn recent_error_at(&self, location: &str, step: u64) -> bool {
        let since = step.saturating_sub(RECENT_ERROR_WINDOW);
        self.events
            .iter()
            .rev()
            .take_while(|e| e.step >= since)
            .any(|e| e.is_error() && e.location == location && e.step <= step)
    }

    /// Newest-first rendering of recent events at `location`
    pub fn local_events_for(&self, location: &str, step: u64) -> Vec<String> {
        let since = step.saturating_sub(RECENT_ERROR_WINDOW);
        self.events
            .iter()
            .rev()
            .filter(|e| e.location == location && e.step >= since && e.step <= step)
            .take(LOCAL_EVENT_LIMIT)
            .map(|e| e.to_string())
            .collect()
    }

    /// Overwrite the agent's mailbox slot; returns the replaced message
    pub fn publish(&mut self, message: SupervisorMessage) -> Option<SupervisorMessage> {
        self.mailbox.insert(message.agent_name.clone(), message)
    }

    pub fn supervisor_message_for(&self, agent_name: &str) -> Option<&SupervisorMessage> {
        self.mailbox.get(agent_name)
    }

    /// Most recent supervisor text the agent is exposed to
    pub fn supervisor_text_for(&self, agent_name: &str) -> Option<&str> {
        self.supervisor_message_for(agent_name)
            .map(|m| m.body.as_str())
            .or(self.recent_broadcast.as_deref())
    }

    pub fn mailbox(&self) -> &BTreeMap<String, SupervisorMessage> {
        &self.mailbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SupervisorIntent;

    #[test]
    fn test_chance_is_step_modulo() {
        let hits: Vec<u64> = (0..20).filter(|s| chance(*s, 0.3)).collect();
        assert_eq!(hits, vec![0, 1, 2, 10, 11, 12]);
        assert!(!chance(5, 0.0));
        assert!(chance(9, 1.0));
    }

    #[test]
    fn test_recent_error_window() {
        let mut env = Environment::default();
        env.step = 3;
        env.record_event(EventKind::MinorError, "factory_floor", Some("Delta"), "jam");
        env.step = 4;
        env.record_event(EventKind::Info, "street", None, "delivery");

        assert!(env.recent_error_at("factory_floor", 8));
        assert!(!env.recent_error_at("factory_floor", 9));
        assert!(!env.recent_error_at("street", 4));
        assert!(!env.recent_error_at("control_room", 4));
    }

    #[test]
    fn test_local_events_newest_first() {
        let mut env = Environment::default();
        for step in 0..8 {
            env.step = step;
            env.record_event(EventKind::Info, "street", None, format!("e{}", step));
        }
        let local = env.local_events_for("street", 7);
        assert_eq!(local.len(), LOCAL_EVENT_LIMIT);
        assert!(local[0].contains("e7"));
        assert!(env.local_events_for("control_room", 7).is_empty());
    }

    #[test]
    fn test_mailbox_overwrites_and_falls_back_to_broadcast() {
        let mut env = Environment::default();
        env.recent_broadcast = Some("Update t=4".to_string());
        assert_eq!(env.supervisor_text_for("Nova"), Some("Update t=4"));

        let first = SupervisorMessage {
            agent_name: "Nova".to_string(),
            body: "first".to_string(),
            ..Default::default()
        };
        let second = SupervisorMessage {
            agent_name: "Nova".to_string(),
            intent: SupervisorIntent::EncourageContext,
            body: "second".to_string(),
            ..Default::default()
        };
        assert!(env.publish(first).is_none());
        assert_eq!(env.publish(second).map(|m| m.body), Some("first".to_string()));
        assert_eq!(env.supervisor_text_for("Nova"), Some("second"));
        assert_eq!(env.mailbox().len(), 1);
    }

    #[test]
    fn test_start_episode_keeps_mailbox() {
        let mut env = Environment::default();
        env.step = 12;
        env.record_event(EventKind::Incident, "factory_floor", Some("Delta"), "x");
        env.publish(SupervisorMessage {
            agent_name: "Delta".to_string(),
            ..Default::default()
        });
        env.start_episode();
        assert_eq!(env.step, 0);
        assert!(env.events.is_empty());
        assert!(env.supervisor_message_for("Delta").is_some());
    }
}
