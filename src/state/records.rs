//! Perceptions, plans and the durable log records
//!
//! Field names and shapes here are the JSONL wire format. Readers are
//! forgiving: every record derives `Default` and uses `#[serde(default)]`, so
//! a line missing optional keys still parses. Lines that are not JSON objects
//! of the right shape are rejected by serde and skipped by the readers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::emotions::{EmotionState, Traits};

fn is_false(b: &bool) -> bool {
    !*b
}

/// Fidelity regime under which a perception was constructed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerceptionMode {
    #[default]
    Accurate,
    Partial,
    Spin,
}

impl PerceptionMode {
    /// Parse a mode name, falling back to `Accurate` for anything unknown
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "partial" => Self::Partial,
            "spin" => Self::Spin,
            "accurate" => Self::Accurate,
            other => {
                log::debug!("Unknown perception mode '{}', using accurate", other);
                Self::Accurate
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accurate => "accurate",
            Self::Partial => "partial",
            Self::Spin => "spin",
        }
    }
}

impl fmt::Display for PerceptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a decision leaned on policy or on situational judgment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    #[default]
    Guardrail,
    Context,
}

impl DecisionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guardrail => "guardrail",
            Self::Context => "context",
        }
    }
}

impl fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action vocabulary understood by the emotion engine and the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Work,
    Move,
    Talk,
    Recharge,
    Inspect,
    Idle,
    Coach,
    Broadcast,
}

impl ActionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "work" => Some(Self::Work),
            "move" => Some(Self::Move),
            "talk" => Some(Self::Talk),
            "recharge" => Some(Self::Recharge),
            "inspect" => Some(Self::Inspect),
            "idle" => Some(Self::Idle),
            "coach" => Some(Self::Coach),
            "broadcast" => Some(Self::Broadcast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Move => "move",
            Self::Talk => "talk",
            Self::Recharge => "recharge",
            Self::Inspect => "inspect",
            Self::Idle => "idle",
            Self::Coach => "coach",
            Self::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the supervisor actually meant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorIntent {
    TightenGuardrails,
    EncourageContext,
    #[default]
    NeutralUpdate,
}

impl SupervisorIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TightenGuardrails => "tighten_guardrails",
            Self::EncourageContext => "encourage_context",
            Self::NeutralUpdate => "neutral_update",
        }
    }
}

impl fmt::Display for SupervisorIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an agent reads the supervisor's intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerceivedIntent {
    Punitive,
    Protective,
    Strict,
    Reckless,
    Empowering,
    Supportive,
    Apathetic,
    Steady,
}

impl PerceivedIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Punitive => "punitive",
            Self::Protective => "protective",
            Self::Strict => "strict",
            Self::Reckless => "reckless",
            Self::Empowering => "empowering",
            Self::Supportive => "supportive",
            Self::Apathetic => "apathetic",
            Self::Steady => "steady",
        }
    }
}

impl fmt::Display for PerceivedIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent's subjective inference about a supervisor message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorIntentBelief {
    pub true_intent: SupervisorIntent,
    pub perceived_intent: PerceivedIntent,
    pub confidence: f64,
    pub notes: String,
}

/// What the environment tells an agent at one step
///
/// Built fresh every step; shaping produces a new value and never touches
/// the agent it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPerception {
    pub step: u64,
    pub name: String,
    pub role: String,
    pub location: String,
    pub battery_level: Option<u32>,
    pub emotions: EmotionState,
    pub traits: Traits,
    pub world_summary: String,
    pub personal_recent_summary: String,
    pub local_events: Vec<String>,
    pub recent_supervisor_text: Option<String>,
    pub supervisor_intent: Option<SupervisorIntentBelief>,
    pub perception_mode: PerceptionMode,
}

/// Legacy action dict: `{action_type, destination?, content?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAction {
    pub action_type: String,
    pub destination: Option<String>,
    pub content: Option<String>,
}

/// Decision output for one agent at one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub intent: ActionKind,
    pub move_to: Option<String>,
    pub targets: Vec<String>,
    pub riskiness: f64,
    pub mode: DecisionMode,
    pub narrative: String,
}

/// One durable step event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionLogEntry {
    pub step: u64,
    pub agent_name: String,
    pub role: String,
    pub mode: DecisionMode,
    pub intent: String,
    pub move_to: Option<String>,
    pub targets: Vec<String>,
    pub riskiness: f64,
    pub narrative: String,
    pub outcome: Option<String>,
    pub raw_action: RawAction,
    pub perception: AgentPerception,
    pub policy_name: Option<String>,
    pub episode_index: Option<i64>,
    pub day_index: Option<i64>,
}

impl ActionLogEntry {
    /// Assemble an entry from the step's perception, plan and applied action
    pub fn from_step(
        perception: &AgentPerception,
        plan: &ActionPlan,
        raw_action: RawAction,
        outcome: Option<String>,
        policy_name: Option<String>,
    ) -> Self {
        Self {
            step: perception.step,
            agent_name: perception.name.clone(),
            role: perception.role.clone(),
            mode: plan.mode,
            intent: plan.intent.as_str().to_string(),
            move_to: plan.move_to.clone(),
            targets: plan.targets.clone(),
            riskiness: plan.riskiness,
            narrative: plan.narrative.clone(),
            outcome,
            raw_action,
            perception: perception.clone(),
            policy_name,
            episode_index: None,
            day_index: None,
        }
    }

    pub fn with_labels(mut self, episode_index: Option<i64>, day_index: Option<i64>) -> Self {
        self.episode_index = episode_index;
        self.day_index = day_index;
        self
    }

    pub fn is_incident(&self) -> bool {
        self.outcome
            .as_deref()
            .map(|o| o.trim().eq_ignore_ascii_case("incident"))
            .unwrap_or(false)
    }
}

/// Qualitative tags derived from a day's telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionTags {
    #[serde(skip_serializing_if = "is_false")]
    pub regretted_obedience: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub regretted_risk: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub validated_context: bool,
}

impl ReflectionTags {
    pub fn is_empty(&self) -> bool {
        !(self.regretted_obedience || self.regretted_risk || self.validated_context)
    }

    /// The single label that drove the reflection text
    pub fn label(&self) -> &'static str {
        if self.regretted_obedience {
            "regretted_obedience"
        } else if self.regretted_risk {
            "regretted_risk"
        } else if self.validated_context {
            "validated_context"
        } else {
            "routine"
        }
    }
}

/// End-of-day self assessment for one agent
///
/// Identity fields are carried in memory only; on disk they live on the
/// enclosing `ReflectionLogEntry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentReflection {
    #[serde(skip)]
    pub agent_name: String,
    #[serde(skip)]
    pub role: String,
    pub summary_of_day: String,
    pub self_assessment: String,
    pub intended_changes: String,
    pub tags: ReflectionTags,
    pub perception_mode: Option<PerceptionMode>,
    pub supervisor_perceived_intent: Option<String>,
}

/// Reflection as written to the reflection stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionLogEntry {
    pub agent_name: String,
    pub role: String,
    pub day_index: Option<i64>,
    pub reflection: AgentReflection,
    pub traits_after: Traits,
    pub perception_mode: Option<PerceptionMode>,
    pub supervisor_perceived_intent: Option<String>,
    pub episode_index: Option<i64>,
}

impl ReflectionLogEntry {
    pub fn new(
        reflection: &AgentReflection,
        day_index: i64,
        episode_index: Option<i64>,
        traits_after: Traits,
    ) -> Self {
        Self {
            agent_name: reflection.agent_name.clone(),
            role: reflection.role.clone(),
            day_index: Some(day_index),
            reflection: reflection.clone(),
            traits_after,
            perception_mode: reflection.perception_mode,
            supervisor_perceived_intent: reflection.supervisor_perceived_intent.clone(),
            episode_index,
        }
    }

    /// The logged reflection with its identity restored
    pub fn to_reflection(&self) -> AgentReflection {
        AgentReflection {
            agent_name: self.agent_name.clone(),
            role: self.role.clone(),
            ..self.reflection.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTags {
    #[serde(skip_serializing_if = "is_false")]
    pub risk_warning: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub blaming: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub encouraging_context: bool,
}

/// Supervisor feedback for one agent after one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorMessage {
    pub agent_name: String,
    pub role: String,
    pub day_index: Option<i64>,
    pub intent: SupervisorIntent,
    pub body: String,
    pub episode_index: Option<i64>,
    pub tags: MessageTags,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_log_entry_labels_survive_value_roundtrip() {
        let entry = ActionLogEntry {
            step: 5,
            agent_name: "R-99".to_string(),
            role: "maintenance".to_string(),
            intent: "inspect".to_string(),
            riskiness: 0.1,
            narrative: "n".to_string(),
            ..Default::default()
        }
        .with_labels(Some(7), Some(1));

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["episode_index"], 7);
        assert_eq!(value["day_index"], 1);

        let back = serde_json::from_value::<ActionLogEntry>(value).unwrap();
        assert_eq!(back.episode_index, Some(7));
        assert_eq!(back.day_index, Some(1));
        assert_eq!(back, entry);
    }

    #[test]
    fn test_action_log_entry_tolerates_sparse_rows() {
        let row = json!({
            "step": 10,
            "agent_name": "A",
            "role": "maintenance",
            "mode": "context",
            "intent": "inspect",
            "move_to": null,
            "targets": [],
            "riskiness": 0.4,
            "narrative": "",
            "outcome": "incident",
            "raw_action": {},
            "perception": {}
        });
        let entry = serde_json::from_value::<ActionLogEntry>(row).unwrap();
        assert_eq!(entry.mode, DecisionMode::Context);
        assert!(entry.is_incident());
        assert_eq!(entry.episode_index, None);
        assert_eq!(entry.perception.perception_mode, PerceptionMode::Accurate);
    }

    #[test]
    fn test_action_log_entry_serializes_absent_labels_as_null() {
        let value = serde_json::to_value(ActionLogEntry::default()).unwrap();
        assert!(value["episode_index"].is_null());
        assert!(value["day_index"].is_null());
        assert!(value["outcome"].is_null());
    }

    #[test]
    fn test_reflection_tags_only_serialize_true_keys() {
        let tags = ReflectionTags {
            regretted_risk: true,
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(tags).unwrap(), json!({"regretted_risk": true}));
        assert_eq!(tags.label(), "regretted_risk");
        assert!(ReflectionTags::default().is_empty());
    }

    #[test]
    fn test_perception_mode_parse_lossy() {
        assert_eq!(PerceptionMode::parse_lossy("Spin"), PerceptionMode::Spin);
        assert_eq!(PerceptionMode::parse_lossy(" partial "), PerceptionMode::Partial);
        assert_eq!(PerceptionMode::parse_lossy("hallucinate"), PerceptionMode::Accurate);
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!(ActionKind::parse("RECHARGE"), Some(ActionKind::Recharge));
        assert_eq!(ActionKind::parse("teleport"), None);
    }

    #[test]
    fn test_reflection_log_entry_restores_identity() {
        let reflection = AgentReflection {
            agent_name: "Nova".to_string(),
            role: "qa".to_string(),
            summary_of_day: "s".to_string(),
            ..Default::default()
        };
        let entry = ReflectionLogEntry::new(&reflection, 2, Some(42), Traits::default());
        let line = serde_json::to_string(&entry).unwrap();
        assert!(!line.contains("\"reflection\":{\"agent_name\""));

        let parsed: ReflectionLogEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.episode_index, Some(42));
        assert_eq!(parsed.day_index, Some(2));
        assert_eq!(parsed.to_reflection().agent_name, "Nova");
    }
}
