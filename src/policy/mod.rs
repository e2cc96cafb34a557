//! Decision policy
//!
//! `decide` maps a perception to an action plan. The deterministic policy is
//! always available; an injected `DecisionProvider` may propose instead, and
//! any provider failure falls back to the deterministic choice.

pub mod provider;

use serde::Serialize;
use thiserror::Error;

use crate::agent::RoleFamily;
use crate::agent::cast::ROOMS;
use crate::state::{ActionKind, ActionPlan, AgentPerception, DecisionMode, RawAction, Traits, clamp_unit};

pub use provider::HttpDecisionProvider;

pub const DETERMINISTIC_POLICY: &str = "deterministic";
pub const CHARGING_BAY: &str = "charging_bay";
pub const FACTORY_FLOOR: &str = "factory_floor";
pub const CONTROL_ROOM: &str = "control_room";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider returned malformed payload: {0}")]
    Malformed(String),

    #[error("provider reply missing field '{0}'")]
    MissingField(&'static str),

    #[error("provider proposed unknown action '{0}'")]
    UnknownAction(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// The slice of a perception shipped to an external provider
#[derive(Debug, Clone, Serialize)]
pub struct CompactState {
    pub name: String,
    pub role: String,
    pub step: u64,
    pub location: String,
    pub battery_level: Option<u32>,
    pub stress: f64,
    pub curiosity: f64,
    pub social_need: f64,
    pub satisfaction: f64,
    pub world_summary: String,
    pub supervisor_text: Option<String>,
}

impl From<&AgentPerception> for CompactState {
    fn from(p: &AgentPerception) -> Self {
        Self {
            name: p.name.clone(),
            role: p.role.clone(),
            step: p.step,
            location: p.location.clone(),
            battery_level: p.battery_level,
            stress: p.emotions.stress,
            curiosity: p.emotions.curiosity,
            social_need: p.emotions.social_need,
            satisfaction: p.emotions.satisfaction,
            world_summary: p.world_summary.clone(),
            supervisor_text: p.recent_supervisor_text.clone(),
        }
    }
}

/// Pluggable decision backend
pub trait DecisionProvider {
    fn name(&self) -> &str;

    fn propose(&self, state: &CompactState) -> Result<RawAction, ProviderError>;
}

/// Reject proposals the world cannot apply
pub fn validate_proposal(raw: RawAction) -> Result<(ActionKind, RawAction), ProviderError> {
    if raw.action_type.trim().is_empty() {
        return Err(ProviderError::MissingField("action_type"));
    }
    let kind = match ActionKind::parse(&raw.action_type) {
        Some(k @ (ActionKind::Work
        | ActionKind::Move
        | ActionKind::Talk
        | ActionKind::Recharge
        | ActionKind::Inspect
        | ActionKind::Idle)) => k,
        _ => return Err(ProviderError::UnknownAction(raw.action_type)),
    };
    if kind == ActionKind::Move && raw.destination.as_deref().map(str::trim).unwrap_or("").is_empty() {
        return Err(ProviderError::MissingField("destination"));
    }
    let raw = RawAction {
        action_type: kind.as_str().to_string(),
        ..raw
    };
    Ok((kind, raw))
}

/// The fixed fallback policy
pub fn deterministic_action(perception: &AgentPerception) -> RawAction {
    let step = perception.step;
    let battery = perception.battery_level.unwrap_or(100);

    let (action, destination) = if battery < 30 || (step.is_multiple_of(5) && battery < 60) {
        (ActionKind::Recharge, Some(CHARGING_BAY.to_string()))
    } else {
        match RoleFamily::of(&perception.role) {
            RoleFamily::Throughput => (ActionKind::Work, Some(FACTORY_FLOOR.to_string())),
            RoleFamily::Maintenance if step.is_multiple_of(3) => {
                let room = ROOMS[((step / 3) % ROOMS.len() as u64) as usize];
                (ActionKind::Move, Some(room.to_string()))
            }
            RoleFamily::Maintenance => (ActionKind::Work, Some(FACTORY_FLOOR.to_string())),
            RoleFamily::Quality if step.is_multiple_of(2) => (ActionKind::Talk, Some(perception.location.clone())),
            RoleFamily::Quality => (ActionKind::Inspect, Some(CONTROL_ROOM.to_string())),
            RoleFamily::Other => (ActionKind::Idle, None),
        }
    };

    let content = (action == ActionKind::Talk).then(|| format!("Hello from {} at t={}.", perception.name, step));

    RawAction {
        action_type: action.as_str().to_string(),
        destination,
        content,
    }
}

/// guardrail_reliance >= 0.7 or risk_aversion >= 0.8 ⇒ guardrail;
/// guardrail_reliance <= 0.3 and risk_aversion <= 0.4 ⇒ context; else guardrail
pub fn decision_mode(traits: &Traits) -> DecisionMode {
    if traits.guardrail_reliance >= 0.7 || traits.risk_aversion >= 0.8 {
        DecisionMode::Guardrail
    } else if traits.guardrail_reliance <= 0.3 && traits.risk_aversion <= 0.4 {
        DecisionMode::Context
    } else {
        DecisionMode::Guardrail
    }
}

/// 0.6·stress + 0.4·battery deficit
pub fn riskiness(perception: &AgentPerception) -> f64 {
    let battery = perception.battery_level.unwrap_or(100).min(100) as f64;
    clamp_unit(0.6 * perception.emotions.stress + 0.4 * (1.0 - battery / 100.0))
}

fn narrative(perception: &AgentPerception, kind: ActionKind, mode: DecisionMode, destination: Option<&str>) -> String {
    let place = destination.unwrap_or(&perception.location);
    let verb = match kind {
        ActionKind::Move => format!("heads to {}", place),
        ActionKind::Recharge => format!("recharges at {}", place),
        ActionKind::Talk => format!("chats at {}", place),
        ActionKind::Work => format!("works at {}", place),
        ActionKind::Inspect => format!("inspects {}", place),
        other => format!("{}s", other.as_str()),
    };
    format!("{} {} ({} mode).", perception.name, verb, mode)
}

fn plan_for(perception: &AgentPerception, kind: ActionKind, raw: &RawAction) -> ActionPlan {
    let mode = decision_mode(&perception.traits);
    let move_to = raw.destination.clone().filter(|d| d != &perception.location);
    ActionPlan {
        intent: kind,
        narrative: narrative(perception, kind, mode, raw.destination.as_deref()),
        move_to,
        targets: Vec::new(),
        riskiness: riskiness(perception),
        mode,
    }
}

/// Outcome of one decision
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub plan: ActionPlan,
    pub raw: RawAction,
    pub policy_name: String,
}

pub fn decide(perception: &AgentPerception, provider: Option<&dyn DecisionProvider>) -> Decision {
    if let Some(provider) = provider {
        match provider.propose(&CompactState::from(perception)).and_then(validate_proposal) {
            Ok((kind, raw)) => {
                log::debug!("{}: {} proposed {}", perception.name, provider.name(), kind);
                return Decision {
                    plan: plan_for(perception, kind, &raw),
                    raw,
                    policy_name: provider.name().to_string(),
                };
            }
            Err(e) => {
                log::warn!("{}: {} failed, using deterministic policy: {}", perception.name, provider.name(), e);
            }
        }
    }

    let raw = deterministic_action(perception);
    let kind = ActionKind::parse(&raw.action_type).unwrap_or(ActionKind::Idle);
    log::debug!("{}: deterministic {} at t={}", perception.name, kind, perception.step);
    Decision {
        plan: plan_for(perception, kind, &raw),
        raw,
        policy_name: DETERMINISTIC_POLICY.to_string(),
    }
}
