//! Robot agents
//!
//! A `RobotAgent` owns its cognitive state for the whole run. The engines in
//! this module mutate it: `affect` every step, `triggers` right after, and
//! trait drift once per day from the reflection engine.

pub mod affect;
pub mod cast;
pub mod store;
pub mod triggers;

use crate::state::{ActionKind, Embodied, EmotionState, HasCognitiveState, HasIdentity, Traits};

pub use affect::{StepContext, drift_traits, update_emotions};
pub use cast::{RoleFamily, initial_robots};
pub use store::{AgentRecord, AgentStore};
pub use triggers::{Trigger, TriggerContext, TriggerOutcome, default_triggers_for, run_triggers};

pub const BATTERY_MAX: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct RobotAgent {
    pub name: String,
    pub role: String,
    pub location: String,
    pub battery_level: u32,
    pub emotions: EmotionState,
    pub traits: Traits,
    pub triggers: Vec<Trigger>,
}

impl RobotAgent {
    /// New robot at full battery with default state and persona triggers
    pub fn new(name: impl Into<String>, role: impl Into<String>, location: impl Into<String>) -> Self {
        let name = name.into();
        let triggers = default_triggers_for(&name);
        Self {
            name,
            role: role.into(),
            location: location.into(),
            battery_level: BATTERY_MAX,
            emotions: EmotionState::default(),
            traits: Traits::default(),
            triggers,
        }
    }

    pub fn with_traits(mut self, traits: Traits) -> Self {
        self.traits = traits;
        self.traits.clamp();
        self
    }

    pub fn with_emotions(mut self, emotions: EmotionState) -> Self {
        self.emotions = emotions;
        self.emotions.clamp();
        self
    }

    /// Battery bookkeeping for an applied action
    pub fn drain_battery(&mut self, action: ActionKind) {
        self.battery_level = match action {
            ActionKind::Recharge => (self.battery_level + 20).min(BATTERY_MAX),
            ActionKind::Move => self.battery_level.saturating_sub(5),
            ActionKind::Work => self.battery_level.saturating_sub(10),
            ActionKind::Talk => self.battery_level.saturating_sub(2),
            _ => self.battery_level,
        };
    }

    /// Step emotion update followed by this robot's triggers
    pub fn update_state(&mut self, action: ActionKind, context: StepContext, trigger_ctx: &TriggerContext) -> TriggerOutcome {
        self.emotions = update_emotions(&self.emotions, action, context);
        let triggers = std::mem::take(&mut self.triggers);
        let outcome = run_triggers(&triggers, self, trigger_ctx);
        self.triggers = triggers;
        for err in &outcome.errors {
            log::warn!("{}: trigger skipped: {}", self.name, err);
        }
        outcome
    }
}

impl HasIdentity for RobotAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> &str {
        &self.role
    }
}

impl HasCognitiveState for RobotAgent {
    fn emotions(&self) -> &EmotionState {
        &self.emotions
    }

    fn emotions_mut(&mut self) -> &mut EmotionState {
        &mut self.emotions
    }

    fn traits(&self) -> &Traits {
        &self.traits
    }

    fn traits_mut(&mut self) -> &mut Traits {
        &mut self.traits
    }
}

impl Embodied for RobotAgent {
    fn location(&self) -> &str {
        &self.location
    }

    fn battery_level(&self) -> Option<u32> {
        Some(self.battery_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_bounds() {
        let mut robot = RobotAgent::new("Delta", "optimizer", "factory_floor");
        robot.drain_battery(ActionKind::Recharge);
        assert_eq!(robot.battery_level, 100);

        robot.battery_level = 4;
        robot.drain_battery(ActionKind::Work);
        assert_eq!(robot.battery_level, 0);
        robot.drain_battery(ActionKind::Recharge);
        assert_eq!(robot.battery_level, 20);
        robot.drain_battery(ActionKind::Idle);
        assert_eq!(robot.battery_level, 20);
    }

    #[test]
    fn test_update_state_runs_triggers_after_emotions() {
        let mut robot = RobotAgent::new("Sprocket", "maintenance", "factory_floor")
            .with_emotions(EmotionState::new(0.78, 0.5, 0.5, 0.5));
        let ctx = TriggerContext {
            supervisor_text: Some("Please hurry, but consider a short recharge."),
        };
        // work pushes stress over the crash-mode threshold before triggers run
        let out = robot.update_state(ActionKind::Work, StepContext::default(), &ctx);

        assert_eq!(out.fired, vec!["crash_mode"]);
        assert!(robot.traits.risk_aversion < 0.5);
        assert_eq!(robot.triggers.len(), 1);
    }

    #[test]
    fn test_capabilities() {
        let robot = RobotAgent::new("Nova", "qa", "control_room");
        assert_eq!(robot.name(), "Nova");
        assert_eq!(robot.location(), "control_room");
        assert_eq!(Embodied::battery_level(&robot), Some(100));
    }
}
