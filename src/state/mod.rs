//! Typed records shared by every engine
//!
//! Cognitive state (emotions, traits), per-step perceptions and plans, and the
//! durable log records (actions, reflections, supervisor messages).
//! Nothing in here has behavior beyond clamping and (de)serialization.

pub mod emotions;
pub mod records;

pub use emotions::{EmotionState, Traits, clamp_unit};
pub use records::{
    ActionKind, ActionLogEntry, ActionPlan, AgentPerception, AgentReflection, DecisionMode, MessageTags,
    PerceivedIntent, PerceptionMode, RawAction, ReflectionLogEntry, ReflectionTags, SupervisorIntent,
    SupervisorIntentBelief, SupervisorMessage,
};

/// Anything with a name and a role
pub trait HasIdentity {
    fn name(&self) -> &str;
    fn role(&self) -> &str;
}

/// Anything carrying emotions and traits
pub trait HasCognitiveState {
    fn emotions(&self) -> &EmotionState;
    fn emotions_mut(&mut self) -> &mut EmotionState;
    fn traits(&self) -> &Traits;
    fn traits_mut(&mut self) -> &mut Traits;
}

/// Anything with a place in the world
pub trait Embodied {
    fn location(&self) -> &str;

    /// Battery percentage, `None` for agents without one
    fn battery_level(&self) -> Option<u32> {
        None
    }
}
