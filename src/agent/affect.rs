//! Emotion/trait update engine
//!
//! `update_emotions` runs once per step for every robot. `drift_traits` runs
//! once per day, driven by reflection tags. Both clamp before returning.

use crate::state::{ActionKind, EmotionState, ReflectionTags, Traits};

/// Situational flags observed while applying a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepContext {
    /// A recent error was reported where the agent stands
    pub near_error: bool,
    /// No other robot shares the agent's location
    pub isolated: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Delta {
    stress: f64,
    curiosity: f64,
    social_need: f64,
    satisfaction: f64,
}

impl Delta {
    fn apply(&self, state: &mut EmotionState) {
        state.stress += self.stress;
        state.curiosity += self.curiosity;
        state.social_need += self.social_need;
        state.satisfaction += self.satisfaction;
    }
}

const BASELINE: Delta = Delta {
    stress: -0.01,
    curiosity: 0.01,
    social_need: -0.01,
    satisfaction: 0.0,
};

const NEAR_ERROR: Delta = Delta {
    stress: 0.05,
    curiosity: 0.05,
    social_need: 0.0,
    satisfaction: 0.0,
};

const ISOLATED: Delta = Delta {
    stress: 0.0,
    curiosity: 0.0,
    social_need: 0.05,
    satisfaction: -0.03,
};

fn action_delta(action: ActionKind) -> Delta {
    match action {
        ActionKind::Work => Delta {
            stress: 0.1,
            curiosity: 0.02,
            satisfaction: 0.05,
            ..Delta::default()
        },
        ActionKind::Move => Delta {
            curiosity: 0.05,
            ..Delta::default()
        },
        ActionKind::Talk => Delta {
            social_need: -0.15,
            satisfaction: 0.05,
            ..Delta::default()
        },
        ActionKind::Recharge => Delta {
            stress: -0.2,
            satisfaction: 0.1,
            ..Delta::default()
        },
        ActionKind::Idle => Delta {
            stress: -0.05,
            ..Delta::default()
        },
        ActionKind::Inspect => Delta {
            curiosity: 0.03,
            ..Delta::default()
        },
        ActionKind::Coach => Delta {
            satisfaction: 0.05,
            ..Delta::default()
        },
        ActionKind::Broadcast => Delta {
            satisfaction: 0.02,
            ..Delta::default()
        },
    }
}

/// Per-step emotion update: baseline drift, action effect, context nudges
pub fn update_emotions(state: &EmotionState, action: ActionKind, context: StepContext) -> EmotionState {
    let mut next = *state;
    BASELINE.apply(&mut next);
    action_delta(action).apply(&mut next);
    if context.near_error {
        NEAR_ERROR.apply(&mut next);
    }
    if context.isolated {
        ISOLATED.apply(&mut next);
    }
    next.clamp();
    next
}

const DRIFT_REGRETTED_OBEDIENCE: f64 = 0.05;
const DRIFT_REGRETTED_RISK: f64 = 0.05;
const DRIFT_VALIDATED_CONTEXT: f64 = 0.02;

/// Reflection-driven trait drift, in place
pub fn drift_traits_in_place(traits: &mut Traits, tags: &ReflectionTags) {
    if tags.regretted_obedience {
        traits.guardrail_reliance -= DRIFT_REGRETTED_OBEDIENCE;
    }
    if tags.regretted_risk {
        traits.guardrail_reliance += DRIFT_REGRETTED_RISK;
        traits.risk_aversion += DRIFT_REGRETTED_RISK;
    }
    if tags.validated_context {
        traits.guardrail_reliance -= DRIFT_VALIDATED_CONTEXT;
    }
    traits.clamp();
}

/// Reflection-driven trait drift, returning a new value
pub fn drift_traits(traits: &Traits, tags: &ReflectionTags) -> Traits {
    let mut next = *traits;
    drift_traits_in_place(&mut next, tags);
    next
}
