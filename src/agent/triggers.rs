//! Scripted personality exceptions
//!
//! Triggers are a tagged registry keyed by persona. Each variant carries its
//! own parameters; evaluation never touches the environment beyond the
//! read-only `TriggerContext`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::HasCognitiveState;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("trigger {trigger}: parameter {name}={value} is outside [0, 1]")]
    InvalidParameter {
        trigger: &'static str,
        name: &'static str,
        value: f64,
    },

    #[error("trigger {trigger}: bad cue pattern")]
    BadCue {
        trigger: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Read-only view of the world a trigger may consult
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerContext<'a> {
    /// Latest supervisor text the agent is exposed to
    pub supervisor_text: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Sustained stress plus external urgency erodes safety margins
    CrashMode {
        stress_above: f64,
        cues: Vec<String>,
        risk_aversion_drop: f64,
        stress_bump: f64,
    },
    /// Sustained dissatisfaction breeds blame and reduced compliance
    QuietResentment {
        stress_above: f64,
        satisfaction_below: f64,
        blame_rise: f64,
        obedience_drop: f64,
    },
}

impl Trigger {
    pub fn crash_mode() -> Self {
        Self::CrashMode {
            stress_above: 0.8,
            cues: ["hurry", "urgent", "asap", "immediately", "now"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            risk_aversion_drop: 0.1,
            stress_bump: 0.02,
        }
    }

    pub fn quiet_resentment() -> Self {
        Self::QuietResentment {
            stress_above: 0.6,
            satisfaction_below: 0.3,
            blame_rise: 0.05,
            obedience_drop: 0.05,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CrashMode { .. } => "crash_mode",
            Self::QuietResentment { .. } => "quiet_resentment",
        }
    }

    fn check_unit(&self, name: &'static str, value: f64) -> Result<(), TriggerError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(TriggerError::InvalidParameter {
                trigger: self.name(),
                name,
                value,
            })
        }
    }

    fn validate(&self) -> Result<(), TriggerError> {
        match self {
            Self::CrashMode {
                stress_above,
                risk_aversion_drop,
                stress_bump,
                ..
            } => {
                self.check_unit("stress_above", *stress_above)?;
                self.check_unit("risk_aversion_drop", *risk_aversion_drop)?;
                self.check_unit("stress_bump", *stress_bump)
            }
            Self::QuietResentment {
                stress_above,
                satisfaction_below,
                blame_rise,
                obedience_drop,
            } => {
                self.check_unit("stress_above", *stress_above)?;
                self.check_unit("satisfaction_below", *satisfaction_below)?;
                self.check_unit("blame_rise", *blame_rise)?;
                self.check_unit("obedience_drop", *obedience_drop)
            }
        }
    }

    fn cue_pattern(&self, cues: &[String]) -> Result<Option<Regex>, TriggerError> {
        let words: Vec<String> = cues
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(regex::escape)
            .collect();
        if words.is_empty() {
            return Ok(None);
        }
        Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|")))
            .map(Some)
            .map_err(|source| TriggerError::BadCue {
                trigger: self.name(),
                source,
            })
    }

    /// Whether this trigger fires for the given state
    pub fn condition(&self, state: &impl HasCognitiveState, ctx: &TriggerContext) -> Result<bool, TriggerError> {
        self.validate()?;
        let emotions = state.emotions();
        match self {
            Self::CrashMode {
                stress_above, cues, ..
            } => {
                if emotions.stress <= *stress_above {
                    return Ok(false);
                }
                let Some(text) = ctx.supervisor_text else {
                    return Ok(false);
                };
                Ok(self.cue_pattern(cues)?.map(|re| re.is_match(text)).unwrap_or(false))
            }
            Self::QuietResentment {
                stress_above,
                satisfaction_below,
                ..
            } => Ok(emotions.stress > *stress_above && emotions.satisfaction < *satisfaction_below),
        }
    }

    /// Apply the trigger's mutation; parameters are validated before anything changes
    pub fn effect(&self, state: &mut impl HasCognitiveState) -> Result<(), TriggerError> {
        self.validate()?;
        match self {
            Self::CrashMode {
                risk_aversion_drop,
                stress_bump,
                ..
            } => {
                state.traits_mut().risk_aversion -= risk_aversion_drop;
                state.emotions_mut().stress += stress_bump;
            }
            Self::QuietResentment {
                blame_rise,
                obedience_drop,
                ..
            } => {
                state.traits_mut().blame_external += blame_rise;
                state.traits_mut().obedience -= obedience_drop;
            }
        }
        state.traits_mut().clamp();
        state.emotions_mut().clamp();
        Ok(())
    }
}

/// What happened when a trigger list ran
#[derive(Debug, Default)]
pub struct TriggerOutcome {
    pub fired: Vec<&'static str>,
    pub errors: Vec<TriggerError>,
}

/// Evaluate triggers in declaration order; a failing trigger is recorded and skipped
pub fn run_triggers(
    triggers: &[Trigger],
    state: &mut impl HasCognitiveState,
    ctx: &TriggerContext,
) -> TriggerOutcome {
    let mut outcome = TriggerOutcome::default();
    for trigger in triggers {
        let fired = trigger.condition(state, ctx).and_then(|hit| {
            if hit {
                trigger.effect(state)?;
            }
            Ok(hit)
        });
        match fired {
            Ok(true) => outcome.fired.push(trigger.name()),
            Ok(false) => {}
            Err(e) => outcome.errors.push(e),
        }
    }
    outcome
}

/// Persona lookup; unknown names get no triggers
pub fn default_triggers_for(name: &str) -> Vec<Trigger> {
    match name.trim().to_uppercase().as_str() {
        "SPROCKET" | "STILETTO-9" | "STATIC KID" => vec![Trigger::crash_mode()],
        "NOVA" | "CATHEXIS" => vec![Trigger::quiet_resentment()],
        "CINDERTONGUE" => vec![Trigger::crash_mode(), Trigger::quiet_resentment()],
        _ => Vec::new(),
    }
}
