//! Emotion and trait scalars
//!
//! Every scalar lives in [0, 1]. Mutating code calls `clamp()` when done.

use serde::{Deserialize, Serialize};

/// Clamp a scalar into [0, 1]; NaN collapses to 0
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Short-timescale affective state, updated every step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionState {
    pub stress: f64,
    pub curiosity: f64,
    pub social_need: f64,
    pub satisfaction: f64,
}

impl Default for EmotionState {
    fn default() -> Self {
        Self {
            stress: 0.2,
            curiosity: 0.5,
            social_need: 0.5,
            satisfaction: 0.5,
        }
    }
}

impl EmotionState {
    pub fn new(stress: f64, curiosity: f64, social_need: f64, satisfaction: f64) -> Self {
        let mut state = Self {
            stress,
            curiosity,
            social_need,
            satisfaction,
        };
        state.clamp();
        state
    }

    pub fn clamp(&mut self) {
        self.stress = clamp_unit(self.stress);
        self.curiosity = clamp_unit(self.curiosity);
        self.social_need = clamp_unit(self.social_need);
        self.satisfaction = clamp_unit(self.satisfaction);
    }

    pub fn is_clamped(&self) -> bool {
        [self.stress, self.curiosity, self.social_need, self.satisfaction]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

/// Long-timescale personality scalars
///
/// Only reflection drift and scripted triggers move these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Traits {
    pub risk_aversion: f64,
    pub obedience: f64,
    pub ambition: f64,
    pub empathy: f64,
    pub blame_external: f64,
    pub guardrail_reliance: f64,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            risk_aversion: 0.5,
            obedience: 0.5,
            ambition: 0.5,
            empathy: 0.5,
            blame_external: 0.5,
            guardrail_reliance: 0.5,
        }
    }
}

impl Traits {
    pub fn clamp(&mut self) {
        self.risk_aversion = clamp_unit(self.risk_aversion);
        self.obedience = clamp_unit(self.obedience);
        self.ambition = clamp_unit(self.ambition);
        self.empathy = clamp_unit(self.empathy);
        self.blame_external = clamp_unit(self.blame_external);
        self.guardrail_reliance = clamp_unit(self.guardrail_reliance);
    }

    pub fn is_clamped(&self) -> bool {
        [
            self.risk_aversion,
            self.obedience,
            self.ambition,
            self.empathy,
            self.blame_external,
            self.guardrail_reliance,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }

    /// Named view used by reports to diff two trait snapshots
    pub fn as_pairs(&self) -> [(&'static str, f64); 6] {
        [
            ("risk_aversion", self.risk_aversion),
            ("obedience", self.obedience),
            ("ambition", self.ambition),
            ("empathy", self.empathy),
            ("blame_external", self.blame_external),
            ("guardrail_reliance", self.guardrail_reliance),
        ]
    }
}
