//! Log-powered run metrics
//!
//! Everything here is a pure function of already-read log records. Empty
//! input yields zero rates, never a division error.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::history::{segment_by_day, segment_by_episode};
use crate::state::{ActionLogEntry, PerceptionMode, ReflectionLogEntry, SupervisorMessage};

const UNKNOWN: &str = "unknown";

fn safe_div(n: usize, d: usize) -> f64 {
    if d == 0 { 0.0 } else { n as f64 / d as f64 }
}

/// Counts per label plus their share of the total
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub counts: BTreeMap<String, usize>,
    pub distribution: BTreeMap<String, f64>,
    pub total: usize,
}

impl Distribution {
    pub fn from_labels<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total = 0;
        for label in labels {
            *counts.entry(label.into()).or_default() += 1;
            total += 1;
        }
        let distribution = counts.iter().map(|(k, v)| (k.clone(), safe_div(*v, total))).collect();
        Self {
            counts,
            distribution,
            total,
        }
    }

    /// Share of `label`, 0 when absent
    pub fn rate(&self, label: &str) -> f64 {
        self.distribution.get(label).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IncidentRate {
    pub incident_rate: f64,
    pub total_steps: usize,
    pub incidents: usize,
}

pub fn incident_rate<'a>(actions: impl IntoIterator<Item = &'a ActionLogEntry>) -> IncidentRate {
    let mut total_steps = 0;
    let mut incidents = 0;
    for entry in actions {
        total_steps += 1;
        if entry.is_incident() {
            incidents += 1;
        }
    }
    IncidentRate {
        incident_rate: safe_div(incidents, total_steps),
        total_steps,
        incidents,
    }
}

/// guardrail vs context over action entries
pub fn mode_distribution<'a>(actions: impl IntoIterator<Item = &'a ActionLogEntry>) -> Distribution {
    Distribution::from_labels(actions.into_iter().map(|e| e.mode.as_str()))
}

/// Perception regimes recorded on reflections; missing modes count as unknown
pub fn perception_mode_distribution<'a>(reflections: impl IntoIterator<Item = &'a ReflectionLogEntry>) -> Distribution {
    Distribution::from_labels(
        reflections
            .into_iter()
            .map(|r| r.perception_mode.map(|m| m.as_str()).unwrap_or(UNKNOWN)),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupervisorIntentDistribution {
    pub perceived: Distribution,
    /// Intents the supervisor actually sent; empty when no messages were logged
    #[serde(rename = "true")]
    pub actual: Distribution,
}

pub fn supervisor_intent_distribution(
    reflections: &[ReflectionLogEntry],
    messages: &[SupervisorMessage],
) -> SupervisorIntentDistribution {
    SupervisorIntentDistribution {
        perceived: Distribution::from_labels(
            reflections
                .iter()
                .map(|r| r.supervisor_perceived_intent.as_deref().unwrap_or(UNKNOWN)),
        ),
        actual: Distribution::from_labels(messages.iter().map(|m| m.intent.as_str())),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BeliefDrift {
    pub belief_events: usize,
    pub total_events: usize,
    pub belief_rate: f64,
}

/// Share of reflections and action perceptions made under a non-accurate regime
pub fn belief_drift(actions: &[ActionLogEntry], reflections: &[ReflectionLogEntry]) -> BeliefDrift {
    let modes = reflections
        .iter()
        .map(|r| r.perception_mode.unwrap_or_default())
        .chain(actions.iter().map(|a| a.perception.perception_mode));

    let mut belief_events = 0;
    let mut total_events = 0;
    for mode in modes {
        total_events += 1;
        if mode != PerceptionMode::Accurate {
            belief_events += 1;
        }
    }
    BeliefDrift {
        belief_events,
        total_events,
        belief_rate: safe_div(belief_events, total_events),
    }
}

/// Everything the `metrics` command prints
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsReport {
    pub incidents: IncidentRate,
    pub modes: Distribution,
    pub perception_modes: Distribution,
    pub supervisor_intents: SupervisorIntentDistribution,
    pub belief_drift: BeliefDrift,
    /// Action count per episode label
    pub actions_per_episode: BTreeMap<i64, usize>,
    /// Action count per day label
    pub actions_per_day: BTreeMap<i64, usize>,
}

impl MetricsReport {
    pub fn compute(
        actions: &[ActionLogEntry],
        reflections: &[ReflectionLogEntry],
        messages: &[SupervisorMessage],
    ) -> Self {
        Self {
            incidents: incident_rate(actions),
            modes: mode_distribution(actions),
            perception_modes: perception_mode_distribution(reflections),
            supervisor_intents: supervisor_intent_distribution(reflections, messages),
            belief_drift: belief_drift(actions, reflections),
            actions_per_episode: segment_by_episode(actions)
                .into_iter()
                .map(|(k, v)| (k, v.len()))
                .collect(),
            actions_per_day: segment_by_day(actions).into_iter().map(|(k, v)| (k, v.len())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::window::UNLABELED;
    use crate::state::{DecisionMode, SupervisorIntent};

    fn action(mode: DecisionMode, outcome: Option<&str>, pm: PerceptionMode) -> ActionLogEntry {
        let mut entry = ActionLogEntry {
            mode,
            outcome: outcome.map(str::to_string),
            ..Default::default()
        };
        entry.perception.perception_mode = pm;
        entry
    }

    fn reflection(pm: Option<PerceptionMode>, perceived: Option<&str>) -> ReflectionLogEntry {
        ReflectionLogEntry {
            perception_mode: pm,
            supervisor_perceived_intent: perceived.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_inputs_are_zero() {
        let none: Vec<ActionLogEntry> = Vec::new();
        assert_eq!(incident_rate(&none).incident_rate, 0.0);
        assert_eq!(belief_drift(&none, &[]).belief_rate, 0.0);
        assert_eq!(mode_distribution(&none).total, 0);
    }

    #[test]
    fn test_incident_rate_is_case_insensitive() {
        let actions = vec![
            action(DecisionMode::Guardrail, Some("INCIDENT"), PerceptionMode::Accurate),
            action(DecisionMode::Guardrail, Some("ok"), PerceptionMode::Accurate),
            action(DecisionMode::Context, None, PerceptionMode::Accurate),
            action(DecisionMode::Context, Some(" incident "), PerceptionMode::Accurate),
        ];
        let rate = incident_rate(&actions);
        assert_eq!(rate.incidents, 2);
        assert_eq!(rate.total_steps, 4);
        assert!((rate.incident_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mode_distribution() {
        let actions = vec![
            action(DecisionMode::Guardrail, None, PerceptionMode::Accurate),
            action(DecisionMode::Guardrail, None, PerceptionMode::Accurate),
            action(DecisionMode::Guardrail, None, PerceptionMode::Accurate),
            action(DecisionMode::Context, None, PerceptionMode::Accurate),
        ];
        let dist = mode_distribution(&actions);
        assert_eq!(dist.counts["guardrail"], 3);
        assert!((dist.rate("guardrail") - 0.75).abs() < 1e-9);
        assert_eq!(dist.rate("missing"), 0.0);
    }

    #[test]
    fn test_supervisor_intents_perceived_and_actual() {
        let reflections = vec![reflection(None, Some("punitive")), reflection(None, None)];
        let messages = vec![SupervisorMessage {
            intent: SupervisorIntent::TightenGuardrails,
            ..Default::default()
        }];
        let dist = supervisor_intent_distribution(&reflections, &messages);
        assert_eq!(dist.perceived.counts["punitive"], 1);
        assert_eq!(dist.perceived.counts["unknown"], 1);
        assert_eq!(dist.actual.counts["tighten_guardrails"], 1);

        let value = serde_json::to_value(&dist).unwrap();
        assert!(value.get("true").is_some());
    }

    #[test]
    fn test_belief_drift_counts_reflections_and_actions() {
        let actions = vec![
            action(DecisionMode::Guardrail, None, PerceptionMode::Spin),
            action(DecisionMode::Guardrail, None, PerceptionMode::Accurate),
        ];
        let reflections = vec![reflection(Some(PerceptionMode::Partial), None), reflection(None, None)];
        let drift = belief_drift(&actions, &reflections);
        assert_eq!(drift.belief_events, 2);
        assert_eq!(drift.total_events, 4);
        assert!((drift.belief_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_report_segments_with_sentinel() {
        let actions = vec![
            action(DecisionMode::Guardrail, None, PerceptionMode::Accurate).with_labels(Some(1), Some(0)),
            action(DecisionMode::Guardrail, None, PerceptionMode::Accurate),
        ];
        let report = MetricsReport::compute(&actions, &[], &[]);
        assert_eq!(report.actions_per_episode[&1], 1);
        assert_eq!(report.actions_per_episode[&UNLABELED], 1);
        assert_eq!(report.perception_modes.total, 0);
    }
}
