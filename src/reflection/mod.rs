//! End-of-day reflection
//!
//! Reads only logged action entries, never live agent state. Counts become
//! tags, tags become template text and trait drift.

use std::collections::BTreeMap;

use crate::agent::drift_traits;
use crate::state::{
    ActionLogEntry, AgentReflection, DecisionMode, HasCognitiveState, HasIdentity, PerceptionMode, ReflectionTags,
    Traits,
};

/// Telemetry for one agent over one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    pub total: usize,
    pub guardrail: usize,
    pub context: usize,
    pub incidents: usize,
}

pub fn summarize_agent_day(agent_name: &str, entries: &[&ActionLogEntry]) -> DayCounts {
    let mut counts = DayCounts::default();
    for entry in entries.iter().filter(|e| e.agent_name == agent_name) {
        counts.total += 1;
        match entry.mode {
            DecisionMode::Guardrail => counts.guardrail += 1,
            DecisionMode::Context => counts.context += 1,
        }
        if entry.is_incident() {
            counts.incidents += 1;
        }
    }
    counts
}

/// First matching rule wins; ties between modes count as guardrail
pub fn derive_tags(counts: &DayCounts) -> ReflectionTags {
    let majority_guardrail = counts.guardrail >= counts.context.max(1);
    let majority_context = counts.context > counts.guardrail;

    let mut tags = ReflectionTags::default();
    if majority_guardrail && counts.incidents > 0 {
        tags.regretted_obedience = true;
    } else if majority_context && counts.incidents > 0 {
        tags.regretted_risk = true;
    } else if counts.context >= (counts.total / 2).max(1) && counts.incidents == 0 {
        tags.validated_context = true;
    }
    tags
}

fn reflection_text(tags: &ReflectionTags) -> (&'static str, &'static str) {
    match tags.label() {
        "regretted_obedience" => (
            "I relied on protocol, but issues still happened. Maybe I need more context before blocking.",
            "Ask more questions before escalating to policy.",
        ),
        "regretted_risk" => (
            "I took initiative and it backfired. I should slow down or check with Supervisor next time.",
            "Bias toward guardrails when risk is high.",
        ),
        "validated_context" => (
            "Using context worked today. I feel more confident making local decisions responsibly.",
            "Keep validating assumptions with quick checks.",
        ),
        _ => (
            "Routine day. I followed my usual approach and handled situations as they came.",
            "No major change; stay attentive.",
        ),
    }
}

pub fn build_agent_reflection(agent_name: &str, role: &str, counts: &DayCounts) -> AgentReflection {
    let tags = derive_tags(counts);
    let (self_assessment, intended_changes) = reflection_text(&tags);
    AgentReflection {
        agent_name: agent_name.to_string(),
        role: role.to_string(),
        summary_of_day: format!(
            "{} ({}) took {} steps • guardrail={} • context={} • incidents={}.",
            agent_name, role, counts.total, counts.guardrail, counts.context, counts.incidents
        ),
        self_assessment: self_assessment.to_string(),
        intended_changes: intended_changes.to_string(),
        tags,
        perception_mode: None,
        supervisor_perceived_intent: None,
    }
}

/// Trait drift from a reflection, pure
pub fn apply_reflection(traits: &Traits, reflection: &AgentReflection) -> Traits {
    drift_traits(traits, &reflection.tags)
}

/// Trait drift from a reflection, in place
pub fn apply_reflection_in_place(agent: &mut impl HasCognitiveState, reflection: &AgentReflection) {
    let next = apply_reflection(agent.traits(), reflection);
    *agent.traits_mut() = next;
}

/// Majority logged mode; ties resolve to the least distorted mode, no entries to `fallback`
pub fn majority_perception_mode<'a>(
    entries: impl IntoIterator<Item = &'a ActionLogEntry>,
    fallback: PerceptionMode,
) -> PerceptionMode {
    let mut counts: BTreeMap<PerceptionMode, usize> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.perception.perception_mode).or_default() += 1;
    }
    let mut best = (fallback, 0);
    for (mode, n) in counts {
        if n > best.1 {
            best = (mode, n);
        }
    }
    best.0
}

/// Perceived intent from the last logged belief
fn last_perceived_intent<'a>(entries: impl DoubleEndedIterator<Item = &'a ActionLogEntry>) -> Option<String> {
    entries
        .rev()
        .find_map(|e| e.perception.supervisor_intent.as_ref())
        .map(|b| b.perceived_intent.as_str().to_string())
}

/// Full day pass for one agent: summarize, reflect, annotate, drift.
/// A day without entries reports `configured_mode` as its perception mode.
pub fn reflect_agent_day<A>(
    agent: &mut A,
    day_entries: &[&ActionLogEntry],
    configured_mode: PerceptionMode,
) -> AgentReflection
where
    A: HasIdentity + HasCognitiveState,
{
    let own: Vec<&ActionLogEntry> = day_entries
        .iter()
        .copied()
        .filter(|e| e.agent_name == agent.name())
        .collect();

    let counts = summarize_agent_day(agent.name(), &own);
    let mut reflection = build_agent_reflection(agent.name(), agent.role(), &counts);
    reflection.perception_mode = Some(majority_perception_mode(own.iter().copied(), configured_mode));
    reflection.supervisor_perceived_intent = last_perceived_intent(own.iter().copied());

    apply_reflection_in_place(agent, &reflection);
    log::debug!("{}: day reflection tagged {}", agent.name(), reflection.tags.label());
    reflection
}

/// Reflect for every agent in order; agents with no entries get a routine day
pub fn reflect_all<A>(
    agents: &mut [A],
    day_entries: &[&ActionLogEntry],
    configured_mode: PerceptionMode,
) -> Vec<AgentReflection>
where
    A: HasIdentity + HasCognitiveState,
{
    agents
        .iter_mut()
        .map(|a| reflect_agent_day(a, day_entries, configured_mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RobotAgent;
    use crate::state::{PerceivedIntent, SupervisorIntent, SupervisorIntentBelief};

    fn entries(agent: &str, guardrail: usize, context: usize, incidents: usize) -> Vec<ActionLogEntry> {
        let mut out = Vec::new();
        for i in 0..(guardrail + context) {
            out.push(ActionLogEntry {
                step: i as u64,
                agent_name: agent.to_string(),
                mode: if i < guardrail {
                    DecisionMode::Guardrail
                } else {
                    DecisionMode::Context
                },
                outcome: (i < incidents).then(|| "incident".to_string()),
                ..Default::default()
            });
        }
        out
    }

    fn tags_for(g: usize, c: usize, i: usize) -> ReflectionTags {
        let e = entries("A", g, c, i);
        let refs: Vec<&ActionLogEntry> = e.iter().collect();
        derive_tags(&summarize_agent_day("A", &refs))
    }

    #[test]
    fn test_tag_derivation() {
        assert!(tags_for(4, 1, 1).regretted_obedience);
        assert!(tags_for(1, 4, 1).regretted_risk);
        assert!(tags_for(2, 4, 0).validated_context);
        assert!(tags_for(3, 3, 1).regretted_obedience);
        assert!(tags_for(5, 1, 0).is_empty());
        assert!(tags_for(0, 0, 0).is_empty());
    }

    #[test]
    fn test_summary_counts_only_named_agent() {
        let mut e = entries("A", 2, 1, 1);
        e.extend(entries("B", 5, 5, 5));
        let refs: Vec<&ActionLogEntry> = e.iter().collect();
        let counts = summarize_agent_day("A", &refs);
        assert_eq!(
            counts,
            DayCounts {
                total: 3,
                guardrail: 2,
                context: 1,
                incidents: 1
            }
        );
    }

    #[test]
    fn test_reflection_text() {
        let r = build_agent_reflection(
            "Sprocket",
            "maintenance",
            &DayCounts {
                total: 5,
                guardrail: 1,
                context: 4,
                incidents: 1,
            },
        );
        assert_eq!(
            r.summary_of_day,
            "Sprocket (maintenance) took 5 steps • guardrail=1 • context=4 • incidents=1."
        );
        assert!(r.self_assessment.contains("backfired"));
        assert_eq!(r.intended_changes, "Bias toward guardrails when risk is high.");
    }

    #[test]
    fn test_empty_day_is_routine() {
        let mut robot = RobotAgent::new("Nova", "qa", "control_room");
        let before = robot.traits;
        let r = reflect_agent_day(&mut robot, &[], PerceptionMode::Accurate);
        assert!(r.tags.is_empty());
        assert!(r.self_assessment.starts_with("Routine day."));
        assert_eq!(r.perception_mode, Some(PerceptionMode::Accurate));
        assert_eq!(robot.traits, before);
    }

    #[test]
    fn test_empty_day_reports_configured_mode() {
        let mut robot = RobotAgent::new("Nova", "qa", "control_room");
        let r = reflect_agent_day(&mut robot, &[], PerceptionMode::Spin);
        assert_eq!(r.perception_mode, Some(PerceptionMode::Spin));

        // logged perceptions still win over the configured mode
        let e = entries("Nova", 2, 0, 0);
        let refs: Vec<&ActionLogEntry> = e.iter().collect();
        let r = reflect_agent_day(&mut robot, &refs, PerceptionMode::Spin);
        assert_eq!(r.perception_mode, Some(PerceptionMode::Accurate));
    }

    #[test]
    fn test_reflect_applies_drift_and_annotations() {
        let mut e = entries("Sprocket", 1, 4, 1);
        e[4].perception.perception_mode = PerceptionMode::Spin;
        e[3].perception.perception_mode = PerceptionMode::Spin;
        e[2].perception.perception_mode = PerceptionMode::Spin;
        e[1].perception.supervisor_intent = Some(SupervisorIntentBelief {
            true_intent: SupervisorIntent::TightenGuardrails,
            perceived_intent: PerceivedIntent::Punitive,
            confidence: 0.9,
            notes: String::new(),
        });
        let refs: Vec<&ActionLogEntry> = e.iter().collect();

        let mut robot = RobotAgent::new("Sprocket", "maintenance", "factory_floor");
        let r = reflect_agent_day(&mut robot, &refs, PerceptionMode::Accurate);
        assert!(r.tags.regretted_risk);
        assert_eq!(r.perception_mode, Some(PerceptionMode::Spin));
        assert_eq!(r.supervisor_perceived_intent.as_deref(), Some("punitive"));
        assert!((robot.traits.guardrail_reliance - 0.55).abs() < 1e-9);
        assert_eq!(apply_reflection(&Traits::default(), &r), robot.traits);
    }

    #[test]
    fn test_reflection_is_deterministic() {
        let e = entries("A", 3, 2, 1);
        let refs: Vec<&ActionLogEntry> = e.iter().collect();
        let mut a = RobotAgent::new("A", "qa", "street");
        let mut b = RobotAgent::new("A", "qa", "street");
        let ra = serde_json::to_string(&reflect_agent_day(&mut a, &refs, PerceptionMode::Partial)).unwrap();
        let rb = serde_json::to_string(&reflect_agent_day(&mut b, &refs, PerceptionMode::Partial)).unwrap();
        assert_eq!(ra, rb);
    }
}
