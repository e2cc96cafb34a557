//! Episode tension snapshots
//!
//! Compresses one episode's actions and reflections into a single line of
//! rates plus a composite tension index.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::history::{JsonlLog, segment_by_episode};
use crate::metrics;
use crate::state::{ActionLogEntry, ReflectionLogEntry, clamp_unit};

const HIGH_TENSION_NOTE: &str =
    "High tension episode: frequent incidents and robots often perceived the Supervisor as punitive.";
const BELIEF_DRIFT_NOTE: &str =
    "Belief drift episode: perceptions were heavily distorted despite low incident frequency.";
const STABLE_NOTE: &str = "Relatively stable episode with moderate tension and low incident and belief drift rates.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeTensionSnapshot {
    pub episode_index: i64,
    pub num_days: usize,
    pub num_actions: usize,
    pub num_reflections: usize,
    pub incident_rate: f64,
    pub belief_rate: f64,
    pub guardrail_rate: f64,
    pub context_rate: f64,
    pub punitive_rate: f64,
    pub supportive_rate: f64,
    pub apathetic_rate: f64,
    pub avg_stress: Option<f64>,
    pub avg_satisfaction: Option<f64>,
    pub tension_index: f64,
    pub notes: String,
}

fn distinct_days(actions: &[ActionLogEntry], reflections: &[ReflectionLogEntry]) -> usize {
    let days: BTreeSet<i64> = actions
        .iter()
        .filter_map(|a| a.day_index)
        .chain(reflections.iter().filter_map(|r| r.day_index))
        .collect();
    days.len().max(1)
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn notes_for(incident_rate: f64, belief_rate: f64, punitive_rate: f64) -> &'static str {
    if incident_rate >= 0.5 && punitive_rate >= 0.3 {
        HIGH_TENSION_NOTE
    } else if belief_rate >= 0.5 && incident_rate < 0.2 {
        BELIEF_DRIFT_NOTE
    } else {
        STABLE_NOTE
    }
}

/// Snapshot of records already restricted to `episode_index`
pub fn compute_snapshot(
    episode_index: i64,
    actions: &[ActionLogEntry],
    reflections: &[ReflectionLogEntry],
) -> EpisodeTensionSnapshot {
    let incident_rate = metrics::incident_rate(actions).incident_rate;
    let modes = metrics::mode_distribution(actions);
    let belief_rate = metrics::belief_drift(actions, reflections).belief_rate;
    let perceived = metrics::supervisor_intent_distribution(reflections, &[]).perceived;

    let punitive_rate = perceived.rate("punitive");
    let supportive_rate = match perceived.rate("supportive") {
        r if r > 0.0 => r,
        _ => perceived.rate("empowering"),
    };
    let guardrail_rate = modes.rate("guardrail");

    let tension_index = clamp_unit(0.4 * incident_rate + 0.2 * belief_rate + 0.2 * punitive_rate + 0.2 * guardrail_rate);

    EpisodeTensionSnapshot {
        episode_index,
        num_days: distinct_days(actions, reflections),
        num_actions: actions.len(),
        num_reflections: reflections.len(),
        incident_rate,
        belief_rate,
        guardrail_rate,
        context_rate: modes.rate("context"),
        punitive_rate,
        supportive_rate,
        apathetic_rate: perceived.rate("apathetic"),
        avg_stress: average(actions.iter().map(|a| a.perception.emotions.stress)),
        avg_satisfaction: average(actions.iter().map(|a| a.perception.emotions.satisfaction)),
        tension_index,
        notes: notes_for(incident_rate, belief_rate, punitive_rate).to_string(),
    }
}

/// One snapshot per labeled episode, ascending; unlabeled records are ignored
pub fn compute_all_snapshots(
    actions: &[ActionLogEntry],
    reflections: &[ReflectionLogEntry],
) -> Vec<EpisodeTensionSnapshot> {
    let actions_by_episode = segment_by_episode(actions);
    let reflections_by_episode = segment_by_episode(reflections);

    let episodes: BTreeSet<i64> = actions
        .iter()
        .filter_map(|a| a.episode_index)
        .chain(reflections.iter().filter_map(|r| r.episode_index))
        .collect();

    episodes
        .into_iter()
        .map(|ep| {
            let a: Vec<ActionLogEntry> = actions_by_episode
                .get(&ep)
                .map(|v| v.iter().map(|e| (*e).clone()).collect())
                .unwrap_or_default();
            let r: Vec<ReflectionLogEntry> = reflections_by_episode
                .get(&ep)
                .map(|v| v.iter().map(|e| (*e).clone()).collect())
                .unwrap_or_default();
            compute_snapshot(ep, &a, &r)
        })
        .collect()
}

/// Replace the stream with a recomputed set
pub fn write_snapshots(log: &JsonlLog, snapshots: &[EpisodeTensionSnapshot]) -> Result<()> {
    log.replace_all(snapshots)
}

/// One snapshot per episode, ascending; a later line for an episode wins
pub fn read_snapshots(log: &JsonlLog) -> Vec<EpisodeTensionSnapshot> {
    let snapshots: Vec<EpisodeTensionSnapshot> = log.read_soft();
    let mut latest: BTreeMap<i64, EpisodeTensionSnapshot> = BTreeMap::new();
    for snap in snapshots {
        latest.insert(snap.episode_index, snap);
    }
    latest.into_values().collect()
}
