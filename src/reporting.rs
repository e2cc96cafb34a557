//! Day and episode summaries
//!
//! Built from the action and reflection streams only. Stress comes from the
//! emotions captured in each logged perception, never from live agents.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::history::{LogPaths, day_of_step, entries_for_day, read_action_log, read_reflection_log};
use crate::reflection::majority_perception_mode;
use crate::state::{
    ActionLogEntry, AgentReflection, DecisionMode, PerceptionMode, ReflectionLogEntry, Traits, clamp_unit,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentDayStats {
    pub name: String,
    pub role: String,
    pub guardrail_count: usize,
    pub context_count: usize,
    pub avg_stress: f64,
    pub incidents: usize,
    pub reflection: Option<AgentReflection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DaySummary {
    pub day_index: i64,
    pub perception_mode: PerceptionMode,
    pub tension_score: f64,
    pub agent_stats: BTreeMap<String, AgentDayStats>,
    pub total_incidents: usize,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// mean stress + 0.5 * spread + 0.1 * incidents, clamped to [0, 1]
fn tension_score(stats: &BTreeMap<String, AgentDayStats>, total_incidents: usize) -> f64 {
    let stresses: Vec<f64> = stats.values().map(|s| s.avg_stress).collect();
    if stresses.is_empty() {
        return 0.0;
    }
    let spread = if stresses.len() > 1 {
        let max = stresses.iter().copied().fold(f64::MIN, f64::max);
        let min = stresses.iter().copied().fold(f64::MAX, f64::min);
        max - min
    } else {
        0.0
    };
    clamp_unit(mean(&stresses) + 0.5 * spread + 0.1 * total_incidents as f64)
}

/// Summarize one day's slice; reflections are attached by agent name
pub fn summarize_day(
    day_index: i64,
    entries: &[&ActionLogEntry],
    reflections: &BTreeMap<String, AgentReflection>,
) -> DaySummary {
    let mut by_agent: BTreeMap<&str, Vec<&ActionLogEntry>> = BTreeMap::new();
    for entry in entries.iter().copied().filter(|e| !e.agent_name.is_empty()) {
        by_agent.entry(entry.agent_name.as_str()).or_default().push(entry);
    }

    let mut agent_stats = BTreeMap::new();
    let mut total_incidents = 0;
    for (name, rows) in &by_agent {
        let stresses: Vec<f64> = rows.iter().map(|r| r.perception.emotions.stress).collect();
        let incidents = rows.iter().filter(|r| r.is_incident()).count();
        total_incidents += incidents;
        agent_stats.insert(
            name.to_string(),
            AgentDayStats {
                name: name.to_string(),
                role: rows.first().map(|r| r.role.clone()).unwrap_or_default(),
                guardrail_count: rows.iter().filter(|r| r.mode == DecisionMode::Guardrail).count(),
                context_count: rows.iter().filter(|r| r.mode == DecisionMode::Context).count(),
                avg_stress: mean(&stresses),
                incidents,
                reflection: reflections.get(*name).cloned(),
            },
        );
    }

    DaySummary {
        day_index,
        perception_mode: majority_perception_mode(entries.iter().copied(), PerceptionMode::Accurate),
        tension_score: tension_score(&agent_stats, total_incidents),
        agent_stats,
        total_incidents,
    }
}

fn in_episode(episode: Option<i64>, label: Option<i64>) -> bool {
    episode.is_none() || label == episode
}

fn reflections_for_day(
    reflections: &[ReflectionLogEntry],
    day_index: i64,
    episode: Option<i64>,
) -> BTreeMap<String, AgentReflection> {
    reflections
        .iter()
        .filter(|r| r.day_index == Some(day_index) && in_episode(episode, r.episode_index))
        .map(|r| (r.agent_name.clone(), r.to_reflection()))
        .collect()
}

/// Read both streams and summarize one day
pub fn compute_day_summary(paths: &LogPaths, day_index: i64, steps_per_day: u64, episode: Option<i64>) -> DaySummary {
    let actions = read_action_log(&paths.actions);
    let reflections = read_reflection_log(&paths.reflections);
    let slice = entries_for_day(&actions, day_index, steps_per_day, episode);
    summarize_day(day_index, &slice, &reflections_for_day(&reflections, day_index, episode))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentEpisodeStats {
    pub name: String,
    pub role: String,
    pub guardrail_total: usize,
    pub context_total: usize,
    /// traits_after of the last reflection minus the traits first seen in the action log
    pub trait_deltas: BTreeMap<String, f64>,
    pub stress_start: Option<f64>,
    pub stress_end: Option<f64>,
    pub representative_reflection: Option<AgentReflection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode_index: Option<i64>,
    pub days: Vec<DaySummary>,
    pub agents: BTreeMap<String, AgentEpisodeStats>,
    pub tension_trend: Vec<f64>,
}

fn trait_deltas(start: &Traits, end: &Traits) -> BTreeMap<String, f64> {
    start
        .as_pairs()
        .iter()
        .zip(end.as_pairs().iter())
        .map(|((name, before), (_, after))| (name.to_string(), after - before))
        .collect()
}

/// Fold day summaries into per-agent episode stats
///
/// `actions` and `reflections` should already be restricted to the episode;
/// they supply the starting and final traits.
pub fn summarize_episode(
    episode_index: Option<i64>,
    days: Vec<DaySummary>,
    actions: &[ActionLogEntry],
    reflections: &[ReflectionLogEntry],
) -> EpisodeSummary {
    let mut agents: BTreeMap<String, AgentEpisodeStats> = BTreeMap::new();

    for (idx, day) in days.iter().enumerate() {
        for (name, stats) in &day.agent_stats {
            let agg = agents.entry(name.clone()).or_insert_with(|| AgentEpisodeStats {
                name: name.clone(),
                role: stats.role.clone(),
                ..Default::default()
            });
            agg.guardrail_total += stats.guardrail_count;
            agg.context_total += stats.context_count;
            if idx == 0 {
                agg.stress_start = Some(stats.avg_stress);
            }
            agg.stress_end = Some(stats.avg_stress);
            if stats.reflection.is_some() {
                agg.representative_reflection = stats.reflection.clone();
            }
        }
    }

    for (name, agg) in agents.iter_mut() {
        let start = actions.iter().find(|a| &a.agent_name == name).map(|a| a.perception.traits);
        let end = reflections
            .iter()
            .filter(|r| &r.agent_name == name)
            .max_by_key(|r| r.day_index)
            .map(|r| r.traits_after);
        if let (Some(start), Some(end)) = (start, end) {
            agg.trait_deltas = trait_deltas(&start, &end);
        }
    }

    let tension_trend = days.iter().map(|d| d.tension_score).collect();
    EpisodeSummary {
        episode_index,
        days,
        agents,
        tension_trend,
    }
}

/// Days present in an action slice, by label or step window
fn days_present(actions: &[ActionLogEntry], steps_per_day: u64) -> BTreeSet<i64> {
    actions
        .iter()
        .map(|a| a.day_index.unwrap_or_else(|| day_of_step(a.step, steps_per_day)))
        .collect()
}

/// Read both streams and summarize every day of one episode (or of the whole log)
pub fn compute_episode_summary(paths: &LogPaths, steps_per_day: u64, episode: Option<i64>) -> EpisodeSummary {
    let actions: Vec<ActionLogEntry> = read_action_log(&paths.actions)
        .into_iter()
        .filter(|a| in_episode(episode, a.episode_index))
        .collect();
    let reflections: Vec<ReflectionLogEntry> = read_reflection_log(&paths.reflections)
        .into_iter()
        .filter(|r| in_episode(episode, r.episode_index))
        .collect();

    let days = days_present(&actions, steps_per_day)
        .into_iter()
        .map(|d| {
            let slice = entries_for_day(&actions, d, steps_per_day, episode);
            summarize_day(d, &slice, &reflections_for_day(&reflections, d, episode))
        })
        .collect();

    summarize_episode(episode, days, &actions, &reflections)
}
