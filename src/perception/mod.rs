//! Subjective snapshots
//!
//! `build_agent_perception` copies ground truth faithfully; `shaping` then
//! distorts the copy according to the environment's perception mode.

pub mod shaping;

use crate::state::{AgentPerception, Embodied, HasCognitiveState, HasIdentity};
use crate::supervisor::infer_belief;
use crate::world::Environment;

pub use shaping::shape_perception;

/// World line: no decimal points before the first sentence end, shaping relies on it
fn world_summary(env: &Environment, location: &str, step: u64, local_events: &[String]) -> String {
    let mut summary = format!("t={} • rooms={} • you are at {}.", step, env.rooms.len(), location);
    if let Some(latest) = local_events.first() {
        summary.push_str(&format!(" {} recent event(s) here; latest {}", local_events.len(), latest));
    }
    summary
}

fn personal_summary(stress: f64, satisfaction: f64) -> String {
    format!("You feel stress={:.2}, satisfaction={:.2}.", stress, satisfaction)
}

/// Faithful snapshot of `agent` at `step`, shaped by the environment's mode
pub fn build_agent_perception<A>(agent: &A, env: &Environment, step: u64) -> AgentPerception
where
    A: HasIdentity + HasCognitiveState + Embodied,
{
    let emotions = *agent.emotions();
    let traits = *agent.traits();
    let local_events = env.local_events_for(agent.location(), step);
    let message = env.supervisor_message_for(agent.name());

    let perception = AgentPerception {
        step,
        name: agent.name().to_string(),
        role: agent.role().to_string(),
        location: agent.location().to_string(),
        battery_level: agent.battery_level(),
        emotions,
        traits,
        world_summary: world_summary(env, agent.location(), step, &local_events),
        personal_recent_summary: personal_summary(emotions.stress, emotions.satisfaction),
        local_events,
        recent_supervisor_text: env.supervisor_text_for(agent.name()).map(|s| s.to_string()),
        supervisor_intent: infer_belief(message, &traits, Some(emotions.satisfaction)),
        perception_mode: Default::default(),
    };

    shape_perception(&perception, env.perception_mode)
}
