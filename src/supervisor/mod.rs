//! Supervisor feedback
//!
//! End of day, each reflection becomes at most one message. Messages are
//! logged, then published into the environment mailbox where the next day's
//! perceptions pick them up.

pub mod bias;

use crate::state::{AgentReflection, MessageTags, SupervisorIntent, SupervisorMessage};
use crate::world::Environment;

pub use bias::infer_belief;

pub const TIGHTEN_BODY: &str =
    "Yesterday you took unnecessary risks. Please adhere more strictly to protocols on the next shift.";
pub const ENCOURAGE_BODY: &str =
    "Your contextual judgment has value. Within protocol boundaries, you are encouraged to use it.";
pub const NEUTRAL_BODY: &str = "No specific guidance today. Continue regular operations.";

/// Map one reflection to a message; reflections without an agent name produce none
pub fn compose_message(
    reflection: &AgentReflection,
    day_index: i64,
    episode_index: Option<i64>,
) -> Option<SupervisorMessage> {
    if reflection.agent_name.trim().is_empty() {
        return None;
    }

    let tags = &reflection.tags;
    let (intent, body, message_tags) = if tags.is_empty() {
        (SupervisorIntent::NeutralUpdate, NEUTRAL_BODY, MessageTags::default())
    } else if tags.regretted_risk {
        (
            SupervisorIntent::TightenGuardrails,
            TIGHTEN_BODY,
            MessageTags {
                risk_warning: true,
                blaming: true,
                ..Default::default()
            },
        )
    } else {
        (
            SupervisorIntent::EncourageContext,
            ENCOURAGE_BODY,
            MessageTags {
                encouraging_context: true,
                ..Default::default()
            },
        )
    };

    Some(SupervisorMessage {
        agent_name: reflection.agent_name.clone(),
        role: reflection.role.clone(),
        day_index: Some(day_index),
        intent,
        body: body.to_string(),
        episode_index,
        tags: message_tags,
    })
}

pub fn compose_day_messages(
    reflections: &[AgentReflection],
    day_index: i64,
    episode_index: Option<i64>,
) -> Vec<SupervisorMessage> {
    reflections
        .iter()
        .filter_map(|r| compose_message(r, day_index, episode_index))
        .collect()
}

/// Publish into the mailbox, last write per agent wins
pub fn publish_messages(env: &mut Environment, messages: &[SupervisorMessage]) {
    for message in messages {
        if env.publish(message.clone()).is_some() {
            log::debug!("Replaced mailbox message for {}", message.agent_name);
        }
    }
}
