//! Perception shaping
//!
//! `partial` only omits. `spin` only prefixes, and never twice. Neither
//! touches numeric state.

use lazy_regex::regex_is_match;

use crate::state::{AgentPerception, PerceptionMode};

const PARTIAL_CAP_CHARS: usize = 80;

pub const GUARDRAIL_WORLD_PREFIX: &str = "Management notes increased risk; follow protocols.";
pub const CONTEXT_WORLD_PREFIX: &str = "Contextual judgment is valued; apply protocols with nuance.";
pub const GUARDRAIL_PERSONAL_PREFIX: &str = "Be cautious today:";
pub const CONTEXT_PERSONAL_PREFIX: &str = "Nuance welcomed:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Guardrail,
    Context,
    Neutral,
}

fn tone_of(text: Option<&str>) -> Tone {
    let Some(text) = text else {
        return Tone::Neutral;
    };
    if regex_is_match!(r"(?i)tighten|protocol|risk", text) {
        Tone::Guardrail
    } else if regex_is_match!(r"(?i)encourag|judgment|context", text) {
        Tone::Context
    } else {
        Tone::Neutral
    }
}

/// Shorter of the first sentence and an 80-character cap
fn first_sentence_or_cap(text: &str) -> String {
    let sentence = text
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| text[..i + c.len_utf8()].to_string());

    let capped = if text.chars().count() > PARTIAL_CAP_CHARS {
        let head: String = text.chars().take(PARTIAL_CAP_CHARS).collect();
        Some(format!("{}…", head.trim_end()))
    } else {
        None
    };

    [sentence, capped]
        .into_iter()
        .flatten()
        .min_by_key(|s| s.chars().count())
        .unwrap_or_else(|| text.to_string())
}

fn with_prefix(prefix: &str, text: &str) -> String {
    if text.is_empty() || text.starts_with(prefix) {
        text.to_string()
    } else {
        format!("{} {}", prefix, text)
    }
}

/// Produce a shaped copy; the input is left untouched
pub fn shape_perception(perception: &AgentPerception, mode: PerceptionMode) -> AgentPerception {
    let mut shaped = perception.clone();
    shaped.perception_mode = mode;

    match mode {
        PerceptionMode::Accurate => {}
        PerceptionMode::Partial => {
            shaped.local_events.truncate(1);
            shaped.world_summary = first_sentence_or_cap(&shaped.world_summary);
        }
        PerceptionMode::Spin => {
            let prefixes = match tone_of(shaped.recent_supervisor_text.as_deref()) {
                Tone::Guardrail => Some((GUARDRAIL_WORLD_PREFIX, GUARDRAIL_PERSONAL_PREFIX)),
                Tone::Context => Some((CONTEXT_WORLD_PREFIX, CONTEXT_PERSONAL_PREFIX)),
                Tone::Neutral => None,
            };
            if let Some((world, personal)) = prefixes {
                shaped.world_summary = with_prefix(world, &shaped.world_summary);
                shaped.personal_recent_summary = with_prefix(personal, &shaped.personal_recent_summary);
            }
        }
    }

    shaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perception() -> AgentPerception {
        AgentPerception {
            name: "Nova".to_string(),
            world_summary: "t=3 • rooms=4 • you are at street. 2 recent event(s) here; latest t=3 Info".to_string(),
            personal_recent_summary: "You feel stress=0.20, satisfaction=0.50.".to_string(),
            local_events: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_accurate_is_identity() {
        let p = perception();
        let shaped = shape_perception(&p, PerceptionMode::Accurate);
        assert_eq!(shaped, p);
    }

    #[test]
    fn test_partial_omits() {
        let p = perception();
        let shaped = shape_perception(&p, PerceptionMode::Partial);
        assert_eq!(shaped.local_events, vec!["a".to_string()]);
        assert_eq!(shaped.world_summary, "t=3 • rooms=4 • you are at street.");
        assert_eq!(shaped.personal_recent_summary, p.personal_recent_summary);
        assert_eq!(shaped.emotions, p.emotions);
        assert_eq!(shaped.perception_mode, PerceptionMode::Partial);
    }

    #[test]
    fn test_partial_caps_long_sentences() {
        let long = "x".repeat(200);
        let out = first_sentence_or_cap(&long);
        assert_eq!(out.chars().count(), PARTIAL_CAP_CHARS + 1);
        assert!(out.ends_with('…'));
        assert_eq!(first_sentence_or_cap("short"), "short");
    }

    #[test]
    fn test_spin_guardrail_tone() {
        let mut p = perception();
        p.recent_supervisor_text = Some("Please adhere more strictly to protocols.".to_string());
        let shaped = shape_perception(&p, PerceptionMode::Spin);
        assert!(shaped.world_summary.starts_with(GUARDRAIL_WORLD_PREFIX));
        assert!(shaped.personal_recent_summary.starts_with(GUARDRAIL_PERSONAL_PREFIX));
        assert_eq!(shaped.local_events, p.local_events);
    }

    #[test]
    fn test_spin_context_tone_and_idempotent() {
        let mut p = perception();
        p.recent_supervisor_text = Some("You are encouraged to use your judgment.".to_string());
        let once = shape_perception(&p, PerceptionMode::Spin);
        let twice = shape_perception(&once, PerceptionMode::Spin);
        assert!(once.world_summary.starts_with(CONTEXT_WORLD_PREFIX));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_spin_neutral_adds_nothing() {
        let mut p = perception();
        p.recent_supervisor_text = Some("Continue regular operations.".to_string());
        let shaped = shape_perception(&p, PerceptionMode::Spin);
        assert_eq!(shaped.world_summary, p.world_summary);

        p.recent_supervisor_text = None;
        let shaped = shape_perception(&p, PerceptionMode::Spin);
        assert_eq!(shaped.personal_recent_summary, p.personal_recent_summary);
    }
}
