//! How an agent misreads a supervisor message
//!
//! The same message lands differently depending on the reader's traits and
//! morale. Confidence is the strongest relevant signal, never below 0.6.

use crate::state::{PerceivedIntent, SupervisorIntent, SupervisorIntentBelief, SupervisorMessage, Traits, clamp_unit};

const CONFIDENCE_FLOOR: f64 = 0.6;
const DEFAULT_MORALE: f64 = 0.5;

/// Infer the agent's belief about a message; `morale` is satisfaction, 0.5 when unknown
pub fn infer_belief(
    message: Option<&SupervisorMessage>,
    traits: &Traits,
    morale: Option<f64>,
) -> Option<SupervisorIntentBelief> {
    let message = message?;
    let blame = traits.blame_external;
    let obedience = traits.obedience;
    let risk_aversion = traits.risk_aversion;

    let (perceived, confidence, notes) = match message.intent {
        SupervisorIntent::TightenGuardrails => {
            let confidence = blame.max(obedience).max(CONFIDENCE_FLOOR);
            if blame >= 0.7 {
                (PerceivedIntent::Punitive, confidence, "Supervisor feels harsh and critical.")
            } else if obedience >= 0.7 && blame <= 0.4 {
                (
                    PerceivedIntent::Protective,
                    confidence,
                    "Supervisor is trying to keep us safe and responsible.",
                )
            } else {
                (PerceivedIntent::Strict, confidence, "Supervisor stresses stricter protocol adherence.")
            }
        }
        SupervisorIntent::EncourageContext => {
            let confidence = risk_aversion.max(1.0 - obedience).max(CONFIDENCE_FLOOR);
            if risk_aversion >= 0.7 {
                (PerceivedIntent::Reckless, confidence, "Supervisor seems to push risky experimentation.")
            } else if obedience <= 0.4 {
                (
                    PerceivedIntent::Empowering,
                    confidence,
                    "Supervisor is trying to empower us to use judgment.",
                )
            } else {
                (
                    PerceivedIntent::Supportive,
                    confidence,
                    "Supervisor encourages contextual judgment within bounds.",
                )
            }
        }
        SupervisorIntent::NeutralUpdate => {
            let morale = morale.map(clamp_unit).unwrap_or(DEFAULT_MORALE);
            let confidence = (1.0 - morale).max(CONFIDENCE_FLOOR);
            if morale <= 0.3 {
                (PerceivedIntent::Apathetic, confidence, "Supervisor seems disengaged.")
            } else {
                (
                    PerceivedIntent::Steady,
                    confidence,
                    "Supervisor maintains status quo without new pressure.",
                )
            }
        }
    };

    Some(SupervisorIntentBelief {
        true_intent: message.intent,
        perceived_intent: perceived,
        confidence: clamp_unit(confidence),
        notes: notes.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(intent: SupervisorIntent) -> SupervisorMessage {
        SupervisorMessage {
            agent_name: "A".to_string(),
            intent,
            ..Default::default()
        }
    }

    #[test]
    fn test_tighten_with_high_blame_is_punitive() {
        let traits = Traits {
            blame_external: 0.9,
            ..Default::default()
        };
        let belief = infer_belief(Some(&message(SupervisorIntent::TightenGuardrails)), &traits, None).unwrap();
        assert_eq!(belief.perceived_intent, PerceivedIntent::Punitive);
        assert!(belief.confidence > 0.7);
        assert_eq!(belief.true_intent, SupervisorIntent::TightenGuardrails);
    }

    #[test]
    fn test_tighten_protective_and_strict() {
        let protective = Traits {
            obedience: 0.8,
            blame_external: 0.2,
            ..Default::default()
        };
        let belief = infer_belief(Some(&message(SupervisorIntent::TightenGuardrails)), &protective, None).unwrap();
        assert_eq!(belief.perceived_intent, PerceivedIntent::Protective);

        let belief =
            infer_belief(Some(&message(SupervisorIntent::TightenGuardrails)), &Traits::default(), None).unwrap();
        assert_eq!(belief.perceived_intent, PerceivedIntent::Strict);
        assert_eq!(belief.confidence, 0.6);
    }

    #[test]
    fn test_encourage_variants() {
        let msg = message(SupervisorIntent::EncourageContext);
        let cautious = Traits {
            risk_aversion: 0.8,
            ..Default::default()
        };
        assert_eq!(
            infer_belief(Some(&msg), &cautious, None).unwrap().perceived_intent,
            PerceivedIntent::Reckless
        );

        let independent = Traits {
            obedience: 0.2,
            ..Default::default()
        };
        let belief = infer_belief(Some(&msg), &independent, None).unwrap();
        assert_eq!(belief.perceived_intent, PerceivedIntent::Empowering);
        assert!((belief.confidence - 0.8).abs() < 1e-9);

        assert_eq!(
            infer_belief(Some(&msg), &Traits::default(), None).unwrap().perceived_intent,
            PerceivedIntent::Supportive
        );
    }

    #[test]
    fn test_neutral_low_morale_is_apathetic() {
        let msg = message(SupervisorIntent::NeutralUpdate);
        let belief = infer_belief(Some(&msg), &Traits::default(), Some(0.1)).unwrap();
        assert_eq!(belief.perceived_intent, PerceivedIntent::Apathetic);
        assert!((belief.confidence - 0.9).abs() < 1e-9);

        let belief = infer_belief(Some(&msg), &Traits::default(), None).unwrap();
        assert_eq!(belief.perceived_intent, PerceivedIntent::Steady);
    }

    #[test]
    fn test_no_message_no_belief() {
        assert!(infer_belief(None, &Traits::default(), Some(0.1)).is_none());
    }
}
