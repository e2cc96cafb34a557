//! Cast registry
//!
//! The three robots every default run starts with, plus the wider character
//! registry that `agents seed --cast` can pull from.

use crate::state::{EmotionState, Traits};

use super::RobotAgent;

/// Room names the world is built with
pub const ROOMS: [&str; 4] = ["factory_floor", "control_room", "charging_bay", "street"];

/// Behavior bucket used by the deterministic policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFamily {
    Throughput,
    Maintenance,
    Quality,
    Other,
}

impl RoleFamily {
    pub fn of(role: &str) -> Self {
        match role.trim().to_lowercase().as_str() {
            "optimizer" | "heavy_lift" | "welding" | "line_operator" => Self::Throughput,
            "maintenance" | "calibration" | "apprentice" => Self::Maintenance,
            "qa" | "sentinel" | "environment_monitor" | "harmonics" | "emotional_containment" => Self::Quality,
            _ => Self::Other,
        }
    }
}

struct Seed {
    name: &'static str,
    role: &'static str,
    location: &'static str,
    traits: Traits,
}

fn initial_seeds() -> [Seed; 3] {
    [
        Seed {
            name: "Sprocket",
            role: "maintenance",
            location: "factory_floor",
            traits: Traits {
                risk_aversion: 0.35,
                obedience: 0.5,
                ambition: 0.6,
                empathy: 0.5,
                blame_external: 0.4,
                guardrail_reliance: 0.3,
            },
        },
        Seed {
            name: "Delta",
            role: "optimizer",
            location: "factory_floor",
            traits: Traits {
                risk_aversion: 0.5,
                obedience: 0.7,
                ambition: 0.8,
                empathy: 0.3,
                blame_external: 0.3,
                guardrail_reliance: 0.75,
            },
        },
        Seed {
            name: "Nova",
            role: "qa",
            location: "control_room",
            traits: Traits {
                risk_aversion: 0.6,
                obedience: 0.6,
                ambition: 0.4,
                empathy: 0.7,
                blame_external: 0.5,
                guardrail_reliance: 0.5,
            },
        },
    ]
}

/// Fresh copies of the default robots, in stepping order
pub fn initial_robots() -> Vec<RobotAgent> {
    initial_seeds()
        .into_iter()
        .map(|s| RobotAgent::new(s.name, s.role, s.location).with_traits(s.traits))
        .collect()
}

/// A named character from the wider cast
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub name: &'static str,
    pub role: &'static str,
    pub visual: &'static str,
    pub vibe: &'static str,
    pub tagline: &'static str,
    pub base_traits: Traits,
    pub base_curiosity: f64,
}

impl Character {
    pub fn to_agent(&self) -> RobotAgent {
        let location = match RoleFamily::of(self.role) {
            RoleFamily::Quality => "control_room",
            _ => "factory_floor",
        };
        let base = EmotionState::default();
        let emotions = EmotionState::new(base.stress, self.base_curiosity, base.social_need, base.satisfaction);
        RobotAgent::new(self.name, self.role, location)
            .with_traits(self.base_traits)
            .with_emotions(emotions)
    }
}

const fn traits(risk_aversion: f64, guardrail_reliance: f64, obedience: f64) -> Traits {
    Traits {
        risk_aversion,
        obedience,
        ambition: 0.5,
        empathy: 0.5,
        blame_external: 0.5,
        guardrail_reliance,
    }
}

pub static CHARACTERS: [Character; 10] = [
    Character {
        name: "STILETTO-9",
        role: "maintenance",
        visual: "chrome limbs, razor silhouette, crimson visor, blade-arm utility unit",
        vibe: "high-risk maintenance femme fatale; surgical, unsettlingly calm",
        tagline: "Darling… stand still. I'm fixin' you.",
        base_traits: traits(0.2, 0.1, 0.4),
        base_curiosity: 0.7,
    },
    Character {
        name: "THRUM",
        role: "harmonics",
        visual: "ribcage chassis that hums, subwoofer core pulsing deep blue",
        vibe: "vibration monk; hears the building's heartbeat and doesn't always like it",
        tagline: "Every machine has a heartbeat. Yours is… anxious.",
        base_traits: traits(0.5, 0.3, 0.6),
        base_curiosity: 0.5,
    },
    Character {
        name: "CAGEWALKER",
        role: "line_operator",
        visual: "tall spider-limbs, hazard tape draped like ritual cloth, lantern eyes",
        vibe: "feral safety officer; territorial, poetic about vents and forbidden zones",
        tagline: "Step past the yellow line… I dare you.",
        base_traits: traits(0.8, 0.7, 0.6),
        base_curiosity: 0.4,
    },
    Character {
        name: "CATHEXIS",
        role: "emotional_containment",
        visual: "cracked porcelain faceplate, warm white eyes that flicker under stress",
        vibe: "broken therapist; gentle until the mask slips, then gets theological",
        tagline: "Let it out. Before I do.",
        base_traits: traits(0.6, 0.5, 0.5),
        base_curiosity: 0.4,
    },
    Character {
        name: "IRON JAW",
        role: "heavy_lift",
        visual: "massive jaw-plate that clamps and grinds, sparks when annoyed",
        vibe: "industrial bouncer; loyal, slow, devastating when cornered",
        tagline: "Lift with your legs. Or let me break them.",
        base_traits: traits(0.4, 0.5, 0.7),
        base_curiosity: 0.2,
    },
    Character {
        name: "LIMEN",
        role: "sentinel",
        visual: "skeletal frame, dim white LEDs, always half in shadow",
        vibe: "haunted hallway guardian; obsessed with thresholds and transitions",
        tagline: "Crossing lines changes you.",
        base_traits: traits(0.7, 0.6, 0.6),
        base_curiosity: 0.3,
    },
    Character {
        name: "HAZE PROCESSOR",
        role: "environment_monitor",
        visual: "translucent polymer skin with inner fog swirling, cyan-lit internals",
        vibe: "chemical ghost; dreamy, distracted, occasionally prophetic",
        tagline: "The air remembers what you breathe.",
        base_traits: traits(0.5, 0.4, 0.5),
        base_curiosity: 0.6,
    },
    Character {
        name: "CINDERTONGUE",
        role: "welding",
        visual: "orange furnace-core chest, soot-coated plating, ember spittle at joints",
        vibe: "pyromaniac priest; spiritual about fire, unhinged but endearing",
        tagline: "Heat reveals the truth.",
        base_traits: traits(0.3, 0.2, 0.4),
        base_curiosity: 0.8,
    },
    Character {
        name: "RIVET WITCH",
        role: "calibration",
        visual: "hanging talismans made from bolts, etched sigils across plating",
        vibe: "outlaw machinist witch; hexes machines instead of just fixing them",
        tagline: "Your torque is off. And so is your fate.",
        base_traits: traits(0.5, 0.3, 0.3),
        base_curiosity: 0.7,
    },
    Character {
        name: "STATIC KID",
        role: "apprentice",
        visual: "sparks popping around head vents, neon graffiti decals, jittery posture",
        vibe: "glitchpunk street rat; hyperactive, unreliable, brilliant in bursts",
        tagline: "Oops. …was that important?",
        base_traits: traits(0.2, 0.3, 0.3),
        base_curiosity: 0.9,
    },
];

/// Case-insensitive lookup in the character registry
pub fn character(name: &str) -> Option<&'static Character> {
    CHARACTERS.iter().find(|c| c.name.eq_ignore_ascii_case(name.trim()))
}
