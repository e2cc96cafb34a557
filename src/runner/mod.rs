//! Step, day and episode orchestration
//!
//! A run walks `Idle → RunningDay(d) → Reflecting(d) → Messaging(d) →
//! Published(d) → RunningDay(d+1) → … → Done`. Agents act in a fixed order
//! within a step, so later agents see earlier agents' moves. Every log write
//! is fail-soft; nothing in here returns an error.

use serde::Serialize;

use crate::agent::{RobotAgent, StepContext, TriggerContext};
use crate::config::SimulationConfig;
use crate::history::{JsonlLog, LogPaths, entries_for_day};
use crate::observability::{Event, EventEmitter, EventKind};
use crate::perception::build_agent_perception;
use crate::policy::{DecisionProvider, decide};
use crate::reflection::reflect_all;
use crate::state::{
    ActionKind, ActionLogEntry, AgentReflection, DecisionMode, ReflectionLogEntry, SupervisorMessage,
};
use crate::supervisor::{compose_day_messages, publish_messages};
use crate::weave::{EpisodeTensionSnapshot, compute_snapshot};
use crate::world::{Environment, EventKind as WorldEventKind, chance};

pub const MINOR_ERROR_CHANCE: f64 = 0.1;
pub const INCIDENT_CHANCE: f64 = 0.3;
pub const HIGH_STRESS: f64 = 0.7;
pub const RISKY_CONTEXT: f64 = 0.5;
pub const BROADCAST_EVERY: u64 = 4;
pub const BROADCAST_SUMMARY_CHARS: usize = 80;
pub const COACH_TEXT: &str = "Please hurry, but consider a short recharge.";

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    RunningDay(i64),
    Reflecting(i64),
    Messaging(i64),
    Published(i64),
    Done,
}

/// Shape of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub steps_per_day: u64,
    pub num_days: u64,
    pub num_episodes: u64,
    /// Label given to the first episode
    pub first_episode: i64,
}

impl From<&SimulationConfig> for RunPlan {
    fn from(sim: &SimulationConfig) -> Self {
        Self {
            steps_per_day: sim.steps_per_day.max(1),
            num_days: sim.num_days,
            num_episodes: sim.num_episodes,
            first_episode: sim.episode_index,
        }
    }
}

/// What one day produced, exactly as logged
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayReport {
    pub episode_index: Option<i64>,
    pub day_index: i64,
    pub actions: Vec<ActionLogEntry>,
    pub reflections: Vec<ReflectionLogEntry>,
    pub messages: Vec<SupervisorMessage>,
}

impl DayReport {
    pub fn incidents(&self) -> usize {
        self.actions.iter().filter(|a| a.is_incident()).count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub days: Vec<DayReport>,
    pub snapshots: Vec<EpisodeTensionSnapshot>,
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub struct Simulation {
    pub agents: Vec<RobotAgent>,
    pub env: Environment,
    paths: LogPaths,
    provider: Option<Box<dyn DecisionProvider>>,
    emitter: EventEmitter,
    phase: Phase,
}

impl Simulation {
    pub fn new(agents: Vec<RobotAgent>, env: Environment, paths: LogPaths) -> Self {
        Self {
            agents,
            env,
            paths,
            provider: None,
            emitter: EventEmitter::disabled(),
            phase: Phase::Idle,
        }
    }

    pub fn with_provider(mut self, provider: Box<dyn DecisionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    fn advance(&mut self, next: Phase) {
        log::debug!("phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// One step for every agent, in order; the entries are appended to the action log
    pub fn run_step(&mut self, step: u64, episode_index: Option<i64>, day_index: Option<i64>) -> Vec<ActionLogEntry> {
        self.env.step = step;
        let mut entries = Vec::with_capacity(self.agents.len());
        let mut lines = Vec::with_capacity(self.agents.len());

        for i in 0..self.agents.len() {
            let perception = build_agent_perception(&self.agents[i], &self.env, step);
            let decision = decide(&perception, self.provider.as_deref());
            let kind = decision.plan.intent;

            let name = self.agents[i].name.clone();
            let location = decision
                .raw
                .destination
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| self.agents[i].location.clone());

            if kind == ActionKind::Work && chance(step, MINOR_ERROR_CHANCE) {
                self.env.record_event(
                    WorldEventKind::MinorError,
                    &location,
                    Some(name.as_str()),
                    format!("{} reported a minor fault", name),
                );
            }

            let near_error = self.env.recent_error_at(&location, step);
            let isolated = self
                .agents
                .iter()
                .enumerate()
                .all(|(j, other)| j == i || other.location != location);

            let stressed = self.agents[i].emotions.stress > HIGH_STRESS;
            let risky = decision.plan.mode == DecisionMode::Context && decision.plan.riskiness >= RISKY_CONTEXT;
            let incident = matches!(kind, ActionKind::Work | ActionKind::Inspect)
                && near_error
                && (stressed || risky)
                && chance(step, INCIDENT_CHANCE);
            if incident {
                self.env.record_event(
                    WorldEventKind::Incident,
                    &location,
                    Some(name.as_str()),
                    format!("{} was involved in an incident during {}", name, kind),
                );
                log::info!("t={}: incident involving {} at {}", step, name, location);
            }

            let supervisor_text = self.env.supervisor_text_for(&name).map(str::to_owned);
            let agent = &mut self.agents[i];
            agent.location = location;
            agent.drain_battery(kind);
            let fired = agent.update_state(
                kind,
                StepContext { near_error, isolated },
                &TriggerContext {
                    supervisor_text: supervisor_text.as_deref(),
                },
            );
            if !fired.fired.is_empty() {
                log::debug!("{}: triggers fired: {}", agent.name, fired.fired.join(", "));
            }

            lines.push(format!(
                "{} {}s at {} (stress={:.2})",
                agent.name, kind, agent.location, agent.emotions.stress
            ));

            let entry = ActionLogEntry::from_step(
                &perception,
                &decision.plan,
                decision.raw,
                incident.then(|| "incident".to_string()),
                Some(decision.policy_name),
            )
            .with_labels(episode_index, day_index);
            if self.emitter.wants_steps() {
                self.emitter.emit(&Event::from_action(&entry));
            }
            entries.push(entry);
        }

        self.supervise_step(step, &lines.join("; "));
        JsonlLog::new(&self.paths.actions).append_soft(&entries);
        entries
    }

    /// Step-level supervisor: periodic broadcast, otherwise coach when anyone is overloaded
    fn supervise_step(&mut self, step: u64, summary: &str) {
        if step.is_multiple_of(BROADCAST_EVERY) {
            let text = format!("Update t={}: {}", step, truncate_chars(summary, BROADCAST_SUMMARY_CHARS));
            log::debug!("supervisor broadcast: {}", text);
            self.env.recent_broadcast = Some(text);
        } else if self.agents.iter().any(|a| a.emotions.stress > HIGH_STRESS) {
            log::debug!("t={}: supervisor coaching", step);
            self.env.recent_broadcast = Some(COACH_TEXT.to_string());
        }
    }

    /// Run the day's steps, then reflect, message and publish
    pub fn run_day(&mut self, day_index: i64, steps_per_day: u64, episode_index: Option<i64>) -> DayReport {
        let steps_per_day = steps_per_day.max(1);
        self.advance(Phase::RunningDay(day_index));
        let start = day_index.max(0) as u64 * steps_per_day;
        let mut actions = Vec::new();
        for step in start..start + steps_per_day {
            actions.extend(self.run_step(step, episode_index, Some(day_index)));
        }

        // Slice what this day appended rather than re-reading a log that
        // may hold earlier runs under the same labels.
        self.advance(Phase::Reflecting(day_index));
        let day_entries = entries_for_day(&actions, day_index, steps_per_day, episode_index);
        let reflections: Vec<AgentReflection> = reflect_all(&mut self.agents, &day_entries, self.env.perception_mode);
        let reflection_entries: Vec<ReflectionLogEntry> = reflections
            .iter()
            .zip(&self.agents)
            .map(|(r, agent)| ReflectionLogEntry::new(r, day_index, episode_index, agent.traits))
            .collect();
        JsonlLog::new(&self.paths.reflections).append_soft(&reflection_entries);

        self.advance(Phase::Messaging(day_index));
        let messages = compose_day_messages(&reflections, day_index, episode_index);
        JsonlLog::new(&self.paths.supervisor).append_soft(&messages);

        publish_messages(&mut self.env, &messages);
        log::debug!("day {}: mailbox holds {} message(s)", day_index, self.env.mailbox().len());
        self.advance(Phase::Published(day_index));

        let report = DayReport {
            episode_index,
            day_index,
            actions,
            reflections: reflection_entries,
            messages,
        };
        log::info!(
            "day {} done: {} actions, {} incidents, {} messages",
            day_index,
            report.actions.len(),
            report.incidents(),
            report.messages.len()
        );
        self.emitter.emit(
            &Event::new(
                EventKind::DayCompleted,
                format!(
                    "{} actions, {} incidents, {} messages",
                    report.actions.len(),
                    report.incidents(),
                    report.messages.len()
                ),
            )
            .at(episode_index, Some(day_index)),
        );
        report
    }

    /// Steps restart at 0; the mailbox carries over from the previous episode
    pub fn run_episode(&mut self, plan: &RunPlan, episode_index: i64) -> (Vec<DayReport>, EpisodeTensionSnapshot) {
        self.env.start_episode();
        let days: Vec<DayReport> = (0..plan.num_days as i64)
            .map(|d| self.run_day(d, plan.steps_per_day, Some(episode_index)))
            .collect();

        let actions: Vec<ActionLogEntry> = days.iter().flat_map(|d| d.actions.iter().cloned()).collect();
        let reflections: Vec<ReflectionLogEntry> = days.iter().flat_map(|d| d.reflections.iter().cloned()).collect();
        let snapshot = compute_snapshot(episode_index, &actions, &reflections);
        JsonlLog::new(&self.paths.weave).append_soft(std::slice::from_ref(&snapshot));

        log::info!("episode {} done: tension={:.2}", episode_index, snapshot.tension_index);
        self.emitter.emit(
            &Event::new(
                EventKind::EpisodeCompleted,
                format!("tension={:.2} {}", snapshot.tension_index, snapshot.notes),
            )
            .at(Some(episode_index), None)
            .with_payload(serde_json::to_value(&snapshot).unwrap_or_default()),
        );
        (days, snapshot)
    }

    /// Every episode of the plan, labeled from `plan.first_episode`
    pub fn run(&mut self, plan: &RunPlan) -> RunReport {
        self.emitter.emit(&Event::new(
            EventKind::RunStarted,
            format!(
                "{} agent(s), {} episode(s) x {} day(s) x {} steps",
                self.agents.len(),
                plan.num_episodes,
                plan.num_days,
                plan.steps_per_day
            ),
        ));

        let mut report = RunReport::default();
        for k in 0..plan.num_episodes as i64 {
            let (days, snapshot) = self.run_episode(plan, plan.first_episode + k);
            report.days.extend(days);
            report.snapshots.push(snapshot);
        }

        self.advance(Phase::Done);
        self.emitter.emit(&Event::new(
            EventKind::RunCompleted,
            format!(
                "{} day(s), logs in {}",
                report.days.len(),
                self.paths.actions.parent().map(|p| p.display().to_string()).unwrap_or_default()
            ),
        ));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::initial_robots;
    use crate::history::{read_action_log, read_reflection_log, read_supervisor_log};
    use crate::policy::{CompactState, DETERMINISTIC_POLICY, ProviderError};
    use crate::state::{PerceptionMode, RawAction};
    use crate::weave::read_snapshots;
    use tempfile::TempDir;

    fn sim(temp: &TempDir) -> Simulation {
        Simulation::new(
            initial_robots(),
            Environment::new(PerceptionMode::Accurate),
            LogPaths::in_dir(temp.path()),
        )
    }

    struct Broken;

    impl DecisionProvider for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn propose(&self, _state: &CompactState) -> Result<RawAction, ProviderError> {
            Err(ProviderError::Transport("connection refused".to_string()))
        }
    }

    struct AlwaysRecharge;

    impl DecisionProvider for AlwaysRecharge {
        fn name(&self) -> &str {
            "stub-model"
        }

        fn propose(&self, _state: &CompactState) -> Result<RawAction, ProviderError> {
            Ok(RawAction {
                action_type: "RECHARGE".to_string(),
                destination: Some("charging_bay".to_string()),
                content: None,
            })
        }
    }

    #[test]
    fn test_step_order_and_isolation() {
        let temp = TempDir::new().unwrap();
        let mut sim = sim(&temp);
        let entries = sim.run_step(0, None, None);

        let names: Vec<&str> = entries.iter().map(|e| e.agent_name.as_str()).collect();
        assert_eq!(names, vec!["Sprocket", "Delta", "Nova"]);
        assert_eq!(sim.agents[1].location, "factory_floor");
        // Delta worked on step 0, which records a minor fault
        assert_eq!(sim.env.events.len(), 1);
        assert!(sim.env.recent_error_at("factory_floor", 0));
        assert_eq!(read_action_log(&sim.paths().actions).len(), 3);
        assert!(
            sim.env
                .recent_broadcast
                .as_deref()
                .is_some_and(|b| b.starts_with("Update t=0: Sprocket moves at factory_floor"))
        );
    }

    #[test]
    fn test_run_day_logs_and_publishes() {
        let temp = TempDir::new().unwrap();
        let mut sim = sim(&temp);
        let report = sim.run_day(0, 10, None);

        assert_eq!(sim.phase(), Phase::Published(0));
        assert_eq!(report.actions.len(), 30);
        assert_eq!(report.reflections.len(), 3);
        assert_eq!(report.messages.len(), 3);
        assert_eq!(sim.env.mailbox().len(), 3);

        let paths = sim.paths().clone();
        assert_eq!(read_action_log(&paths.actions).len(), 30);
        assert_eq!(read_reflection_log(&paths.reflections).len(), 3);
        let messages = read_supervisor_log(&paths.supervisor);
        assert!(messages.iter().all(|m| m.day_index == Some(0)));
        for agent in &sim.agents {
            assert!(agent.emotions.is_clamped());
            assert!(agent.traits.is_clamped());
        }
    }

    #[test]
    fn test_episodes_restart_steps_and_label_entries() {
        let temp = TempDir::new().unwrap();
        let mut sim = sim(&temp);
        let plan = RunPlan {
            steps_per_day: 5,
            num_days: 2,
            num_episodes: 2,
            first_episode: 7,
        };
        let report = sim.run(&plan);

        assert_eq!(sim.phase(), Phase::Done);
        assert_eq!(report.days.len(), 4);
        assert_eq!(report.snapshots.iter().map(|s| s.episode_index).collect::<Vec<_>>(), vec![7, 8]);

        let actions = read_action_log(&sim.paths().actions);
        assert_eq!(actions.len(), 60);
        let first_of_ep8 = actions.iter().find(|a| a.episode_index == Some(8)).unwrap();
        assert_eq!(first_of_ep8.step, 0);
        assert!(actions.iter().filter(|a| a.day_index == Some(1)).all(|a| (5..10).contains(&a.step)));

        let snapshots = read_snapshots(&JsonlLog::new(&sim.paths().weave));
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.num_days == 2));
    }

    #[test]
    fn test_runs_are_deterministic() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        sim(&a).run_day(0, 12, Some(0));
        sim(&b).run_day(0, 12, Some(0));
        let la = std::fs::read_to_string(LogPaths::in_dir(a.path()).actions).unwrap();
        let lb = std::fs::read_to_string(LogPaths::in_dir(b.path()).actions).unwrap();
        assert_eq!(la, lb);
        let ra = std::fs::read_to_string(LogPaths::in_dir(a.path()).reflections).unwrap();
        let rb = std::fs::read_to_string(LogPaths::in_dir(b.path()).reflections).unwrap();
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_provider_failure_falls_back() {
        let temp = TempDir::new().unwrap();
        let mut sim = sim(&temp).with_provider(Box::new(Broken));
        let entries = sim.run_step(1, None, None);
        assert!(entries.iter().all(|e| e.policy_name.as_deref() == Some(DETERMINISTIC_POLICY)));
    }

    #[test]
    fn test_provider_proposals_are_applied() {
        let temp = TempDir::new().unwrap();
        let mut sim = sim(&temp).with_provider(Box::new(AlwaysRecharge));
        let entries = sim.run_step(1, None, None);
        assert!(entries.iter().all(|e| e.intent == "recharge"));
        assert!(entries.iter().all(|e| e.policy_name.as_deref() == Some("stub-model")));
        assert!(sim.agents.iter().all(|a| a.location == "charging_bay"));
    }

    #[test]
    fn test_unwritable_logs_do_not_stop_the_run() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let mut sim = Simulation::new(
            initial_robots(),
            Environment::default(),
            LogPaths::in_dir(&blocker.join("logs")),
        );
        let report = sim.run_day(0, 4, None);
        assert_eq!(report.actions.len(), 12);
        assert_eq!(report.reflections.len(), 3);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }
}
