//! Integration tests for the simulation binary
//!
//! Every stream is redirected into a temp dir through the runtime env
//! overrides, so these tests never touch the working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Helper to get the loopforge binary path
fn loopforge_binary() -> PathBuf {
    // When running tests, the binary is in target/debug/loopforge
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps
    path.push("loopforge");
    path
}

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("loopforge.yaml"),
            "observability:\n  sinks: [file]\nsimulation:\n  steps_per_day: 6\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn log(&self, name: &str) -> PathBuf {
        self.path().join("logs").join(name)
    }

    fn run(&self, args: &[&str]) -> std::process::Output {
        Command::new(loopforge_binary())
            .env("LOOPFORGE_DIR", self.path())
            .env("XDG_DATA_HOME", self.path().join("data"))
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("ACTION_LOG_PATH", self.log("actions.jsonl"))
            .env("REFLECTION_LOG_PATH", self.log("reflections.jsonl"))
            .env("SUPERVISOR_LOG_PATH", self.log("supervisor.jsonl"))
            .env("WEAVE_LOG_PATH", self.log("weave.jsonl"))
            .env_remove("LOOPFORGE_CONFIG")
            .env_remove("PERCEPTION_MODE")
            .env_remove("USE_LLM_POLICY")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute loopforge")
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "loopforge {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }

    fn lines(&self, name: &str) -> Vec<serde_json::Value> {
        fs::read_to_string(self.log(name))
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

#[test]
fn test_run_writes_every_stream() {
    let sandbox = Sandbox::new();
    let summary = sandbox.json(&["run", "--days", "2", "--episodes", "2", "-o", "json"]);
    assert_eq!(summary["days"].as_array().unwrap().len(), 4);

    let actions = sandbox.lines("actions.jsonl");
    // 3 robots x 6 steps x 2 days x 2 episodes
    assert_eq!(actions.len(), 72);
    assert!(actions.iter().all(|a| a["episode_index"].is_i64() && a["day_index"].is_i64()));
    assert!(actions.iter().all(|a| a["policy_name"] == "deterministic"));

    let reflections = sandbox.lines("reflections.jsonl");
    assert_eq!(reflections.len(), 12);
    assert!(reflections.iter().all(|r| r["traits_after"].is_object()));

    let messages = sandbox.lines("supervisor.jsonl");
    assert_eq!(messages.len(), 12);

    let weave = sandbox.lines("weave.jsonl");
    assert_eq!(weave.len(), 2);
    assert_eq!(weave[0]["episode_index"], 0);
    assert_eq!(weave[1]["episode_index"], 1);
}

#[test]
fn test_runs_are_reproducible() {
    let a = Sandbox::new();
    let b = Sandbox::new();
    assert!(a.run(&["run", "--quiet"]).status.success());
    assert!(b.run(&["run", "--quiet"]).status.success());
    assert_eq!(
        fs::read_to_string(a.log("actions.jsonl")).unwrap(),
        fs::read_to_string(b.log("actions.jsonl")).unwrap()
    );
    assert_eq!(
        fs::read_to_string(a.log("reflections.jsonl")).unwrap(),
        fs::read_to_string(b.log("reflections.jsonl")).unwrap()
    );
}

#[test]
fn test_fresh_truncates_previous_logs() {
    let sandbox = Sandbox::new();
    assert!(sandbox.run(&["run", "--quiet"]).status.success());
    assert!(sandbox.run(&["run", "--quiet"]).status.success());
    assert_eq!(sandbox.lines("actions.jsonl").len(), 36);

    assert!(sandbox.run(&["run", "--quiet", "--fresh"]).status.success());
    assert_eq!(sandbox.lines("actions.jsonl").len(), 18);
}

#[test]
fn test_rerun_continues_episode_labels() {
    let sandbox = Sandbox::new();
    assert!(sandbox.run(&["run", "--quiet"]).status.success());
    assert!(sandbox.run(&["run", "--quiet"]).status.success());

    let metrics = sandbox.json(&["metrics", "-o", "json"]);
    assert_eq!(metrics["actions_per_episode"]["0"], 18);
    assert_eq!(metrics["actions_per_episode"]["1"], 18);

    let weave = sandbox.json(&["weave", "-o", "json"]);
    assert_eq!(weave.as_array().unwrap().len(), 2);
}

#[test]
fn test_metrics_and_reports_read_logs() {
    let sandbox = Sandbox::new();
    assert!(sandbox.run(&["run", "--quiet", "--days", "2"]).status.success());

    let metrics = sandbox.json(&["metrics", "-o", "json"]);
    assert_eq!(metrics["incidents"]["total_steps"], 36);
    assert_eq!(metrics["perception_modes"]["total"], 6);

    let day = sandbox.json(&["report", "day", "1", "--episode", "0", "-o", "json"]);
    assert_eq!(day["day_index"], 1);
    assert_eq!(day["agent_stats"].as_object().unwrap().len(), 3);

    let episode = sandbox.json(&["report", "episode", "0", "-o", "json"]);
    assert_eq!(episode["days"].as_array().unwrap().len(), 2);
    assert_eq!(episode["tension_trend"].as_array().unwrap().len(), 2);

    let weave = sandbox.json(&["weave", "--recompute", "-o", "json"]);
    assert_eq!(weave.as_array().unwrap().len(), 1);
}

#[test]
fn test_weave_write_replaces_run_snapshots() {
    let sandbox = Sandbox::new();
    assert!(sandbox.run(&["run", "--quiet", "--days", "2"]).status.success());
    assert_eq!(sandbox.lines("weave.jsonl").len(), 1);

    let output = sandbox.run(&["weave", "--recompute", "--write", "-o", "json"]);
    assert!(output.status.success());
    assert_eq!(sandbox.lines("weave.jsonl").len(), 1);

    let weave = sandbox.json(&["weave", "-o", "json"]);
    let episodes: Vec<i64> = weave
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["episode_index"].as_i64().unwrap())
        .collect();
    assert_eq!(episodes, vec![0]);
}

#[test]
fn test_garbage_lines_are_skipped() {
    let sandbox = Sandbox::new();
    assert!(sandbox.run(&["run", "--quiet"]).status.success());

    let mut content = fs::read_to_string(sandbox.log("actions.jsonl")).unwrap();
    content.push_str("{not json\n");
    fs::write(sandbox.log("actions.jsonl"), content).unwrap();

    let metrics = sandbox.json(&["metrics", "-o", "json"]);
    assert_eq!(metrics["incidents"]["total_steps"], 18);
}

#[test]
fn test_missing_logs_are_empty_history() {
    let sandbox = Sandbox::new();
    let metrics = sandbox.json(&["metrics", "-o", "json"]);
    assert_eq!(metrics["incidents"]["total_steps"], 0);
    assert_eq!(metrics["incidents"]["incident_rate"], 0.0);
}

#[test]
fn test_agents_seed_and_list() {
    let sandbox = Sandbox::new();
    assert!(sandbox.run(&["agents", "seed", "--cast"]).status.success());

    let agents = sandbox.json(&["agents", "list", "-o", "json"]);
    assert_eq!(agents.as_array().unwrap().len(), 10);

    let output = sandbox.run(&["run", "--quiet", "--from-store"]);
    assert!(output.status.success());
    // 10 robots x 6 steps
    assert_eq!(sandbox.lines("actions.jsonl").len(), 60);
}

#[test]
fn test_spin_mode_is_logged() {
    let sandbox = Sandbox::new();
    assert!(
        sandbox
            .run(&["run", "--quiet", "--perception-mode", "spin"])
            .status
            .success()
    );
    let actions = sandbox.lines("actions.jsonl");
    assert!(actions.iter().all(|a| a["perception"]["perception_mode"] == "spin"));
}
