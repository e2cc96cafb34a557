//! Log path resolution
//!
//! Per stream: runtime env override > explicit path > built-in default.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{Config, PathsConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Actions,
    Reflections,
    Supervisor,
    Weave,
}

impl LogStream {
    pub const ALL: [LogStream; 4] = [Self::Actions, Self::Reflections, Self::Supervisor, Self::Weave];

    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Actions => "ACTION_LOG_PATH",
            Self::Reflections => "REFLECTION_LOG_PATH",
            Self::Supervisor => "SUPERVISOR_LOG_PATH",
            Self::Weave => "WEAVE_LOG_PATH",
        }
    }

    pub fn default_path(&self) -> PathBuf {
        let file = match self {
            Self::Actions => "loopforge_actions.jsonl",
            Self::Reflections => "loopforge_reflections.jsonl",
            Self::Supervisor => "loopforge_supervisor.jsonl",
            Self::Weave => "loopforge_weave.jsonl",
        };
        PathBuf::from("logs").join(file)
    }

    fn explicit<'a>(&self, paths: &'a PathsConfig) -> Option<&'a Path> {
        match self {
            Self::Actions => paths.action_log.as_deref(),
            Self::Reflections => paths.reflection_log.as_deref(),
            Self::Supervisor => paths.supervisor_log.as_deref(),
            Self::Weave => paths.weave_log.as_deref(),
        }
    }
}

/// Pure precedence rule; blank env values count as unset
pub fn resolve_with(env_value: Option<&str>, explicit: Option<&Path>, default: &Path) -> PathBuf {
    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return Config::expand_path(Path::new(value));
    }
    match explicit {
        Some(path) => Config::expand_path(path),
        None => default.to_path_buf(),
    }
}

pub fn resolve(stream: LogStream, explicit: Option<&Path>) -> PathBuf {
    let env_value = std::env::var(stream.env_var()).ok();
    resolve_with(env_value.as_deref(), explicit, &stream.default_path())
}

/// Resolved locations of every stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogPaths {
    pub actions: PathBuf,
    pub reflections: PathBuf,
    pub supervisor: PathBuf,
    pub weave: PathBuf,
}

impl LogPaths {
    pub fn resolve(paths: &PathsConfig) -> Self {
        let get = |stream: LogStream| resolve(stream, stream.explicit(paths));
        Self {
            actions: get(LogStream::Actions),
            reflections: get(LogStream::Reflections),
            supervisor: get(LogStream::Supervisor),
            weave: get(LogStream::Weave),
        }
    }

    /// All streams under one directory, default file names
    pub fn in_dir(dir: &Path) -> Self {
        let file = |stream: LogStream| {
            let default = stream.default_path();
            dir.join(default.file_name().unwrap_or(default.as_os_str()))
        };
        Self {
            actions: file(LogStream::Actions),
            reflections: file(LogStream::Reflections),
            supervisor: file(LogStream::Supervisor),
            weave: file(LogStream::Weave),
        }
    }

    /// Streams under `dir` as the explicit location; env overrides still win
    pub fn resolve_in_dir(dir: &Path) -> Self {
        let in_dir = Self::in_dir(dir);
        let get = |stream: LogStream| resolve(stream, Some(in_dir.get(stream)));
        Self {
            actions: get(LogStream::Actions),
            reflections: get(LogStream::Reflections),
            supervisor: get(LogStream::Supervisor),
            weave: get(LogStream::Weave),
        }
    }

    pub fn get(&self, stream: LogStream) -> &Path {
        match stream {
            LogStream::Actions => &self.actions,
            LogStream::Reflections => &self.reflections,
            LogStream::Supervisor => &self.supervisor,
            LogStream::Weave => &self.weave,
        }
    }
}
