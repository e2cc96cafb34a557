//! Append-only JSONL event streams
//!
//! One JSON object per line, one file per stream. Writers create parent
//! directories; readers treat a missing file as empty history and skip lines
//! that do not parse.

pub mod paths;
pub mod window;

use eyre::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::state::{ActionLogEntry, ReflectionLogEntry, SupervisorMessage};

pub use paths::{LogPaths, LogStream};
pub use window::{day_of_step, entries_for_day, segment_by_day, segment_by_episode};

/// Handle on one JSONL stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append records, one line each
    pub fn append_all<T: Serialize>(&self, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record).context("Failed to serialize record")?);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log: {}", self.path.display()))?;

        file.write_all(buf.as_bytes()).context("Failed to write log")?;
        Ok(())
    }

    /// Swap the whole stream for `records`; readers see the old file or the new one
    pub fn replace_all<T: Serialize>(&self, records: &[T]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        for record in records {
            serde_json::to_writer(&mut tmp, record).context("Failed to serialize record")?;
            tmp.write_all(b"\n").context("Failed to write log")?;
        }
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace log: {}", self.path.display()))?;
        Ok(())
    }

    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Append and swallow failures; the simulation never stops for logging
    pub fn append_soft<T: Serialize>(&self, records: &[T]) {
        if let Err(e) = self.append_all(records) {
            log::warn!("Dropped {} record(s) for {}: {:#}", records.len(), self.path.display(), e);
        }
    }

    /// Every parseable record; missing file is empty history
    pub fn read<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.path).with_context(|| format!("Failed to read log: {}", self.path.display()))?;

        let mut records = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("{}:{}: skipping malformed line: {}", self.path.display(), lineno + 1, e),
            }
        }

        Ok(records)
    }

    /// Like `read`, but an unreadable file is also empty history
    pub fn read_soft<T: DeserializeOwned>(&self) -> Vec<T> {
        self.read().unwrap_or_else(|e| {
            log::warn!("Treating {} as empty: {:#}", self.path.display(), e);
            Vec::new()
        })
    }
}

pub fn read_action_log(path: &Path) -> Vec<ActionLogEntry> {
    JsonlLog::new(path).read_soft()
}

pub fn read_reflection_log(path: &Path) -> Vec<ReflectionLogEntry> {
    JsonlLog::new(path).read_soft()
}

pub fn read_supervisor_log(path: &Path) -> Vec<SupervisorMessage> {
    JsonlLog::new(path).read_soft()
}
