//! Run progress events
//!
//! Events fan out to the configured sinks:
//! - File (JSONL) - appended next to the action log
//! - Stdout - colored one-line progress
//! - HTTP - POSTed to the configured endpoint

pub mod emitter;

pub use emitter::{Event, EventEmitter, EventKind};
