//! Request-trail logging, separate from the process-level `tracing` output.
//!
//! Handlers, the proxy layer, and the stream relay record one-line events
//! (request received, upstream status, skipped stream events, stream end)
//! through a [`SharedLogger`]. Entries are appended to a JSONL file and kept
//! in a capped in-memory ring; [`SharedLogger::recent`] reads the tail of
//! the ring in chronological order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Ring capacity; the JSONL file itself is unbounded.
const MAX_LOG_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One JSONL line: `{"timestamp":...,"level":...,"component":...,"message":...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
}

pub struct Logger {
    entries: VecDeque<LogEntry>,
    sink: Option<File>,
}

impl Logger {
    /// Open (or create) the JSONL file for appending. Entries from earlier
    /// runs stay in the file; the in-memory ring starts empty and only
    /// reflects the current process.
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sink = OpenOptions::new().create(true).append(true).open(file_path)?;

        Ok(Self {
            entries: VecDeque::new(),
            sink: Some(sink),
        })
    }

    /// Ring buffer only, nothing written to disk. For tests and demos.
    pub fn in_memory() -> Self {
        Self {
            entries: VecDeque::new(),
            sink: None,
        }
    }

    fn record(&mut self, level: LogLevel, component: String, message: String) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            component,
            message,
        };

        if let Some(sink) = self.sink.as_mut() {
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(sink, "{}", line);
            }
        }

        self.entries.push_back(entry);
        if self.entries.len() > MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
    }

    /// Last `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

/// Clone-able handle shared by the server, proxy, and relay.
#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::new(file_path)?))))
    }

    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Logger::in_memory())))
    }

    fn emit(&self, level: LogLevel, component: impl Into<String>, message: impl Into<String>) {
        // A poisoned lock drops the entry rather than propagating the panic.
        if let Ok(mut inner) = self.0.lock() {
            inner.record(level, component.into(), message.into());
        }
    }

    pub fn debug(&self, component: impl Into<String>, message: impl Into<String>) {
        self.emit(LogLevel::Debug, component, message);
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.emit(LogLevel::Info, component, message);
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.emit(LogLevel::Warn, component, message);
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.emit(LogLevel::Error, component, message);
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0.lock().map(|inner| inner.recent(limit)).unwrap_or_default()
    }
}

impl std::fmt::Debug for SharedLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLogger").finish_non_exhaustive()
    }
}
