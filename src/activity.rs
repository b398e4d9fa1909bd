//! Append-only activity log.
//!
//! Every user-visible event (parse, per-paragraph progress, merge, treatment,
//! profile and update actions, failures) is recorded here with a wall-clock
//! timestamp and mirrored into the `log` facade at the matching level.  The
//! log is observational only; nothing reads it to make control-flow
//! decisions.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;

// ---------------------------------------------------------------------------
// ActivityLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Info,
    Ok,
    Warn,
    Error,
}

impl ActivityLevel {
    fn log_level(self) -> log::Level {
        match self {
            ActivityLevel::Info | ActivityLevel::Ok => log::Level::Info,
            ActivityLevel::Warn => log::Level::Warn,
            ActivityLevel::Error => log::Level::Error,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ActivityLevel::Info => "info",
            ActivityLevel::Ok => "ok",
            ActivityLevel::Warn => "warn",
            ActivityLevel::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// ActivityEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    /// Local time, `HH:MM:SS`.
    pub timestamp: String,
    pub level: ActivityLevel,
    pub message: String,
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:<5} {}", self.timestamp, self.level.tag(), self.message)
    }
}

// ---------------------------------------------------------------------------
// ActivityLog
// ---------------------------------------------------------------------------

/// Shared, append-only list of [`ActivityEntry`].  Cheap to clone; all clones
/// append to the same list.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: ActivityLevel, message: impl Into<String>) {
        let entry = ActivityEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        };
        log::log!(target: "activity", level.log_level(), "{}", entry.message);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(ActivityLevel::Info, message);
    }

    pub fn ok(&self, message: impl Into<String>) {
        self.push(ActivityLevel::Ok, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(ActivityLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(ActivityLevel::Error, message);
    }

    /// Snapshot of every entry so far, oldest first.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages only, handy for assertions.
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }
}
