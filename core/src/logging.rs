//! Structured diagnostics kept in session memory.
//!
//! Every entry is also forwarded to the `log` facade so a host that installs
//! a logger sees the same stream.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub id: String,
    pub ts: i64,
    pub level: String,
    pub code: Option<String>,
    pub module: String,
    pub message: String,
    pub explain: Option<String>,
    pub data: Option<Value>,
}

/// Bounded event log; the oldest entries are dropped once full.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<LogEvent>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn log_event(
        &self,
        level: &str,
        code: Option<&str>,
        module: &str,
        message: &str,
        explain: Option<&str>,
        data: Option<Value>,
    ) {
        let event = LogEvent {
            id: Uuid::new_v4().to_string(),
            ts: OffsetDateTime::now_utc().unix_timestamp(),
            level: level.to_string(),
            code: code.map(str::to_string),
            module: module.to_string(),
            message: message.to_string(),
            explain: explain.map(str::to_string),
            data,
        };

        let line = match &event.code {
            Some(code) => format!("[{code}] {message}"),
            None => message.to_string(),
        };
        match level {
            "error" => log::error!(target: "blacklight", "{module}: {line}"),
            "warn" => log::warn!(target: "blacklight", "{module}: {line}"),
            "debug" => log::debug!(target: "blacklight", "{module}: {line}"),
            _ => log::info!(target: "blacklight", "{module}: {line}"),
        }

        // A poisoned lock only means another writer panicked mid-push.
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Copy of the retained events, oldest first.
    pub fn snapshot(&self) -> Vec<LogEvent> {
        match self.events.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}
