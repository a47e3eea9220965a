use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Append-only studio session log (`events.jsonl`), one JSON object per line.
///
/// Never put key material in a payload.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    session_id: String,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
        }
    }

    pub fn for_new_session(path: impl Into<PathBuf>) -> Self {
        Self::new(path, uuid::Uuid::new_v4().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Appends `payload` wrapped in the session envelope and returns the
    /// written event.
    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let event = self.envelope(event_type, payload);
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        append(&self.path, line.as_bytes())
            .with_context(|| format!("failed to append event to {}", self.path.display()))?;
        Ok(event)
    }

    /// `type`, `session_id` and `ts` always override same-named payload keys.
    fn envelope(&self, event_type: &str, mut payload: EventPayload) -> Value {
        payload.insert("type".to_string(), Value::from(event_type));
        payload.insert("session_id".to_string(), Value::from(self.session_id.as_str()));
        payload.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Value::Object(payload)
    }
}

/// Single `write_all` per line so concurrent appenders never interleave
/// within a line.
fn append(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(bytes)
}
