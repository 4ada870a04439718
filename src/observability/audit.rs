//! Append-only audit log of wire traffic and workflow transitions.
//!
//! Every request/response pair and every state transition is recorded as an
//! [`AuditEntry`] and mirrored to `tracing` under the
//! `claim_portal::audit` target. The log is operator-facing: by default it is
//! the raw wire trace, wallet secrets included. Redaction is opt-in for the
//! stored entries; the `tracing` mirror is always redacted.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON keys whose values are masked when redaction is enabled.
const SECRET_KEYS: &[&str] = &[
    "privateKey",
    "walletPrivateKey",
    "mnemonic",
    "recoveryPhrase",
    "walletRecoveryPhrase",
];

const REDACTED: &str = "[REDACTED]";

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 0.
    pub seq: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub message: String,
    pub data: Value,
}

/// Shared, append-only audit log.
///
/// Cloning is cheap and every clone appends to the same sequence.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    redact_secrets: bool,
}

impl AuditLog {
    /// Create an empty log that records data verbatim.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log, optionally masking wallet secrets.
    pub fn with_redaction(redact_secrets: bool) -> Self {
        Self {
            entries: Arc::default(),
            redact_secrets,
        }
    }

    /// Append an entry.
    pub fn record(&self, message: impl Into<String>, data: Value) {
        let message = message.into();
        let data = if self.redact_secrets {
            redact(data)
        } else {
            data
        };

        let mut entries = self.lock();
        let entry = AuditEntry {
            seq: entries.len() as u64,
            timestamp_ms: now_ms(),
            message,
            data,
        };
        // The process log is not the audit log: secrets never reach it.
        if tracing::enabled!(target: "claim_portal::audit", tracing::Level::DEBUG) {
            tracing::debug!(
                target: "claim_portal::audit",
                seq = entry.seq,
                data = %redact(entry.data.clone()),
                "{}",
                entry.message
            );
        }
        entries.push(entry);
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Write every entry as one JSON object per line.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for entry in self.lock().iter() {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        // A panic mid-push cannot leave a half-written entry behind.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if SECRET_KEYS.contains(&key.as_str()) && !value.is_null() {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        // Response bodies are logged as raw text; mask them when they parse.
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => {
                Value::String(redact(parsed).to_string())
            }
            _ => Value::String(text),
        },
        other => other,
    }
}
