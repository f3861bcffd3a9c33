//! Bot activity log
//!
//! A side channel for observability. Components receive an [`ActivityLog`]
//! handle and publish structured entries into every registered sink. A log
//! with no sinks is valid; publishing never affects control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Severity of an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

/// Which part of the bot produced the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Pipeline,
    Risk,
    Queue,
    Trade,
    Exit,
    Wallet,
    System,
}

impl std::fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityCategory::Pipeline => "pipeline",
            ActivityCategory::Risk => "risk",
            ActivityCategory::Queue => "queue",
            ActivityCategory::Trade => "trade",
            ActivityCategory::Exit => "exit",
            ActivityCategory::Wallet => "wallet",
            ActivityCategory::System => "system",
        };
        write!(f, "{}", s)
    }
}

/// One structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub level: ActivityLevel,
    pub category: ActivityCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(level: ActivityLevel, category: ActivityCategory, message: impl Into<String>) -> Self {
        Self {
            level,
            category,
            message: message.into(),
            details: None,
            token_symbol: None,
            token_address: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the token this entry is about
    pub fn token(mut self, symbol: impl Into<String>, address: impl Into<String>) -> Self {
        self.token_symbol = Some(symbol.into());
        self.token_address = Some(address.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Receiver of activity entries
pub trait ActivitySink: Send + Sync {
    fn publish(&self, entry: &ActivityEntry);
}

/// Forwards entries to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn publish(&self, entry: &ActivityEntry) {
        let token = entry.token_address.as_deref().unwrap_or("-");
        let symbol = entry.token_symbol.as_deref().unwrap_or("-");
        match entry.level {
            ActivityLevel::Debug => {
                debug!(category = %entry.category, token, symbol, "{}", entry.message)
            }
            ActivityLevel::Info | ActivityLevel::Success => {
                info!(category = %entry.category, token, symbol, "{}", entry.message)
            }
            ActivityLevel::Warning => {
                warn!(category = %entry.category, token, symbol, "{}", entry.message)
            }
            ActivityLevel::Error => {
                error!(category = %entry.category, token, symbol, "{}", entry.message)
            }
        }
    }
}

/// Fans entries out to broadcast subscribers (dashboards, notifiers)
pub struct ChannelSink {
    tx: broadcast::Sender<ActivityEntry>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEntry> {
        self.tx.subscribe()
    }
}

impl ActivitySink for ChannelSink {
    fn publish(&self, entry: &ActivityEntry) {
        // No subscribers is fine
        let _ = self.tx.send(entry.clone());
    }
}

/// Keeps every entry in memory. Handy for `status` output and tests.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<ActivityEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }
}

impl ActivitySink for MemorySink {
    fn publish(&self, entry: &ActivityEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

/// Cloneable handle passed into every component constructor
#[derive(Clone, Default)]
pub struct ActivityLog {
    sinks: Arc<Vec<Arc<dyn ActivitySink>>>,
}

impl ActivityLog {
    /// A log with no sinks
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(sinks: Vec<Arc<dyn ActivitySink>>) -> Self {
        Self {
            sinks: Arc::new(sinks),
        }
    }

    /// Log that forwards to tracing only
    pub fn tracing() -> Self {
        Self::new(vec![Arc::new(TracingSink)])
    }

    /// Deliver an entry to every sink, in registration order
    pub fn publish(&self, entry: ActivityEntry) {
        for sink in self.sinks.iter() {
            sink.publish(&entry);
        }
    }

    pub fn info(&self, category: ActivityCategory, message: impl Into<String>) {
        self.publish(ActivityEntry::new(ActivityLevel::Info, category, message));
    }

    pub fn warn(&self, category: ActivityCategory, message: impl Into<String>) {
        self.publish(ActivityEntry::new(ActivityLevel::Warning, category, message));
    }

    pub fn error(&self, category: ActivityCategory, message: impl Into<String>) {
        self.publish(ActivityEntry::new(ActivityLevel::Error, category, message));
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
