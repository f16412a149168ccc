use std::sync::Mutex;

use super::{AuditEvent, AuditSink};
use crate::consts::APP_NAME;

/// In-memory sink: keeps both the events and their rendered lines.
pub struct MemoryAuditSink {
    app: String,
    events: Mutex<Vec<AuditEvent>>,
    lines: Mutex<Vec<String>>,
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new(APP_NAME)
    }
}

impl MemoryAuditSink {
    pub fn new<S: Into<String>>(app: S) -> Self {
        Self {
            app: app.into(),
            events: Mutex::new(Vec::new()),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Subjects of all recorded events, in emission order.
    pub fn subjects(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.subject).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut v) = self.events.lock() {
            v.clear();
        }
        if let Ok(mut v) = self.lines.lock() {
            v.clear();
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, event: &AuditEvent) {
        let line = event.to_line(&self.app);
        if let Ok(mut v) = self.events.lock() {
            v.push(event.clone());
        }
        if let Ok(mut v) = self.lines.lock() {
            v.push(line);
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn write(&self, _event: &AuditEvent) {}
}
