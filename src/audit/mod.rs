//! audit — структурированный журнал событий (одна запись = одна строка).
//!
//! Формат строки:
//!   app=..,body=..,category=..,severity=..,src_account=..,src_region=..,
//!   src_role=..,src_snapshot=..,src_tags=..,src_volume=..,subject=..,type=..
//!
//! - все 12 полей присутствуют всегда (пустые значения допустимы);
//! - пары отсортированы по имени поля и склеены через ',';
//! - CR/LF внутри значений заменяются пробелами, значения trim'аются.
//!
//! The sink is an explicit dependency: one `Arc<dyn AuditSink>` is configured
//! at process start and handed to every component that reports.

mod file;
mod memory;

pub use file::FileAuditSink;
pub use memory::{MemoryAuditSink, NullAuditSink};

use std::collections::BTreeMap;
use std::fmt;

use crate::util::single_line;

/// Declared audit fields, sorted by name.
pub const FIELDS: [&str; 12] = [
    "app",
    "body",
    "category",
    "severity",
    "src_account",
    "src_region",
    "src_role",
    "src_snapshot",
    "src_tags",
    "src_volume",
    "subject",
    "type",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Informational,
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Informational => "informational",
            Severity::Unknown => "unknown",
        }
    }

    /// Anything outside the closed set maps to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            "informational" => Severity::Informational,
            _ => Severity::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EventType {
    Alarm,
    Alert,
    #[default]
    Event,
    Task,
    Unknown,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Alarm => "alarm",
            EventType::Alert => "alert",
            EventType::Event => "event",
            EventType::Task => "task",
            EventType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "alarm" => EventType::Alarm,
            "alert" => EventType::Alert,
            "event" => EventType::Event,
            "task" => EventType::Task,
            _ => EventType::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Connection,
    Parameters,
    Volumes,
    Snapshots,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Connection => "connection",
            Category::Parameters => "parameters",
            Category::Volumes => "volumes",
            Category::Snapshots => "snapshots",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record. Unset optional fields are written as empty values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditEvent {
    /// Overrides the sink's application name when set.
    pub app: Option<String>,
    pub subject: String,
    pub body: Option<String>,
    pub severity: Severity,
    pub kind: EventType,
    pub category: Option<Category>,
    pub src_account: Option<String>,
    pub src_role: Option<String>,
    pub src_region: Option<String>,
    pub src_volume: Option<String>,
    pub src_snapshot: Option<String>,
    pub src_tags: Option<String>,
}

impl AuditEvent {
    pub fn new<S: ToString>(subject: S) -> Self {
        Self {
            subject: subject.to_string(),
            ..Self::default()
        }
    }

    pub fn body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn kind(mut self, kind: EventType) -> Self {
        self.kind = kind;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn account<S: Into<String>>(mut self, account: S) -> Self {
        self.src_account = Some(account.into());
        self
    }

    pub fn role<S: Into<String>>(mut self, role: S) -> Self {
        self.src_role = Some(role.into());
        self
    }

    pub fn region<S: Into<String>>(mut self, region: S) -> Self {
        self.src_region = Some(region.into());
        self
    }

    pub fn volume<S: Into<String>>(mut self, volume: S) -> Self {
        self.src_volume = Some(volume.into());
        self
    }

    pub fn snapshot<S: Into<String>>(mut self, snapshot: S) -> Self {
        self.src_snapshot = Some(snapshot.into());
        self
    }

    pub fn tags<S: Into<String>>(mut self, tags: S) -> Self {
        self.src_tags = Some(tags.into());
        self
    }

    /// Fill the region only if the event does not carry one yet.
    pub fn region_or<S: Into<String>>(mut self, region: S) -> Self {
        if self.src_region.is_none() {
            self.src_region = Some(region.into());
        }
        self
    }

    /// Render the record as one line (without timestamp).
    pub fn to_line(&self, default_app: &str) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let app = match self.app.as_deref() {
            Some(a) if !a.trim().is_empty() => a.to_string(),
            _ => default_app.to_string(),
        };
        // порядок совпадает с FIELDS (уже отсортирован)
        let values: [String; 12] = [
            app,
            opt(&self.body),
            self.category.map(|c| c.as_str().to_string()).unwrap_or_default(),
            self.severity.as_str().to_string(),
            opt(&self.src_account),
            opt(&self.src_region),
            opt(&self.src_role),
            opt(&self.src_snapshot),
            opt(&self.src_tags),
            opt(&self.src_volume),
            self.subject.clone(),
            self.kind.as_str().to_string(),
        ];
        FIELDS
            .iter()
            .zip(values.iter())
            .map(|(k, v)| format!("{}={}", k, single_line(v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn write(&self, event: &AuditEvent);
}

/// Parse a rendered line back into field -> value (best effort: values that
/// themselves contain ',' are not recoverable). A leading timestamp before the
/// first key is ignored.
pub fn parse_line(line: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for part in line.trim_end().split(',') {
        if let Some((k, v)) = part.split_once('=') {
            let key = k.rsplit(' ').next().unwrap_or(k);
            out.insert(key.to_string(), v.trim().to_string());
        }
    }
    out
}
