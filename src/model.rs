//! Resource model shared by the core and the account backends.
//!
//! Volumes and snapshots belong to the cloud account; the core only reads
//! volumes and creates/reads/deletes snapshots. Tag maps are ordered
//! (`BTreeMap`) so that anything derived from them is deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tag key -> tag value (keys unique, order irrelevant to the provider).
pub type Tags = BTreeMap<String, String>;

/// Render tags the way audit records carry them: `k1:v1 k2:v2`.
pub fn tags_line(tags: &Tags) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Block-storage volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    /// Instance the volume is attached to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Device path on that instance (e.g. /dev/sda1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl Volume {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            instance_id: None,
            device: None,
            tags: Tags::new(),
        }
    }

    pub fn attached<I: Into<String>, D: Into<String>>(mut self, instance_id: I, device: D) -> Self {
        self.instance_id = Some(instance_id.into());
        self.device = Some(device.into());
        self
    }

    pub fn with_tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags_line(&self) -> String {
        tags_line(&self.tags)
    }
}

/// Snapshot lifecycle state as reported by the provider.
///
/// Only `Completed` snapshots take part in retention; the set is open-ended,
/// anything unrecognized is kept verbatim in `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SnapshotStatus {
    Pending,
    Completed,
    Error,
    Other(String),
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SnapshotStatus::Pending => "pending",
            SnapshotStatus::Completed => "completed",
            SnapshotStatus::Error => "error",
            SnapshotStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SnapshotStatus::Completed)
    }
}

impl From<String> for SnapshotStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => SnapshotStatus::Pending,
            "completed" => SnapshotStatus::Completed,
            "error" => SnapshotStatus::Error,
            _ => SnapshotStatus::Other(s),
        }
    }
}

impl From<&str> for SnapshotStatus {
    fn from(s: &str) -> Self {
        SnapshotStatus::from(s.to_string())
    }
}

impl From<SnapshotStatus> for String {
    fn from(s: SnapshotStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub volume_id: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub status: SnapshotStatus,
    #[serde(default)]
    pub tags: Tags,
}

impl Snapshot {
    pub fn tags_line(&self) -> String {
        tags_line(&self.tags)
    }
}
