//! Error taxonomy of the core.
//!
//! Every variant carries the rendered status subject, the provider/parse
//! message and the identifiers needed to correlate it in the audit log.
//! Errors are turned into `critical`/`alarm` audit events with
//! [`MonkeyError::report`] before they are handed back to the caller.

use thiserror::Error;

use crate::audit::{AuditEvent, AuditSink, Category, EventType, Severity};
use crate::status::Status;

pub type Result<T> = std::result::Result<T, MonkeyError>;

/// Discriminant of [`MonkeyError`], convenient for matching in callers/tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RegionConnect,
    InvalidRegion,
    CrossAccount,
    InvalidFilterFormat,
    InvalidTagParameter,
    VolumesFetch,
    SnapshotsFetch,
    SnapshotCreate,
    SnapshotDelete,
    Batch,
    Config,
}

#[derive(Debug, Error)]
pub enum MonkeyError {
    #[error("{subject}: {message}")]
    RegionConnect {
        subject: String,
        region: String,
        message: String,
    },

    #[error("{subject}")]
    InvalidRegion { subject: String, region: String },

    #[error("{subject}: {message}")]
    CrossAccount {
        subject: String,
        account: String,
        role: String,
        region: String,
        message: String,
    },

    #[error("{subject}: {message}")]
    InvalidFilterFormat {
        subject: String,
        entry: String,
        message: String,
    },

    #[error("{subject}: {message}")]
    InvalidTagParameter {
        subject: String,
        tags: String,
        message: String,
    },

    #[error("{subject}: {message}")]
    VolumesFetch {
        subject: String,
        region: String,
        message: String,
    },

    #[error("{subject}: {message}")]
    SnapshotsFetch {
        subject: String,
        region: String,
        message: String,
    },

    #[error("{subject}: {message}")]
    SnapshotCreate {
        subject: String,
        volume: String,
        tags: String,
        message: String,
    },

    #[error("{subject}: {message}")]
    SnapshotDelete {
        subject: String,
        snapshot: String,
        volume: String,
        description: String,
        message: String,
    },

    /// Failures collected while finishing a batch under the continue policy.
    #[error("{} operation(s) failed (first: {})", .failures.len(), first_failure(.failures))]
    Batch {
        failures: Vec<MonkeyError>,
        completed: usize,
    },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

fn first_failure(failures: &[MonkeyError]) -> String {
    failures
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl MonkeyError {
    pub fn region_connect(region: &str, message: impl Into<String>) -> Self {
        MonkeyError::RegionConnect {
            subject: Status::RegionConnectError { region }.to_string(),
            region: region.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_region(region: &str) -> Self {
        MonkeyError::InvalidRegion {
            subject: Status::RegionConnectInvalid { region }.to_string(),
            region: region.to_string(),
        }
    }

    pub fn cross_account(
        account: &str,
        role: &str,
        region: &str,
        message: impl Into<String>,
    ) -> Self {
        MonkeyError::CrossAccount {
            subject: Status::CrossAccountError.to_string(),
            account: account.to_string(),
            role: role.to_string(),
            region: region.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_filter(entry: &str, message: impl Into<String>) -> Self {
        MonkeyError::InvalidFilterFormat {
            subject: Status::TagsInvalid.to_string(),
            entry: entry.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_tags(tags: &[String], message: impl Into<String>) -> Self {
        MonkeyError::InvalidTagParameter {
            subject: Status::TagsInvalid.to_string(),
            tags: tags.join(" "),
            message: message.into(),
        }
    }

    pub fn volumes_fetch(region: &str, message: impl Into<String>) -> Self {
        MonkeyError::VolumesFetch {
            subject: Status::VolumesFetchError { region }.to_string(),
            region: region.to_string(),
            message: message.into(),
        }
    }

    pub fn snapshots_fetch(region: &str, message: impl Into<String>) -> Self {
        MonkeyError::SnapshotsFetch {
            subject: Status::SnapshotsFetchError { region }.to_string(),
            region: region.to_string(),
            message: message.into(),
        }
    }

    pub fn snapshot_create(volume: &str, tags: &str, message: impl Into<String>) -> Self {
        MonkeyError::SnapshotCreate {
            subject: Status::SnapshotCreateError { volume }.to_string(),
            volume: volume.to_string(),
            tags: tags.to_string(),
            message: message.into(),
        }
    }

    pub fn snapshot_delete(
        snapshot: &str,
        volume: &str,
        description: &str,
        message: impl Into<String>,
    ) -> Self {
        MonkeyError::SnapshotDelete {
            subject: Status::SnapshotDeleteError { snapshot, description }.to_string(),
            snapshot: snapshot.to_string(),
            volume: volume.to_string(),
            description: description.to_string(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        MonkeyError::Config {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MonkeyError::RegionConnect { .. } => ErrorKind::RegionConnect,
            MonkeyError::InvalidRegion { .. } => ErrorKind::InvalidRegion,
            MonkeyError::CrossAccount { .. } => ErrorKind::CrossAccount,
            MonkeyError::InvalidFilterFormat { .. } => ErrorKind::InvalidFilterFormat,
            MonkeyError::InvalidTagParameter { .. } => ErrorKind::InvalidTagParameter,
            MonkeyError::VolumesFetch { .. } => ErrorKind::VolumesFetch,
            MonkeyError::SnapshotsFetch { .. } => ErrorKind::SnapshotsFetch,
            MonkeyError::SnapshotCreate { .. } => ErrorKind::SnapshotCreate,
            MonkeyError::SnapshotDelete { .. } => ErrorKind::SnapshotDelete,
            MonkeyError::Batch { .. } => ErrorKind::Batch,
            MonkeyError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Audit record describing this error (severity critical, type alarm).
    pub fn to_event(&self) -> AuditEvent {
        let alarm = |subject: &str| {
            AuditEvent::new(subject)
                .severity(Severity::Critical)
                .kind(EventType::Alarm)
        };
        match self {
            MonkeyError::RegionConnect { subject, region, message } => alarm(subject)
                .body(message.as_str())
                .region(region.as_str())
                .category(Category::Connection),
            MonkeyError::InvalidRegion { subject, region } => alarm(subject)
                .region(region.as_str())
                .category(Category::Connection),
            MonkeyError::CrossAccount { subject, account, role, region, message } => alarm(subject)
                .body(message.as_str())
                .account(account.as_str())
                .role(role.as_str())
                .region(region.as_str())
                .category(Category::Connection),
            MonkeyError::InvalidFilterFormat { subject, entry, message } => alarm(subject)
                .body(message.as_str())
                .tags(entry.as_str())
                .category(Category::Parameters),
            MonkeyError::InvalidTagParameter { subject, tags, message } => alarm(subject)
                .body(message.as_str())
                .tags(tags.as_str())
                .category(Category::Parameters),
            MonkeyError::VolumesFetch { subject, region, message } => alarm(subject)
                .body(message.as_str())
                .region(region.as_str())
                .category(Category::Volumes),
            MonkeyError::SnapshotsFetch { subject, region, message } => alarm(subject)
                .body(message.as_str())
                .region(region.as_str())
                .category(Category::Snapshots),
            MonkeyError::SnapshotCreate { subject, volume, tags, message } => alarm(subject)
                .body(message.as_str())
                .volume(volume.as_str())
                .tags(tags.as_str())
                .category(Category::Volumes),
            MonkeyError::SnapshotDelete { subject, snapshot, volume, message, .. } => {
                alarm(subject)
                    .body(message.as_str())
                    .snapshot(snapshot.as_str())
                    .volume(volume.as_str())
                    .category(Category::Snapshots)
            }
            MonkeyError::Batch { failures, .. } => alarm(&self.to_string()).body(
                failures
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            MonkeyError::Config { message } => alarm(&self.to_string())
                .body(message.as_str())
                .category(Category::Parameters),
        }
    }

    /// Write the error to the audit sink and hand it back.
    pub fn report(self, audit: &dyn AuditSink) -> Self {
        crate::metrics::record_failure();
        audit.write(&self.to_event());
        self
    }

    /// Same as [`report`](Self::report), stamping `region` when the event has none.
    pub fn report_in(self, audit: &dyn AuditSink, region: &str) -> Self {
        crate::metrics::record_failure();
        audit.write(&self.to_event().region_or(region));
        self
    }

    /// Failures this error stands for (itself, or the members of a batch).
    pub fn failures(&self) -> Vec<&MonkeyError> {
        match self {
            MonkeyError::Batch { failures, .. } => failures.iter().collect(),
            other => vec![other],
        }
    }
}
