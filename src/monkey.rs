//! BackupMonkey — оркестрация поверх одного account/region контекста.
//!
//! Две операции, которые можно вызывать независимо и безопасно повторять:
//! - `snapshot_volumes()` : выбрать тома по тегам и снять по снапшоту с каждого;
//! - `remove_old_snapshots()` / `enforce_retention(n)` : оставить N последних
//!   managed+completed снапшотов на том, остальные удалить.
//!
//! Каждый шаг пишет audit-событие до вызова провайдера и после успеха; любая
//! ошибка превращается в `MonkeyError`, пишется в audit (critical/alarm) и
//! только потом возвращается. Под `FailurePolicy::Continue` сбой одного тома
//! или снапшота не останавливает батч: ошибки собираются в `MonkeyError::Batch`.

use log::{debug, error, info};
use serde::Serialize;
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditSink, Category};
use crate::cloud::Ec2;
use crate::config::{FailurePolicy, MonkeyConfig};
use crate::error::{MonkeyError, Result};
use crate::filter::TagFilter;
use crate::metrics;
use crate::model::{tags_line, Snapshot, Volume};
use crate::namer::{describe, snapshot_tags};
use crate::retention::RetentionPlan;
use crate::status::Status;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreatedSnapshot {
    pub volume_id: String,
    pub snapshot_id: String,
    pub description: String,
}

/// What a run actually changed in the account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub volumes_selected: usize,
    pub created: Vec<CreatedSnapshot>,
    /// Deleted snapshot ids, in deletion order.
    pub deleted: Vec<String>,
    /// Snapshots left out of retention (foreign or not completed).
    pub skipped: usize,
}

impl RunReport {
    pub fn merge(&mut self, other: RunReport) {
        self.volumes_selected += other.volumes_selected;
        self.created.extend(other.created);
        self.deleted.extend(other.deleted);
        self.skipped += other.skipped;
    }

    fn completed(&self) -> usize {
        self.created.len() + self.deleted.len()
    }
}

pub struct BackupMonkey<E> {
    ec2: E,
    region: String,
    tags: Vec<String>,
    reverse_tags: bool,
    keep: usize,
    policy: FailurePolicy,
    audit: Arc<dyn AuditSink>,
}

impl<E: Ec2> BackupMonkey<E> {
    pub fn new(ec2: E, cfg: &MonkeyConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            ec2,
            region: cfg.region.clone(),
            tags: cfg.tags.clone(),
            reverse_tags: cfg.reverse_tags,
            keep: cfg.max_snapshots_per_volume,
            policy: cfg.failure_policy,
            audit,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ec2(&self) -> &E {
        &self.ec2
    }

    pub fn keep_per_volume(&self) -> usize {
        self.keep
    }

    fn info(&self, event: AuditEvent) {
        match event.body.as_deref() {
            Some(body) => info!("{}: {}", event.subject, body),
            None => info!("{}", event.subject),
        }
        self.audit.write(&event.region_or(self.region.as_str()));
    }

    fn fail(&self, err: MonkeyError) -> MonkeyError {
        err.report_in(self.audit.as_ref(), &self.region)
    }

    /// Parsed tag filter; any parse problem is a bad `--tags` parameter.
    fn filter(&self) -> Result<TagFilter> {
        TagFilter::parse(&self.tags, self.reverse_tags).map_err(|e| {
            let message = match e {
                MonkeyError::InvalidFilterFormat { message, .. } => message,
                other => other.to_string(),
            };
            self.fail(MonkeyError::invalid_tags(&self.tags, message))
        })
    }

    fn list_volumes(&self, filter: Option<&TagFilter>) -> Result<Vec<Volume>> {
        let filters = filter.map(|f| f.provider_filters());
        self.ec2
            .list_volumes(filters.as_ref())
            .map_err(|e| self.fail(MonkeyError::volumes_fetch(&self.region, e.to_string())))
    }

    /// Volumes to snapshot this run.
    pub fn volumes_to_snapshot(&self) -> Result<Vec<Volume>> {
        self.info(
            AuditEvent::new(Status::VolumesFetch {
                region: &self.region,
            })
            .category(Category::Volumes),
        );

        let volumes = if self.reverse_tags {
            let filter = self.filter()?;
            let all = self.list_volumes(None)?;
            let total = all.len();
            let kept: Vec<Volume> = all.into_iter().filter(|v| !filter.excludes(v)).collect();
            debug!("blacklist excluded {} of {} volume(s)", total - kept.len(), total);
            kept
        } else if self.tags.is_empty() {
            self.list_volumes(None)?
        } else {
            let filter = self.filter()?;
            self.list_volumes(Some(&filter))?
        };

        metrics::record_volumes_selected(volumes.len());
        Ok(volumes)
    }

    /// Snapshot one volume and copy its non-reserved tags onto the snapshot.
    pub fn create_snapshot(&self, volume: &Volume) -> Result<Snapshot> {
        let description = describe(volume);
        self.info(
            AuditEvent::new(Status::SnapshotCreate {
                volume: &volume.id,
                description: &description,
            })
            .volume(volume.id.as_str())
            .tags(volume.tags_line())
            .category(Category::Snapshots),
        );

        let create_err =
            |e: crate::cloud::ProviderError| MonkeyError::snapshot_create(&volume.id, &volume.tags_line(), e.to_string());

        let mut snapshot = self
            .ec2
            .create_snapshot(&volume.id, &description)
            .map_err(|e| self.fail(create_err(e)))?;

        if !volume.tags.is_empty() {
            let tags = snapshot_tags(&volume.tags);
            if !tags.is_empty() {
                self.ec2
                    .tag_resource(&snapshot.id, &tags)
                    .map_err(|e| self.fail(create_err(e)))?;
                snapshot.tags.extend(tags);
            }
        }

        metrics::record_snapshot_created();
        self.info(
            AuditEvent::new(Status::SnapshotCreateSuccess {
                snapshot: &snapshot.id,
                volume: &volume.id,
            })
            .volume(volume.id.as_str())
            .snapshot(snapshot.id.as_str())
            .tags(tags_line(&snapshot.tags))
            .category(Category::Snapshots),
        );
        Ok(snapshot)
    }

    /// Select volumes and snapshot each of them.
    pub fn snapshot_volumes(&self) -> Result<RunReport> {
        info!("Getting list of EBS volumes");
        let volumes = self.volumes_to_snapshot()?;
        info!("Found {} volumes", volumes.len());

        let mut report = RunReport {
            volumes_selected: volumes.len(),
            ..RunReport::default()
        };
        let mut failures = Vec::new();
        for volume in &volumes {
            match self.create_snapshot(volume) {
                Ok(s) => report.created.push(CreatedSnapshot {
                    volume_id: volume.id.clone(),
                    snapshot_id: s.id,
                    description: s.description,
                }),
                Err(e) => self.on_failure(e, &mut failures)?,
            }
        }
        self.finish(report, failures)
    }

    /// All snapshots owned by the account.
    pub fn fetch_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.info(
            AuditEvent::new(Status::SnapshotsFetch {
                region: &self.region,
            })
            .category(Category::Snapshots),
        );
        let snapshots = self
            .ec2
            .list_snapshots()
            .map_err(|e| self.fail(MonkeyError::snapshots_fetch(&self.region, e.to_string())))?;
        info!("Found {} snapshots", snapshots.len());
        Ok(snapshots)
    }

    /// Retention decision for the configured count, without deleting anything.
    pub fn plan_retention(&self) -> Result<RetentionPlan> {
        self.plan_with(self.keep)
    }

    fn plan_with(&self, keep: usize) -> Result<RetentionPlan> {
        let plan = RetentionPlan::build(self.fetch_snapshots()?, keep);
        for s in &plan.skipped {
            debug!("Skipping {} ({:?})", s.snapshot_id, s.reason);
        }
        Ok(plan)
    }

    pub fn remove_old_snapshots(&self) -> Result<RunReport> {
        self.enforce_retention(self.keep)
    }

    /// Keep the `keep` newest managed, completed snapshots per volume; delete the rest.
    pub fn enforce_retention(&self, keep: usize) -> Result<RunReport> {
        info!("Configured to keep {} snapshots per volume", keep);
        let plan = self.plan_with(keep)?;
        metrics::record_snapshots_skipped(plan.skipped.len());

        let mut report = RunReport {
            skipped: plan.skipped.len(),
            ..RunReport::default()
        };
        let mut failures = Vec::new();
        for group in &plan.volumes {
            info!(
                "Found {} snapshots for {}",
                group.keep.len() + group.delete.len(),
                group.volume_id
            );
            for snapshot in &group.delete {
                match self.delete_snapshot(snapshot) {
                    Ok(()) => report.deleted.push(snapshot.id.clone()),
                    Err(e) => self.on_failure(e, &mut failures)?,
                }
            }
        }
        self.finish(report, failures)
    }

    fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.info(
            AuditEvent::new(Status::SnapshotDelete {
                snapshot: &snapshot.id,
                description: &snapshot.description,
            })
            .snapshot(snapshot.id.as_str())
            .volume(snapshot.volume_id.as_str())
            .category(Category::Snapshots),
        );
        self.ec2.delete_snapshot(&snapshot.id).map_err(|e| {
            self.fail(MonkeyError::snapshot_delete(
                &snapshot.id,
                &snapshot.volume_id,
                &snapshot.description,
                e.to_string(),
            ))
        })?;
        metrics::record_snapshot_deleted();
        self.info(
            AuditEvent::new(Status::SnapshotDeleteSuccess {
                snapshot: &snapshot.id,
                description: &snapshot.description,
            })
            .snapshot(snapshot.id.as_str())
            .category(Category::Snapshots),
        );
        Ok(())
    }

    /// Abort: hand the (already reported) error back. Continue: keep it for later.
    fn on_failure(&self, err: MonkeyError, failures: &mut Vec<MonkeyError>) -> Result<()> {
        match self.policy {
            FailurePolicy::Abort => Err(err),
            FailurePolicy::Continue => {
                error!("{}", err);
                failures.push(err);
                Ok(())
            }
        }
    }

    fn finish(&self, report: RunReport, failures: Vec<MonkeyError>) -> Result<RunReport> {
        if failures.is_empty() {
            Ok(report)
        } else {
            Err(MonkeyError::Batch {
                completed: report.completed(),
                failures,
            })
        }
    }
}
