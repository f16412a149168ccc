//! Retention planning: keep the N newest managed, completed snapshots per
//! volume and mark the rest for deletion.
//!
//! Planning is pure. Snapshots are grouped by volume, each group is ordered
//! newest first (equal timestamps fall back to snapshot id, descending) so a
//! repeated run over unchanged input produces the same plan.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::Snapshot;
use crate::namer::is_managed;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Description lacks the managed prefix.
    NotManaged,
    /// Still pending, failed, or otherwise not `completed`.
    NotCompleted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub snapshot_id: String,
    pub reason: SkipReason,
}

/// Decision for a single volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VolumeRetention {
    pub volume_id: String,
    /// Newest first.
    pub keep: Vec<Snapshot>,
    /// Newest first; all strictly older than (or tied-and-lower-id with) `keep`.
    pub delete: Vec<Snapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetentionPlan {
    pub keep_per_volume: usize,
    /// Ordered by volume id.
    pub volumes: Vec<VolumeRetention>,
    pub skipped: Vec<Skipped>,
}

/// Why a snapshot does not take part in retention, if it doesn't.
pub fn skip_reason(snapshot: &Snapshot) -> Option<SkipReason> {
    if !is_managed(&snapshot.description) {
        Some(SkipReason::NotManaged)
    } else if !snapshot.status.is_completed() {
        Some(SkipReason::NotCompleted)
    } else {
        None
    }
}

fn newest_first(a: &Snapshot, b: &Snapshot) -> Ordering {
    b.start_time
        .cmp(&a.start_time)
        .then_with(|| b.id.cmp(&a.id))
}

impl RetentionPlan {
    pub fn build(snapshots: Vec<Snapshot>, keep_per_volume: usize) -> Self {
        let mut skipped = Vec::new();
        let mut groups: BTreeMap<String, Vec<Snapshot>> = BTreeMap::new();

        for snap in snapshots {
            if let Some(reason) = skip_reason(&snap) {
                skipped.push(Skipped {
                    snapshot_id: snap.id,
                    reason,
                });
                continue;
            }
            groups.entry(snap.volume_id.clone()).or_default().push(snap);
        }

        let volumes = groups
            .into_iter()
            .map(|(volume_id, mut snaps)| {
                snaps.sort_by(newest_first);
                let cut = keep_per_volume.min(snaps.len());
                let delete = snaps.split_off(cut);
                VolumeRetention {
                    volume_id,
                    keep: snaps,
                    delete,
                }
            })
            .collect();

        Self {
            keep_per_volume,
            volumes,
            skipped,
        }
    }

    /// All snapshots marked for deletion, volume by volume.
    pub fn deletions(&self) -> impl Iterator<Item = &Snapshot> {
        self.volumes.iter().flat_map(|v| v.delete.iter())
    }

    pub fn deletion_count(&self) -> usize {
        self.volumes.iter().map(|v| v.delete.len()).sum()
    }

    pub fn kept_count(&self) -> usize {
        self.volumes.iter().map(|v| v.keep.len()).sum()
    }

    pub fn volume(&self, volume_id: &str) -> Option<&VolumeRetention> {
        self.volumes.iter().find(|v| v.volume_id == volume_id)
    }
}
