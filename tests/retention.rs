use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use oorandom::Rand64;
use std::collections::BTreeMap;
use std::sync::Arc;

use backup_monkey::audit::{Category, MemoryAuditSink};
use backup_monkey::cloud::MemoryCloud;
use backup_monkey::config::MonkeyConfig;
use backup_monkey::model::{Snapshot, SnapshotStatus, Tags, Volume};
use backup_monkey::monkey::BackupMonkey;
use backup_monkey::retention::{RetentionPlan, SkipReason};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + secs, 0).single().unwrap()
}

fn snap(id: &str, volume: &str, t: i64) -> Snapshot {
    Snapshot {
        id: id.to_string(),
        volume_id: volume.to_string(),
        description: format!("BACKUP_MONKEY {volume}"),
        start_time: at(t),
        status: SnapshotStatus::Completed,
        tags: Tags::new(),
    }
}

fn ids(snaps: &[Snapshot]) -> Vec<&str> {
    snaps.iter().map(|s| s.id.as_str()).collect()
}

#[test]
fn keeps_newest_n_per_volume() {
    let plan = RetentionPlan::build(
        vec![
            snap("s1", "vol-1", 1),
            snap("s3", "vol-1", 3),
            snap("s2", "vol-1", 2),
            snap("s4", "vol-1", 4),
            snap("t1", "vol-2", 1),
        ],
        2,
    );
    let v1 = plan.volume("vol-1").unwrap();
    assert_eq!(ids(&v1.keep), vec!["s4", "s3"]);
    assert_eq!(ids(&v1.delete), vec!["s2", "s1"]);
    let v2 = plan.volume("vol-2").unwrap();
    assert_eq!(ids(&v2.keep), vec!["t1"]);
    assert!(v2.delete.is_empty());
    assert_eq!(plan.deletion_count(), 2);
    assert_eq!(plan.kept_count(), 3);
}

#[test]
fn zero_retention_deletes_all_managed() {
    let plan = RetentionPlan::build(vec![snap("a", "vol-1", 1), snap("b", "vol-1", 2)], 0);
    assert_eq!(plan.deletion_count(), 2);
    assert_eq!(plan.kept_count(), 0);
}

#[test]
fn foreign_and_incomplete_snapshots_are_skipped() {
    let mut foreign = snap("f", "vol-1", 0);
    foreign.description = "Created by CreateImage(i-1) for ami-1".into();
    let mut pending = snap("p", "vol-1", -10);
    pending.status = SnapshotStatus::Pending;
    let mut failed = snap("e", "vol-1", -20);
    failed.status = SnapshotStatus::Error;
    let mut odd = snap("o", "vol-1", -30);
    odd.status = SnapshotStatus::from("recoverable");

    let plan = RetentionPlan::build(
        vec![foreign, pending, failed, odd, snap("s1", "vol-1", 1), snap("s2", "vol-1", 2)],
        1,
    );
    let skipped: BTreeMap<&str, SkipReason> = plan
        .skipped
        .iter()
        .map(|s| (s.snapshot_id.as_str(), s.reason))
        .collect();
    assert_eq!(skipped.get("f"), Some(&SkipReason::NotManaged));
    assert_eq!(skipped.get("p"), Some(&SkipReason::NotCompleted));
    assert_eq!(skipped.get("e"), Some(&SkipReason::NotCompleted));
    assert_eq!(skipped.get("o"), Some(&SkipReason::NotCompleted));

    // skipped snapshots do not count against retention
    let v = plan.volume("vol-1").unwrap();
    assert_eq!(ids(&v.keep), vec!["s2"]);
    assert_eq!(ids(&v.delete), vec!["s1"]);
}

#[test]
fn equal_timestamps_break_ties_by_id() {
    let input = vec![snap("snap-a", "vol-1", 5), snap("snap-c", "vol-1", 5), snap("snap-b", "vol-1", 5)];
    let mut reversed = input.clone();
    reversed.reverse();

    let p1 = RetentionPlan::build(input, 1);
    let p2 = RetentionPlan::build(reversed, 1);
    assert_eq!(p1, p2);
    let v = p1.volume("vol-1").unwrap();
    assert_eq!(ids(&v.keep), vec!["snap-c"]);
    assert_eq!(ids(&v.delete), vec!["snap-b", "snap-a"]);
}

#[test]
fn groups_iterate_in_volume_order() {
    let plan = RetentionPlan::build(
        vec![snap("x", "vol-b", 1), snap("y", "vol-a", 1), snap("z", "vol-c", 1)],
        3,
    );
    let order: Vec<&str> = plan.volumes.iter().map(|v| v.volume_id.as_str()).collect();
    assert_eq!(order, vec!["vol-a", "vol-b", "vol-c"]);
}

#[test]
fn randomized_retention_respects_n() {
    let mut rng = Rand64::new(20_131_105);
    for round in 0..200 {
        let keep = rng.rand_range(0..5) as usize;
        let mut input = Vec::new();
        let mut managed: BTreeMap<String, Vec<(i64, String)>> = BTreeMap::new();
        for i in 0..rng.rand_range(0..30) {
            let vol = format!("vol-{}", rng.rand_range(0..4));
            let t = rng.rand_range(0..50) as i64;
            let id = format!("snap-{round:03}-{i:03}");
            let mut s = snap(&id, &vol, t);
            match rng.rand_range(0..6) {
                0 => s.description = "manual".into(),
                1 => s.status = SnapshotStatus::Pending,
                _ => managed.entry(vol.clone()).or_default().push((t, id.clone())),
            }
            input.push(s);
        }

        let plan = RetentionPlan::build(input, keep);
        assert_eq!(plan.volumes.len(), managed.len());
        for (vol, mut snaps) in managed {
            let m = snaps.len();
            let v = plan.volume(&vol).unwrap();
            assert_eq!(v.delete.len(), m.saturating_sub(keep), "round {round} vol {vol}");
            assert_eq!(v.keep.len(), m.min(keep));

            // deleted ones are always the oldest
            snaps.sort_by(|a, b| b.cmp(a));
            let expected_delete: Vec<&str> = snaps.iter().skip(keep).map(|(_, id)| id.as_str()).collect();
            assert_eq!(ids(&v.delete), expected_delete, "round {round} vol {vol}");
            if let (Some(oldest_kept), Some(newest_deleted)) = (v.keep.last(), v.delete.first()) {
                assert!(oldest_kept.start_time >= newest_deleted.start_time);
            }
        }
    }
}

fn account_with_history() -> MemoryCloud {
    let cloud = MemoryCloud::new();
    for v in ["vol-1", "vol-2"] {
        cloud.add_volume(Volume::new(v));
    }
    for (i, t) in [1, 2, 3, 4, 5].into_iter().enumerate() {
        cloud.add_snapshot(snap(&format!("snap-1{i}"), "vol-1", t));
    }
    for (i, t) in [10, 20, 30].into_iter().enumerate() {
        cloud.add_snapshot(snap(&format!("snap-2{i}"), "vol-2", t));
    }
    let mut manual = snap("snap-manual", "vol-1", -100);
    manual.description = "before upgrade".into();
    cloud.add_snapshot(manual);
    cloud
}

#[test]
fn enforce_retention_is_idempotent() -> Result<()> {
    let cloud = account_with_history();
    let audit = Arc::new(MemoryAuditSink::default());
    let m = BackupMonkey::new(cloud.clone(), &MonkeyConfig::default(), audit.clone());

    let first = m.enforce_retention(2)?;
    assert_eq!(first.deleted, vec!["snap-12", "snap-11", "snap-10", "snap-20"]);
    assert_eq!(first.skipped, 1);

    let second = m.enforce_retention(2)?;
    assert!(second.deleted.is_empty());

    let left = cloud.snapshot_ids();
    assert!(left.contains(&"snap-manual".to_string()));
    assert_eq!(left.len(), 5);
    Ok(())
}

#[test]
fn deletion_events_wrap_each_delete() -> Result<()> {
    let cloud = MemoryCloud::new();
    cloud.add_volume(Volume::new("vol-1"));
    cloud.add_snapshot(snap("snap-old", "vol-1", 1));
    cloud.add_snapshot(snap("snap-new", "vol-1", 2));
    let audit = Arc::new(MemoryAuditSink::default());
    let m = BackupMonkey::new(cloud.clone(), &MonkeyConfig::default(), audit.clone());

    let report = m.enforce_retention(1)?;
    assert_eq!(report.deleted, vec!["snap-old"]);

    let events = audit.events();
    let subjects: Vec<&str> = events.iter().map(|e| e.subject.as_str()).collect();
    assert_eq!(
        subjects,
        vec![
            "Fetching snapshots on `us-east-1` region",
            "Deleting snapshot `snap-old` with a description of `BACKUP_MONKEY vol-1`",
            "Successfully deleted snapshot `snap-old` with a description of `BACKUP_MONKEY vol-1`",
        ]
    );
    assert!(events.iter().all(|e| e.category == Some(Category::Snapshots)));
    assert_eq!(events[1].src_volume.as_deref(), Some("vol-1"));
    assert_eq!(events[2].src_snapshot.as_deref(), Some("snap-old"));
    Ok(())
}

#[test]
fn plan_does_not_delete() -> Result<()> {
    let cloud = account_with_history();
    let cfg = MonkeyConfig::default().with_max_snapshots_per_volume(1);
    let m = BackupMonkey::new(cloud.clone(), &cfg, Arc::new(MemoryAuditSink::default()));
    let plan = m.plan_retention()?;
    assert_eq!(plan.deletion_count(), 6);
    assert_eq!(cloud.snapshot_ids().len(), 9);
    Ok(())
}
