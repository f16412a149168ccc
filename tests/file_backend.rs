use anyhow::Result;
use base64::Engine;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use backup_monkey::audit::MemoryAuditSink;
use backup_monkey::cloud::{AccountState, Connector, Credentials, Ec2, FileCloud, RoleGrant};
use backup_monkey::config::MonkeyConfig;
use backup_monkey::connection::{ConnectMode, ConnectionResolver};
use backup_monkey::consts::ROLE_SESSION_NAME;
use backup_monkey::model::{Tags, Volume};
use backup_monkey::monkey::BackupMonkey;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("bmtest-file-{prefix}-{pid}-{t}-{id}"))
}

fn seed_state() -> AccountState {
    let mut st = AccountState::new("111122223333");
    st.volumes.push(Volume::new("vol-1").attached("i-1", "/dev/sda1").with_tag("env", "prod"));
    st.volumes.push(Volume::new("vol-2").with_tag("env", "dev"));
    st.roles.push(RoleGrant::new("111122223333", "backup"));
    st
}

fn creds() -> Option<Credentials> {
    Some(Credentials::new("AKIAFILETEST", "file-secret"))
}

#[test]
fn create_refuses_to_clobber_and_open_requires_file() -> Result<()> {
    let root = unique_root("create");
    let path = root.join("account.json");
    assert!(FileCloud::open(&path).is_err());

    FileCloud::create(&path, &seed_state())?;
    assert!(FileCloud::create(&path, &seed_state()).is_err());

    let cloud = FileCloud::open(&path)?;
    assert_eq!(cloud.snapshot_state()?.account_id, "111122223333");

    fs::write(&path, b"{ not json")?;
    assert!(FileCloud::open(&path).is_err());

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn snapshots_persist_across_handles() -> Result<()> {
    let root = unique_root("persist");
    let path = root.join("account.json");
    let cloud = FileCloud::create(&path, &seed_state())?;

    let snap = cloud.create_snapshot("vol-1", "BACKUP_MONKEY vol-1 i-1 /dev/sda1")?;
    assert!(snap.id.starts_with("snap-"));
    let mut tags = Tags::new();
    tags.insert("env".into(), "prod".into());
    cloud.tag_resource(&snap.id, &tags)?;

    let reopened = FileCloud::open(&path)?;
    let all = reopened.list_snapshots()?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, snap.id);
    assert_eq!(all[0].tags, tags);
    assert!(all[0].status.is_completed());

    reopened.delete_snapshot(&snap.id)?;
    let again = cloud.delete_snapshot(&snap.id).unwrap_err();
    assert_eq!(again.code, "InvalidSnapshot.NotFound");

    let missing = cloud.create_snapshot("vol-404", "BACKUP_MONKEY vol-404").unwrap_err();
    assert_eq!(missing.code, "InvalidVolume.NotFound");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn assumed_role_credentials_are_temporary() -> Result<()> {
    let root = unique_root("sts");
    let path = root.join("account.json");
    let cloud = FileCloud::create(&path, &seed_state())?;
    let caller = Credentials::new("AKIAFILETEST", "file-secret");

    let tmp = cloud.assume_role(&caller, "arn:aws:iam::111122223333:role/backup", ROLE_SESSION_NAME)?;
    assert!(tmp.access_key.starts_with("ASIA"));
    assert!(tmp.is_temporary());
    let token = tmp.session_token().unwrap_or_default();
    let raw = base64::engine::general_purpose::STANDARD.decode(token)?;
    assert_eq!(raw.len(), 32);

    let denied = cloud
        .assume_role(&caller, "arn:aws:iam::111122223333:role/admin", ROLE_SESSION_NAME)
        .unwrap_err();
    assert_eq!(denied.code, "AccessDenied");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn full_run_over_state_file() -> Result<()> {
    let root = unique_root("run");
    let path = root.join("account.json");
    FileCloud::create(&path, &seed_state())?;

    let audit = Arc::new(MemoryAuditSink::default());
    let cfg = MonkeyConfig::default()
        .with_region("eu-west-1")
        .with_tags(["env:prod"])
        .with_max_snapshots_per_volume(2)
        .with_cross_account("111122223333", "backup");
    cfg.validate()?;

    let resolver = ConnectionResolver::new(FileCloud::open(&path)?, audit.clone()).with_credentials(creds());
    let conn = resolver.resolve(&cfg.region, &cfg.connect_mode())?;
    assert_eq!(conn.handle.region(), Some("eu-west-1"));
    assert!(matches!(conn.mode, ConnectMode::CrossAccount { .. }));

    let m = BackupMonkey::new(conn.handle, &cfg, audit.clone());
    for _ in 0..4 {
        let r = m.snapshot_volumes()?;
        assert_eq!(r.created.len(), 1);
        assert_eq!(r.created[0].volume_id, "vol-1");
        assert_eq!(r.created[0].description, "BACKUP_MONKEY vol-1 i-1 /dev/sda1");
    }
    let report = m.remove_old_snapshots()?;
    assert_eq!(report.deleted.len(), 2);

    let state = FileCloud::open(&path)?.snapshot_state()?;
    assert_eq!(state.snapshots.len(), 2);
    assert!(state.snapshots.iter().all(|s| s.tags.get("env").map(String::as_str) == Some("prod")));

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn overlapping_writers_serialize_on_the_lock() -> Result<()> {
    let root = unique_root("race");
    let path = root.join("account.json");
    FileCloud::create(&path, &seed_state())?;

    let mut handles = Vec::new();
    for t in 0..4 {
        let path = path.clone();
        handles.push(thread::spawn(move || -> Result<()> {
            let cloud = FileCloud::open(&path)?;
            for i in 0..10 {
                cloud.create_snapshot("vol-2", &format!("BACKUP_MONKEY vol-2 t{t} n{i}"))?;
            }
            Ok(())
        }));
    }
    for h in handles {
        h.join().expect("writer thread")?;
    }

    let state = FileCloud::open(&path)?.snapshot_state()?;
    assert_eq!(state.snapshots.len(), 40);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
