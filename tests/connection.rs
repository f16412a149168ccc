use anyhow::Result;
use std::sync::Arc;

use backup_monkey::audit::{Category, MemoryAuditSink, Severity};
use backup_monkey::cloud::{Credentials, Ec2, MemoryCloud, Op, ProviderError};
use backup_monkey::connection::{role_arn, ConnectMode, ConnectionResolver};
use backup_monkey::error::{ErrorKind, MonkeyError};
use backup_monkey::model::Volume;

fn creds() -> Option<Credentials> {
    Some(Credentials::new("AKIATESTTESTTEST", "secret"))
}

fn resolver(cloud: &MemoryCloud, credentials: Option<Credentials>) -> (ConnectionResolver<MemoryCloud>, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::default());
    let r = ConnectionResolver::new(cloud.clone(), audit.clone()).with_credentials(credentials);
    (r, audit)
}

#[test]
fn direct_connect_yields_working_handle() -> Result<()> {
    let cloud = MemoryCloud::new();
    cloud.add_volume(Volume::new("vol-1"));
    let (r, audit) = resolver(&cloud, creds());

    let conn = r.resolve("us-west-2", &ConnectMode::Direct)?;
    assert_eq!(conn.region, "us-west-2");
    assert_eq!(conn.mode, ConnectMode::Direct);
    assert_eq!(conn.handle.list_volumes(None)?.len(), 1);

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].subject, "Connecting to `us-west-2` region");
    assert_eq!(events[0].category, Some(Category::Connection));
    assert_eq!(cloud.calls(Op::AssumeRole), 0);
    Ok(())
}

#[test]
fn missing_credentials_is_region_connect_error() {
    let cloud = MemoryCloud::new();
    let (r, audit) = resolver(&cloud, None);
    let err = r.resolve("us-east-1", &ConnectMode::Direct).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::RegionConnect);
    assert_eq!(cloud.calls(Op::Connect), 0);

    let last = audit.events().pop().expect("reported");
    assert_eq!(last.subject, "Cannot complete connection to `us-east-1` region");
    assert_eq!(last.severity, Severity::Critical);
}

#[test]
fn unknown_region_is_invalid_region() {
    let cloud = MemoryCloud::new();
    let (r, _) = resolver(&cloud, creds());
    let err = r.resolve("mars-north-1", &ConnectMode::Direct).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidRegion);
    match err {
        MonkeyError::InvalidRegion { region, subject } => {
            assert_eq!(region, "mars-north-1");
            assert!(subject.contains("valid region"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn account_region_list_limits_regions() {
    let cloud = MemoryCloud::new();
    cloud.set_regions(&["eu-central-1"]);
    let (r, _) = resolver(&cloud, creds());
    assert!(r.resolve("eu-central-1", &ConnectMode::Direct).is_ok());
    let err = r.resolve("us-east-1", &ConnectMode::Direct).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidRegion);
}

#[test]
fn provider_connect_failure_is_region_connect() {
    let cloud = MemoryCloud::new();
    cloud.fail(Op::Connect, Some("us-east-1"), ProviderError::new("AuthFailure", "bad key"), 1);
    let (r, _) = resolver(&cloud, creds());
    let err = r.resolve("us-east-1", &ConnectMode::Direct).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::RegionConnect);
    assert!(err.to_string().contains("bad key"));
}

fn cross() -> ConnectMode {
    ConnectMode::from_parts(Some("123456789012"), Some("backup"))
}

#[test]
fn cross_account_assumes_role_then_connects() -> Result<()> {
    let cloud = MemoryCloud::new();
    cloud.grant_role("123456789012", "backup");
    let (r, audit) = resolver(&cloud, creds());

    let conn = r.resolve("us-east-1", &cross())?;
    assert_eq!(conn.mode, cross());
    assert_eq!(cloud.calls(Op::AssumeRole), 1);
    assert_eq!(cloud.calls(Op::Connect), 1);

    let events = audit.events();
    assert_eq!(events.len(), 1);
    let e = &events[0];
    assert_eq!(
        e.subject,
        "Creating cross account connection to `123456789012` account using `backup` role on `us-east-1` region"
    );
    assert_eq!(e.src_account.as_deref(), Some("123456789012"));
    assert_eq!(e.src_role.as_deref(), Some("backup"));
    assert_eq!(e.src_region.as_deref(), Some("us-east-1"));
    Ok(())
}

#[test]
fn denied_role_is_cross_account_error() {
    let cloud = MemoryCloud::new();
    let (r, audit) = resolver(&cloud, creds());
    let err = r.resolve("us-east-1", &cross()).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::CrossAccount);
    match &err {
        MonkeyError::CrossAccount { account, role, message, .. } => {
            assert_eq!(account, "123456789012");
            assert_eq!(role, "backup");
            assert!(message.contains(&role_arn("123456789012", "backup")));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(cloud.calls(Op::Connect), 0);

    let last = audit.events().pop().expect("reported");
    assert_eq!(last.subject, "Cannot complete cross account connection");
    assert_eq!(last.src_account.as_deref(), Some("123456789012"));
    assert_eq!(last.src_role.as_deref(), Some("backup"));
}

#[test]
fn cross_account_without_credentials_fails_before_sts() {
    let cloud = MemoryCloud::new();
    cloud.grant_role("123456789012", "backup");
    let (r, _) = resolver(&cloud, None);
    let err = r.resolve("us-east-1", &cross()).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::CrossAccount);
    assert_eq!(cloud.calls(Op::AssumeRole), 0);
}

#[test]
fn cross_account_bad_region_is_invalid_region() {
    let cloud = MemoryCloud::new();
    cloud.grant_role("123456789012", "backup");
    let (r, _) = resolver(&cloud, creds());
    let err = r.resolve("nowhere-1", &cross()).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidRegion);
}

#[test]
fn credentials_debug_redacts_secrets() {
    let c = Credentials::new("AKIA1", "topsecret").with_session_token("tok123");
    let dbg = format!("{c:?}");
    assert!(dbg.contains("AKIA1"));
    assert!(!dbg.contains("topsecret"));
    assert!(!dbg.contains("tok123"));
}
