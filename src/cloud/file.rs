use anyhow::{anyhow, Context, Result};
use base64::Engine;
use chrono::Utc;
use fs2::FileExt;
use hmac::{Hmac, Mac};
use log::debug;
use rand::{Rng, RngCore};
use sha2::Sha256;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::state::AccountState;
use super::{Connector, Credentials, Ec2, ProviderError, ProviderFilters, ProviderResult};
use crate::model::{Snapshot, SnapshotStatus, Tags, Volume};

type HmacSha256 = Hmac<Sha256>;

/// Account backed by a JSON state file.
///
/// Every call takes an exclusive `fs2` lock on `<state>.lock`, reloads the
/// state, applies the operation and (for mutations) saves it atomically via
/// tmp+rename. Overlapping invocations against the same file therefore
/// serialize; a snapshot removed by another process surfaces as an ordinary
/// `InvalidSnapshot.NotFound` error.
#[derive(Clone, Debug)]
pub struct FileCloud {
    path: PathBuf,
    lock_path: PathBuf,
    region: Option<String>,
}

impl FileCloud {
    /// Open an existing state file (parsed once to fail early on garbage).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(anyhow!("account state {} does not exist", path.display()));
        }
        let cloud = Self::at(path);
        cloud.load()?;
        Ok(cloud)
    }

    /// Write a fresh state file. Refuses to clobber an existing one.
    pub fn create<P: AsRef<Path>>(path: P, state: &AccountState) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(anyhow!("account state {} already exists", path.display()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let cloud = Self::at(path);
        cloud.save(state)?;
        Ok(cloud)
    }

    fn at(path: PathBuf) -> Self {
        let mut lock_name = path.as_os_str().to_os_string();
        lock_name.push(".lock");
        Self {
            lock_path: PathBuf::from(lock_name),
            path,
            region: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Region this handle was connected to (None for the unconnected factory).
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Current state as stored on disk.
    pub fn snapshot_state(&self) -> Result<AccountState> {
        let _lk = self.lock_exclusive()?;
        self.load()
    }

    fn lock_exclusive(&self) -> Result<File> {
        let f = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .with_context(|| format!("open lock {}", self.lock_path.display()))?;
        f.lock_exclusive()
            .with_context(|| format!("lock_exclusive {}", self.lock_path.display()))?;
        Ok(f)
    }

    fn load(&self) -> Result<AccountState> {
        let bytes = fs::read(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        let state: AccountState = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(state)
    }

    fn save(&self, state: &AccountState) -> Result<()> {
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        {
            let mut f = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&tmp)
                .with_context(|| format!("open {}", tmp.display()))?;
            let data = serde_json::to_vec_pretty(state).context("serialize account state")?;
            f.write_all(&data)?;
            let _ = f.sync_all();
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }

    /// Run `op` against the locked state; persist it when `op` reports a change.
    fn transact<R>(
        &self,
        op: impl FnOnce(&mut AccountState) -> ProviderResult<(R, bool)>,
    ) -> ProviderResult<R> {
        let _lk = self.lock_exclusive().map_err(state_error)?;
        let mut state = self.load().map_err(state_error)?;
        let (out, dirty) = op(&mut state)?;
        if dirty {
            self.save(&state).map_err(state_error)?;
        }
        Ok(out)
    }
}

fn state_error(e: anyhow::Error) -> ProviderError {
    ProviderError::new("StateFileError", format!("{e:#}"))
}

fn new_snapshot_id() -> String {
    let n: u64 = rand::thread_rng().gen::<u64>() & 0x0FFF_FFFF_FFFF_FFFF;
    format!("snap-{n:017x}")
}

/// Derive a session token bound to the role and session name.
fn session_token(secret: &str, role_arn: &str, session_name: &str, issued: i64) -> ProviderResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ProviderError::new("InvalidClientTokenId", e.to_string()))?;
    mac.update(role_arn.as_bytes());
    mac.update(b"\n");
    mac.update(session_name.as_bytes());
    mac.update(b"\n");
    mac.update(&issued.to_le_bytes());
    let tag = mac.finalize().into_bytes();
    Ok(base64::engine::general_purpose::STANDARD.encode(tag))
}

impl Ec2 for FileCloud {
    fn list_volumes(&self, filters: Option<&ProviderFilters>) -> ProviderResult<Vec<Volume>> {
        self.transact(|s| Ok((s.volumes_matching(filters), false)))
    }

    fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>> {
        self.transact(|s| Ok((s.snapshots.clone(), false)))
    }

    fn create_snapshot(&self, volume_id: &str, description: &str) -> ProviderResult<Snapshot> {
        self.transact(|s| {
            let snap = s.insert_snapshot(
                new_snapshot_id(),
                volume_id,
                description,
                Utc::now(),
                SnapshotStatus::Completed,
            )?;
            debug!("file backend: created {} for {}", snap.id, volume_id);
            Ok((snap, true))
        })
    }

    fn tag_resource(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()> {
        self.transact(|s| s.tag(resource_id, tags).map(|_| ((), true)))
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> ProviderResult<()> {
        self.transact(|s| {
            s.remove_snapshot(snapshot_id)?;
            debug!("file backend: deleted {}", snapshot_id);
            Ok(((), true))
        })
    }
}

impl Connector for FileCloud {
    type Handle = FileCloud;

    fn connect(&self, region: &str, _credentials: &Credentials) -> ProviderResult<Option<FileCloud>> {
        let accepted = self.transact(|s| Ok((s.accepts_region(region), false)))?;
        if !accepted {
            return Ok(None);
        }
        let mut handle = self.clone();
        handle.region = Some(region.to_string());
        Ok(Some(handle))
    }

    fn assume_role(
        &self,
        credentials: &Credentials,
        role_arn: &str,
        session_name: &str,
    ) -> ProviderResult<Credentials> {
        let granted = self.transact(|s| Ok((s.grants(role_arn), false)))?;
        if !granted {
            return Err(ProviderError::access_denied(format!(
                "User {} is not authorized to perform: sts:AssumeRole on resource: {}",
                credentials.access_key, role_arn
            )));
        }
        let mut rng = rand::thread_rng();
        let access_key = format!("ASIA{:016X}", rng.gen::<u64>());
        let mut secret = [0u8; 30];
        rng.fill_bytes(&mut secret);
        let secret_key = base64::engine::general_purpose::STANDARD.encode(secret);
        let token = session_token(
            credentials.secret_key(),
            role_arn,
            session_name,
            Utc::now().timestamp(),
        )?;
        Ok(Credentials::new(access_key, secret_key).with_session_token(token))
    }
}
