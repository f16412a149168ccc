use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::state::{AccountState, RoleGrant};
use super::{Connector, Credentials, Ec2, ProviderError, ProviderFilters, ProviderResult};
use crate::model::{Snapshot, SnapshotStatus, Tags, Volume};

/// Provider operation, used to address injected faults and call counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Connect,
    AssumeRole,
    ListVolumes,
    ListSnapshots,
    CreateSnapshot,
    TagResource,
    DeleteSnapshot,
}

struct Fault {
    op: Op,
    target: Option<String>,
    error: ProviderError,
    remaining: usize,
}

struct Inner {
    state: AccountState,
    clock: DateTime<Utc>,
    next_id: u64,
    created_status: SnapshotStatus,
    faults: Vec<Fault>,
    calls: HashMap<Op, usize>,
    last_filters: Option<ProviderFilters>,
}

/// In-process account. Clones share the same state, so a clone handed out by
/// `connect` observes everything the test set up through the original.
///
/// Ids are deterministic (`snap-00000001`, ...) and every created snapshot is
/// stamped with the internal clock, which then advances by one second.
#[derive(Clone)]
pub struct MemoryCloud {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCloud {
    pub fn new() -> Self {
        Self::with_state(AccountState::new("000000000000"))
    }

    pub fn with_state(state: AccountState) -> Self {
        let clock = Utc
            .timestamp_opt(1_704_067_200, 0)
            .single()
            .unwrap_or_default();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                clock,
                next_id: 1,
                created_status: SnapshotStatus::Completed,
                faults: Vec::new(),
                calls: HashMap::new(),
                last_filters: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn add_volume(&self, volume: Volume) {
        self.lock().state.volumes.push(volume);
    }

    pub fn add_snapshot(&self, snapshot: Snapshot) {
        self.lock().state.snapshots.push(snapshot);
    }

    pub fn grant_role<A: Into<String>, R: Into<String>>(&self, account: A, role: R) {
        self.lock().state.roles.push(RoleGrant::new(account, role));
    }

    pub fn set_regions(&self, regions: &[&str]) {
        self.lock().state.regions = regions.iter().map(|r| r.to_string()).collect();
    }

    pub fn set_clock(&self, now: DateTime<Utc>) {
        self.lock().clock = now;
    }

    /// Status given to snapshots created from now on (default `completed`).
    pub fn set_created_status(&self, status: SnapshotStatus) {
        self.lock().created_status = status;
    }

    /// Make the next `times` calls of `op` fail with `error`. With a target,
    /// only calls addressing that resource id (or region / role ARN) fail.
    pub fn fail(&self, op: Op, target: Option<&str>, error: ProviderError, times: usize) {
        self.lock().faults.push(Fault {
            op,
            target: target.map(|s| s.to_string()),
            error,
            remaining: times,
        });
    }

    pub fn state(&self) -> AccountState {
        self.lock().state.clone()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.lock().state.snapshots.clone()
    }

    pub fn snapshot_ids(&self) -> Vec<String> {
        self.lock().state.snapshots.iter().map(|s| s.id.clone()).collect()
    }

    pub fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Filters passed to the most recent `list_volumes` call.
    pub fn last_volume_filters(&self) -> Option<ProviderFilters> {
        self.lock().last_filters.clone()
    }
}

impl Inner {
    fn enter(&mut self, op: Op, target: Option<&str>) -> ProviderResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        let hit = self.faults.iter().position(|f| {
            f.op == op
                && f.remaining > 0
                && (f.target.is_none() || f.target.as_deref() == target)
        });
        if let Some(pos) = hit {
            let fault = &mut self.faults[pos];
            fault.remaining -= 1;
            let err = fault.error.clone();
            if fault.remaining == 0 {
                self.faults.remove(pos);
            }
            return Err(err);
        }
        Ok(())
    }
}

impl Ec2 for MemoryCloud {
    fn list_volumes(&self, filters: Option<&ProviderFilters>) -> ProviderResult<Vec<Volume>> {
        let mut g = self.lock();
        g.enter(Op::ListVolumes, None)?;
        g.last_filters = filters.cloned();
        Ok(g.state.volumes_matching(filters))
    }

    fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>> {
        let mut g = self.lock();
        g.enter(Op::ListSnapshots, None)?;
        Ok(g.state.snapshots.clone())
    }

    fn create_snapshot(&self, volume_id: &str, description: &str) -> ProviderResult<Snapshot> {
        let mut g = self.lock();
        g.enter(Op::CreateSnapshot, Some(volume_id))?;
        let id = format!("snap-{:08x}", g.next_id);
        let now = g.clock;
        let status = g.created_status.clone();
        let snap = g.state.insert_snapshot(id, volume_id, description, now, status)?;
        g.next_id += 1;
        g.clock = now + Duration::seconds(1);
        Ok(snap)
    }

    fn tag_resource(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()> {
        let mut g = self.lock();
        g.enter(Op::TagResource, Some(resource_id))?;
        g.state.tag(resource_id, tags)
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> ProviderResult<()> {
        let mut g = self.lock();
        g.enter(Op::DeleteSnapshot, Some(snapshot_id))?;
        g.state.remove_snapshot(snapshot_id).map(|_| ())
    }
}

impl Connector for MemoryCloud {
    type Handle = MemoryCloud;

    fn connect(&self, region: &str, _credentials: &Credentials) -> ProviderResult<Option<MemoryCloud>> {
        let mut g = self.lock();
        g.enter(Op::Connect, Some(region))?;
        if !g.state.accepts_region(region) {
            return Ok(None);
        }
        Ok(Some(self.clone()))
    }

    fn assume_role(
        &self,
        _credentials: &Credentials,
        role_arn: &str,
        session_name: &str,
    ) -> ProviderResult<Credentials> {
        let mut g = self.lock();
        g.enter(Op::AssumeRole, Some(role_arn))?;
        if !g.state.grants(role_arn) {
            return Err(ProviderError::access_denied(format!(
                "User is not authorized to perform: sts:AssumeRole on resource: {role_arn}"
            )));
        }
        let n = g.next_id;
        g.next_id += 1;
        Ok(Credentials::new(format!("ASIAMEMORY{n:010}"), "memory-secret")
            .with_session_token(format!("{session_name}-{n}")))
    }
}
