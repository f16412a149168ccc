//! Account model shared by the local backends (`MemoryCloud`, `FileCloud`).
//!
//! Формат файла состояния (JSON):
//! {
//!   "account_id": "111111111111",
//!   "regions": ["us-east-1"],            // пусто => KNOWN_REGIONS
//!   "roles": [{"account":"222222222222","role":"backup"}],
//!   "volumes": [{"id":"vol-1","instance_id":"i-1","device":"/dev/sda1","tags":{"env":"prod"}}],
//!   "snapshots": [{"id":"snap-1","volume_id":"vol-1","description":"...",
//!                  "start_time":"2024-01-01T00:00:00Z","status":"completed","tags":{}}]
//! }

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProviderError, ProviderFilters, ProviderResult};
use crate::connection::role_arn;
use crate::consts::KNOWN_REGIONS;
use crate::model::{Snapshot, SnapshotStatus, Tags, Volume};

/// A role in some account that callers of this account may assume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub account: String,
    pub role: String,
}

impl RoleGrant {
    pub fn new<A: Into<String>, R: Into<String>>(account: A, role: R) -> Self {
        Self {
            account: account.into(),
            role: role.into(),
        }
    }

    pub fn arn(&self) -> String {
        role_arn(&self.account, &self.role)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

impl AccountState {
    pub fn new<S: Into<String>>(account_id: S) -> Self {
        Self {
            account_id: account_id.into(),
            ..Self::default()
        }
    }

    pub fn accepts_region(&self, region: &str) -> bool {
        if self.regions.is_empty() {
            KNOWN_REGIONS.contains(&region)
        } else {
            self.regions.iter().any(|r| r == region)
        }
    }

    pub fn grants(&self, arn: &str) -> bool {
        self.roles.iter().any(|g| g.arn() == arn)
    }

    pub fn volumes_matching(&self, filters: Option<&ProviderFilters>) -> Vec<Volume> {
        match filters {
            Some(f) if !f.is_empty() => self
                .volumes
                .iter()
                .filter(|v| f.matches(v))
                .cloned()
                .collect(),
            _ => self.volumes.clone(),
        }
    }

    pub fn insert_snapshot(
        &mut self,
        id: String,
        volume_id: &str,
        description: &str,
        start_time: DateTime<Utc>,
        status: SnapshotStatus,
    ) -> ProviderResult<Snapshot> {
        if !self.volumes.iter().any(|v| v.id == volume_id) {
            return Err(ProviderError::not_found("InvalidVolume.NotFound", volume_id));
        }
        let snap = Snapshot {
            id,
            volume_id: volume_id.to_string(),
            description: description.to_string(),
            start_time,
            status,
            tags: Tags::new(),
        };
        self.snapshots.push(snap.clone());
        Ok(snap)
    }

    /// Merge tags into a snapshot or volume (existing keys are overwritten).
    pub fn tag(&mut self, resource_id: &str, tags: &Tags) -> ProviderResult<()> {
        if let Some(s) = self.snapshots.iter_mut().find(|s| s.id == resource_id) {
            s.tags.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
            return Ok(());
        }
        if let Some(v) = self.volumes.iter_mut().find(|v| v.id == resource_id) {
            v.tags.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
            return Ok(());
        }
        Err(ProviderError::not_found("InvalidID", resource_id))
    }

    pub fn remove_snapshot(&mut self, snapshot_id: &str) -> ProviderResult<Snapshot> {
        match self.snapshots.iter().position(|s| s.id == snapshot_id) {
            Some(pos) => Ok(self.snapshots.remove(pos)),
            None => Err(ProviderError::not_found(
                "InvalidSnapshot.NotFound",
                snapshot_id,
            )),
        }
    }
}
