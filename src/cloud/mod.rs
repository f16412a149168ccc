//! cloud — граница с провайдером (account handle, подключение, STS).
//!
//! Состав:
//! - `Ec2`: операции над томами/снапшотами одного account/region контекста.
//! - `Connector`: подключение к региону и обмен credentials через assume-role.
//! - `MemoryCloud`: аккаунт в памяти процесса (тесты, fault injection).
//! - `FileCloud`: тот же аккаунт в JSON-файле состояния (fs2 lock + tmp/rename).
//! - `Retrying`: обёртка с повторами транзиентных ошибок и backoff.
//!
//! Wire adapters for the real provider API plug in behind these two traits.

mod file;
mod memory;
mod retry;
mod state;

pub use file::FileCloud;
pub use memory::{MemoryCloud, Op};
pub use retry::{RetryPolicy, Retrying};
pub use state::{AccountState, RoleGrant};

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

use crate::consts::{PROVIDER_TAG_FILTER_PREFIX, TRANSIENT_ERROR_CODES};
use crate::model::{Snapshot, Tags, Volume};

/// Error returned by a provider call: error code plus human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: &str, id: &str) -> Self {
        Self::new(code, format!("The {} '{}' does not exist.", resource_noun(code), id))
    }

    pub fn access_denied<M: Into<String>>(message: M) -> Self {
        Self::new("AccessDenied", message)
    }

    /// Throttling / availability errors that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        TRANSIENT_ERROR_CODES.contains(&self.code.as_str())
    }
}

fn resource_noun(code: &str) -> &'static str {
    if code.starts_with("InvalidSnapshot") {
        "snapshot"
    } else if code.starts_with("InvalidVolume") {
        "volume"
    } else {
        "resource"
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Access key, secret and (for temporary credentials) session token.
/// Secret material is wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    secret_key: String,
    session_token: Option<String>,
}

impl Credentials {
    pub fn new<A: Into<String>, S: Into<String>>(access_key: A, secret_key: S) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token<T: Into<String>>(mut self, token: T) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Temporary (assumed-role) credentials carry a session token.
    pub fn is_temporary(&self) -> bool {
        self.session_token.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.secret_key.zeroize();
        if let Some(t) = self.session_token.as_mut() {
            t.zeroize();
        }
    }
}

/// Server-side volume filters: filter name -> accepted values.
///
/// Names are `tag:<key>`. A volume matches when every filter accepts it;
/// unknown names never match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderFilters {
    filters: BTreeMap<String, Vec<String>>,
}

impl ProviderFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<N: Into<String>>(&mut self, name: N, values: Vec<String>) {
        self.filters.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.filters.get(name).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Provider-side match semantics, for backends that evaluate filters locally.
    pub fn matches(&self, volume: &Volume) -> bool {
        self.filters.iter().all(|(name, accepted)| {
            if let Some(key) = name.strip_prefix(PROVIDER_TAG_FILTER_PREFIX) {
                volume
                    .tags
                    .get(key)
                    .map_or(false, |v| accepted.iter().any(|a| a == v))
            } else {
                false
            }
        })
    }
}

/// Operations against one established account/region context.
pub trait Ec2 {
    fn list_volumes(&self, filters: Option<&ProviderFilters>) -> ProviderResult<Vec<Volume>>;

    /// Snapshots owned by the account itself.
    fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>>;

    fn create_snapshot(&self, volume_id: &str, description: &str) -> ProviderResult<Snapshot>;

    fn tag_resource(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()>;

    fn delete_snapshot(&self, snapshot_id: &str) -> ProviderResult<()>;
}

impl<T: Ec2 + ?Sized> Ec2 for &T {
    fn list_volumes(&self, filters: Option<&ProviderFilters>) -> ProviderResult<Vec<Volume>> {
        (**self).list_volumes(filters)
    }
    fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>> {
        (**self).list_snapshots()
    }
    fn create_snapshot(&self, volume_id: &str, description: &str) -> ProviderResult<Snapshot> {
        (**self).create_snapshot(volume_id, description)
    }
    fn tag_resource(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()> {
        (**self).tag_resource(resource_id, tags)
    }
    fn delete_snapshot(&self, snapshot_id: &str) -> ProviderResult<()> {
        (**self).delete_snapshot(snapshot_id)
    }
}

/// Establishes account handles.
pub trait Connector {
    type Handle: Ec2;

    /// Connect to `region`. `Ok(None)` means the region does not resolve to
    /// a live endpoint.
    fn connect(&self, region: &str, credentials: &Credentials) -> ProviderResult<Option<Self::Handle>>;

    /// Exchange the caller's credentials for temporary credentials of `role_arn`.
    fn assume_role(
        &self,
        credentials: &Credentials,
        role_arn: &str,
        session_name: &str,
    ) -> ProviderResult<Credentials>;
}
