//! Account context resolution: direct connection with ambient credentials,
//! or cross-account via role assumption.
//!
//! Ambient credentials (по порядку):
//!   1. AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY (+ AWS_SESSION_TOKEN)
//!   2. shared credentials file: AWS_SHARED_CREDENTIALS_FILE или ~/.aws/credentials,
//!      профиль AWS_PROFILE (по умолчанию "default")

use log::{debug, error, info};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditSink, Category};
use crate::cloud::{Connector, Credentials};
use crate::consts::{DEFAULT_PROFILE, ROLE_SESSION_NAME};
use crate::error::{MonkeyError, Result};
use crate::status::Status;
use crate::util::env_string;

/// IAM role ARN for `role` in `account`.
pub fn role_arn(account: &str, role: &str) -> String {
    format!("arn:aws:iam::{account}:role/{role}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectMode {
    Direct,
    CrossAccount { account: String, role: String },
}

impl ConnectMode {
    /// Cross-account only when both the account number and the role are given.
    pub fn from_parts(account: Option<&str>, role: Option<&str>) -> Self {
        match (account, role) {
            (Some(a), Some(r)) if !a.is_empty() && !r.is_empty() => ConnectMode::CrossAccount {
                account: a.to_string(),
                role: r.to_string(),
            },
            _ => ConnectMode::Direct,
        }
    }
}

impl fmt::Display for ConnectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectMode::Direct => f.write_str("direct"),
            ConnectMode::CrossAccount { account, role } => {
                write!(f, "cross-account({})", role_arn(account, role))
            }
        }
    }
}

// ---------------- credential discovery ----------------

pub fn credentials_from_env() -> Option<Credentials> {
    let access = env_string("AWS_ACCESS_KEY_ID")?;
    let secret = env_string("AWS_SECRET_ACCESS_KEY")?;
    let creds = Credentials::new(access, secret);
    Some(match env_string("AWS_SESSION_TOKEN") {
        Some(token) => creds.with_session_token(token),
        None => creds,
    })
}

pub fn shared_credentials_path() -> Option<PathBuf> {
    if let Some(p) = env_string("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(p));
    }
    env_string("HOME").map(|home| Path::new(&home).join(".aws").join("credentials"))
}

/// Credentials of `profile` from an INI-style credentials file.
pub fn credentials_from_file(path: &Path, profile: &str) -> Option<Credentials> {
    let text = fs::read_to_string(path).ok()?;
    parse_shared_credentials(&text, profile)
}

pub fn parse_shared_credentials(text: &str, profile: &str) -> Option<Credentials> {
    let mut in_profile = false;
    let mut access = None;
    let mut secret = None;
    let mut token = None;
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = section.trim();
            let name = name.strip_prefix("profile ").unwrap_or(name).trim();
            in_profile = name == profile;
            continue;
        }
        if !in_profile {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().to_string();
            match k.trim() {
                "aws_access_key_id" => access = Some(v),
                "aws_secret_access_key" => secret = Some(v),
                "aws_session_token" => token = Some(v),
                _ => {}
            }
        }
    }
    let creds = Credentials::new(access?, secret?);
    Some(match token {
        Some(t) if !t.is_empty() => creds.with_session_token(t),
        _ => creds,
    })
}

/// Environment first, then the shared credentials file.
pub fn discover_credentials() -> Option<Credentials> {
    if let Some(c) = credentials_from_env() {
        debug!("credentials: using environment");
        return Some(c);
    }
    let path = shared_credentials_path()?;
    let profile = env_string("AWS_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let found = credentials_from_file(&path, &profile);
    if found.is_some() {
        debug!("credentials: using profile `{}` from {}", profile, path.display());
    }
    found
}

// ---------------- resolver ----------------

/// Established account context.
pub struct Connection<H> {
    pub handle: H,
    pub region: String,
    pub mode: ConnectMode,
}

pub struct ConnectionResolver<C> {
    connector: C,
    audit: Arc<dyn AuditSink>,
    credentials: Option<Credentials>,
}

impl<C: Connector> ConnectionResolver<C> {
    /// Resolver using ambient credentials.
    pub fn new(connector: C, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            connector,
            audit,
            credentials: discover_credentials(),
        }
    }

    /// Override the ambient credentials (`None` = nothing discoverable).
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn resolve(&self, region: &str, mode: &ConnectMode) -> Result<Connection<C::Handle>> {
        let handle = match mode {
            ConnectMode::Direct => self.direct(region)?,
            ConnectMode::CrossAccount { account, role } => self.cross_account(region, account, role)?,
        };
        Ok(Connection {
            handle,
            region: region.to_string(),
            mode: mode.clone(),
        })
    }

    fn emit(&self, event: AuditEvent) {
        info!("{}", event.subject);
        self.audit.write(&event);
    }

    fn fail(&self, err: MonkeyError) -> MonkeyError {
        err.report(self.audit.as_ref())
    }

    fn direct(&self, region: &str) -> Result<C::Handle> {
        self.emit(
            AuditEvent::new(Status::RegionConnect { region })
                .region(region)
                .category(Category::Connection),
        );
        let creds = match self.credentials.as_ref() {
            Some(c) => c,
            None => {
                error!(
                    "No AWS credentials found. Set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY or configure ~/.aws/credentials"
                );
                return Err(self.fail(MonkeyError::region_connect(
                    region,
                    "unable to locate credentials",
                )));
            }
        };
        match self.connector.connect(region, creds) {
            Ok(Some(h)) => Ok(h),
            Ok(None) => Err(self.fail(MonkeyError::invalid_region(region))),
            Err(e) => Err(self.fail(MonkeyError::region_connect(region, e.to_string()))),
        }
    }

    fn cross_account(&self, region: &str, account: &str, role: &str) -> Result<C::Handle> {
        self.emit(
            AuditEvent::new(Status::CrossAccountConnect { account, role, region })
                .account(account)
                .role(role)
                .region(region)
                .category(Category::Connection),
        );
        let creds = self.credentials.as_ref().ok_or_else(|| {
            self.fail(MonkeyError::cross_account(
                account,
                role,
                region,
                "unable to locate credentials for sts:AssumeRole",
            ))
        })?;
        let arn = role_arn(account, role);
        let temporary = self
            .connector
            .assume_role(creds, &arn, ROLE_SESSION_NAME)
            .map_err(|e| self.fail(MonkeyError::cross_account(account, role, region, e.to_string())))?;
        debug!("assumed {} as {}", arn, temporary.access_key);
        match self.connector.connect(region, &temporary) {
            Ok(Some(h)) => Ok(h),
            Ok(None) => Err(self.fail(MonkeyError::invalid_region(region))),
            Err(e) => Err(self.fail(MonkeyError::cross_account(account, role, region, e.to_string()))),
        }
    }
}
