//! Centralized configuration and builder for backup-monkey.
//!
//! Goals:
//! - Single place to collect run parameters instead of scattering env lookups.
//! - MonkeyConfig::from_env() reads BACKUP_MONKEY_* (and AWS_DEFAULT_REGION).
//! - CLI flags override through the fluent `with_*` setters / MonkeyBuilder.
//!
//! ENV:
//! - BACKUP_MONKEY_REGION (fallback AWS_DEFAULT_REGION, default us-east-1)
//! - BACKUP_MONKEY_MAX_SNAPSHOTS (default 3)
//! - BACKUP_MONKEY_TAGS — whitespace-separated `key:value` entries
//! - BACKUP_MONKEY_REVERSE_TAGS = 0|1
//! - BACKUP_MONKEY_CROSS_ACCOUNT_NUMBER / BACKUP_MONKEY_CROSS_ACCOUNT_ROLE
//! - BACKUP_MONKEY_LOG_PATH (default /var/log/backup_monkey.log)
//! - BACKUP_MONKEY_APP (default BACKUP_MONKEY)
//! - BACKUP_MONKEY_CONTINUE_ON_ERROR = 0|1 (default 0: abort on first failure)
//! - BACKUP_MONKEY_MAX_RETRIES (default 0: retries disabled)
//! - BACKUP_MONKEY_RETRY_DELAY_MS (default 1000)
//! - BACKUP_MONKEY_STATE — account state file for the file backend

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cloud::RetryPolicy;
use crate::connection::ConnectMode;
use crate::consts::{
    APP_NAME, DEFAULT_AUDIT_LOG, DEFAULT_MAX_SNAPSHOTS, DEFAULT_REGION, DEFAULT_RETRY_DELAY_MS,
};
use crate::error::{MonkeyError, Result};
use crate::util::{env_flag, env_parse, env_string};

/// What a batch does when one volume/snapshot operation fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure (the baseline behavior).
    #[default]
    Abort,
    /// Report the failure, finish the batch, then fail with all collected errors.
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Continue => f.write_str("continue"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonkeyConfig {
    /// Region to operate in.
    pub region: String,

    /// Managed, completed snapshots kept per volume.
    pub max_snapshots_per_volume: usize,

    /// `key:value` filter entries (values may be `[a,b]` lists).
    pub tags: Vec<String>,

    /// Treat `tags` as a blacklist instead of an inclusion filter.
    pub reverse_tags: bool,

    pub cross_account_number: Option<String>,
    pub cross_account_role: Option<String>,

    /// Audit log destination.
    pub audit_log_path: PathBuf,

    /// `app` field of audit records.
    pub app: String,

    pub failure_policy: FailurePolicy,

    /// Transient provider errors are retried this many times (0 disables).
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,

    /// JSON account state for the file backend.
    pub state_path: Option<PathBuf>,
}

impl Default for MonkeyConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            max_snapshots_per_volume: DEFAULT_MAX_SNAPSHOTS,
            tags: Vec::new(),
            reverse_tags: false,
            cross_account_number: None,
            cross_account_role: None,
            audit_log_path: PathBuf::from(DEFAULT_AUDIT_LOG),
            app: APP_NAME.to_string(),
            failure_policy: FailurePolicy::Abort,
            max_retries: 0,
            retry_base_delay_ms: DEFAULT_RETRY_DELAY_MS,
            state_path: None,
        }
    }
}

impl MonkeyConfig {
    /// Load configuration from environment variables; unset or unparsable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(r) = env_string("BACKUP_MONKEY_REGION").or_else(|| env_string("AWS_DEFAULT_REGION")) {
            cfg.region = r;
        }
        if let Some(n) = env_parse::<usize>("BACKUP_MONKEY_MAX_SNAPSHOTS") {
            cfg.max_snapshots_per_volume = n;
        }
        if let Some(t) = env_string("BACKUP_MONKEY_TAGS") {
            cfg.tags = t.split_whitespace().map(str::to_string).collect();
        }
        if let Some(b) = env_flag("BACKUP_MONKEY_REVERSE_TAGS") {
            cfg.reverse_tags = b;
        }
        cfg.cross_account_number = env_string("BACKUP_MONKEY_CROSS_ACCOUNT_NUMBER");
        cfg.cross_account_role = env_string("BACKUP_MONKEY_CROSS_ACCOUNT_ROLE");
        if let Some(p) = env_string("BACKUP_MONKEY_LOG_PATH") {
            cfg.audit_log_path = PathBuf::from(p);
        }
        if let Some(a) = env_string("BACKUP_MONKEY_APP") {
            cfg.app = a;
        }
        if let Some(true) = env_flag("BACKUP_MONKEY_CONTINUE_ON_ERROR") {
            cfg.failure_policy = FailurePolicy::Continue;
        }
        if let Some(n) = env_parse::<u32>("BACKUP_MONKEY_MAX_RETRIES") {
            cfg.max_retries = n;
        }
        if let Some(ms) = env_parse::<u64>("BACKUP_MONKEY_RETRY_DELAY_MS") {
            cfg.retry_base_delay_ms = ms;
        }
        cfg.state_path = env_string("BACKUP_MONKEY_STATE").map(PathBuf::from);

        cfg
    }

    /// Reject inconsistent parameters before anything is contacted.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(MonkeyError::config("region must not be empty"));
        }
        match (&self.cross_account_number, &self.cross_account_role) {
            (Some(_), None) => {
                return Err(MonkeyError::config(
                    "--cross-account-number requires --cross-account-role",
                ))
            }
            (None, Some(_)) => {
                return Err(MonkeyError::config(
                    "--cross-account-role requires --cross-account-number",
                ))
            }
            (Some(n), Some(_)) => {
                if n.len() != 12 || !n.chars().all(|c| c.is_ascii_digit()) {
                    return Err(MonkeyError::config(format!(
                        "cross account number must be 12 digits, got `{n}`"
                    )));
                }
            }
            (None, None) => {}
        }
        Ok(())
    }

    pub fn connect_mode(&self) -> ConnectMode {
        ConnectMode::from_parts(
            self.cross_account_number.as_deref(),
            self.cross_account_role.as_deref(),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_delay_ms))
    }

    // Fluent setters (builder-style) to override specific fields.

    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_max_snapshots_per_volume(mut self, n: usize) -> Self {
        self.max_snapshots_per_volume = n;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reverse_tags(mut self, on: bool) -> Self {
        self.reverse_tags = on;
        self
    }

    pub fn with_cross_account<A: Into<String>, R: Into<String>>(mut self, account: A, role: R) -> Self {
        self.cross_account_number = Some(account.into());
        self.cross_account_role = Some(role.into());
        self
    }

    pub fn with_audit_log_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.audit_log_path = path.into();
        self
    }

    pub fn with_app<S: Into<String>>(mut self, app: S) -> Self {
        self.app = app.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_state_path<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.state_path = path.map(Into::into);
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }
}

impl fmt::Display for MonkeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MonkeyConfig {{ \
             region: {}, \
             max_snapshots_per_volume: {}, \
             tags: [{}], \
             reverse_tags: {}, \
             connect: {}, \
             audit_log: {}, \
             app: {}, \
             failure_policy: {}, \
             retries: {}x{}ms, \
             state: {} \
             }}",
            self.region,
            self.max_snapshots_per_volume,
            self.tags.join(" "),
            self.reverse_tags,
            self.connect_mode(),
            self.audit_log_path.display(),
            self.app,
            self.failure_policy,
            self.max_retries,
            self.retry_base_delay_ms,
            self.state_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string()),
        )
    }
}

/// Lightweight builder that produces a MonkeyConfig.
#[derive(Clone, Debug)]
pub struct MonkeyBuilder {
    cfg: MonkeyConfig,
}

impl Default for MonkeyBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: MonkeyConfig::from_env(),
        }
    }
}

impl MonkeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: MonkeyConfig::default(),
        }
    }

    pub fn region<S: Into<String>>(mut self, region: S) -> Self {
        self.cfg.region = region.into();
        self
    }

    pub fn max_snapshots_per_volume(mut self, n: usize) -> Self {
        self.cfg.max_snapshots_per_volume = n;
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.cfg.tags = tags;
        self
    }

    pub fn reverse_tags(mut self, on: bool) -> Self {
        self.cfg.reverse_tags = on;
        self
    }

    pub fn cross_account_number<S: Into<String>>(mut self, n: Option<S>) -> Self {
        self.cfg.cross_account_number = n.map(Into::into);
        self
    }

    pub fn cross_account_role<S: Into<String>>(mut self, r: Option<S>) -> Self {
        self.cfg.cross_account_role = r.map(Into::into);
        self
    }

    pub fn audit_log_path<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.cfg.audit_log_path = p.into();
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.cfg.failure_policy = policy;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.cfg.max_retries = n;
        self
    }

    pub fn state_path<P: Into<PathBuf>>(mut self, p: Option<P>) -> Self {
        self.cfg.state_path = p.map(Into::into);
        self
    }

    /// Finish the builder, validating the result.
    pub fn build(self) -> Result<MonkeyConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}
