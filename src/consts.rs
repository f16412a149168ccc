//! Общие константы: маркер управляемых снапшотов, зарезервированные теги, дефолты.

// -------- Managed snapshots --------
/// Description prefix that marks a snapshot as created (and owned) by this tool.
pub const SNAPSHOT_PREFIX: &str = "BACKUP_MONKEY";

/// Tag keys in the provider namespace are system-managed and never copied.
pub const RESERVED_TAG_PREFIX: &str = "aws:";

/// Server-side filter names for resource tags are `tag:<key>`.
pub const PROVIDER_TAG_FILTER_PREFIX: &str = "tag:";

// -------- Audit log --------
pub const APP_NAME: &str = "BACKUP_MONKEY";
pub const DEFAULT_AUDIT_LOG: &str = "/var/log/backup_monkey.log";
pub const AUDIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// -------- Connection --------
pub const DEFAULT_REGION: &str = "us-east-1";
pub const ROLE_SESSION_NAME: &str = "AssumeRoleSession";
pub const DEFAULT_PROFILE: &str = "default";

/// Regions a local account backend accepts when its state does not list any.
pub const KNOWN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "sa-east-1",
];

// -------- Retention / retry --------
pub const DEFAULT_MAX_SNAPSHOTS: usize = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Provider error codes worth another attempt after a pause.
pub const TRANSIENT_ERROR_CODES: &[&str] = &[
    "RequestLimitExceeded",
    "Throttling",
    "ThrottlingException",
    "ServiceUnavailable",
    "Unavailable",
    "InternalError",
];
