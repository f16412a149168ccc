//! backup-monkey: tag-driven volume snapshots with per-volume retention.
//!
//! Поток данных:
//!   ConnectionResolver -> account handle (`cloud::Ec2`)
//!   -> BackupMonkey::volumes_to_snapshot (TagFilter) -> create + tag snapshot
//!   -> BackupMonkey::enforce_retention (RetentionPlan) -> delete excess.

// Базовые модули
pub mod consts;
pub mod util;
pub mod model;
pub mod status;
pub mod error;
pub mod config;
pub mod metrics;
pub mod logging;

// Структурированный audit-журнал (явная зависимость, не глобальный singleton)
pub mod audit;

// Граница с провайдером: traits, in-memory / file backends, retry
pub mod cloud;

// Ядро: фильтр тегов, именование, retention, подключение, оркестрация
pub mod filter;
pub mod namer;
pub mod retention;
pub mod connection;
pub mod monkey;

// Удобные реэкспорты
pub use audit::{AuditEvent, AuditSink, FileAuditSink, MemoryAuditSink, NullAuditSink};
pub use cloud::{Connector, Credentials, Ec2, FileCloud, MemoryCloud, ProviderError, Retrying};
pub use config::{FailurePolicy, MonkeyBuilder, MonkeyConfig};
pub use connection::{ConnectMode, Connection, ConnectionResolver};
pub use error::{ErrorKind, MonkeyError, Result};
pub use filter::{TagFilter, TagValue};
pub use model::{Snapshot, SnapshotStatus, Tags, Volume};
pub use monkey::{BackupMonkey, CreatedSnapshot, RunReport};
pub use retention::RetentionPlan;
