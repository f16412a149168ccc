use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use std::sync::Arc;

use backup_monkey::audit::{AuditSink, FileAuditSink};
use backup_monkey::cloud::{FileCloud, Retrying};
use backup_monkey::config::{FailurePolicy, MonkeyConfig};
use backup_monkey::connection::ConnectionResolver;
use backup_monkey::metrics::MetricsSnapshot;
use backup_monkey::monkey::BackupMonkey;

use super::cli::Cli;

pub type Monkey = BackupMonkey<Retrying<FileCloud>>;

/// Env first, then CLI overrides. Not validated yet, see [`validate`].
pub fn config_from(cli: &Cli) -> MonkeyConfig {
    let mut cfg = MonkeyConfig::from_env();
    if let Some(r) = &cli.region {
        cfg = cfg.with_region(r.clone());
    }
    if let Some(n) = cli.max_snapshots_per_volume {
        cfg = cfg.with_max_snapshots_per_volume(n);
    }
    if !cli.tags.is_empty() {
        cfg = cfg.with_tags(cli.tags.iter().cloned());
    }
    if cli.reverse_tags {
        cfg = cfg.with_reverse_tags(true);
    }
    if cli.cross_account_number.is_some() {
        cfg.cross_account_number = cli.cross_account_number.clone();
    }
    if cli.cross_account_role.is_some() {
        cfg.cross_account_role = cli.cross_account_role.clone();
    }
    if let Some(p) = &cli.log_path {
        cfg = cfg.with_audit_log_path(p.clone());
    }
    if cli.state.is_some() {
        cfg = cfg.with_state_path(cli.state.clone());
    }
    if let Some(n) = cli.max_retries {
        cfg.max_retries = n;
    }
    if cli.continue_on_error {
        cfg = cfg.with_failure_policy(FailurePolicy::Continue);
    }
    cfg
}

/// Validation failures go to the audit log like any other error.
pub fn validate(cfg: &MonkeyConfig, audit: &dyn AuditSink) -> Result<()> {
    cfg.validate().map_err(|e| e.report_in(audit, &cfg.region))?;
    debug!("{}", cfg);
    Ok(())
}

pub fn open_audit(cfg: &MonkeyConfig) -> Result<Arc<dyn AuditSink>> {
    let sink = FileAuditSink::open(&cfg.audit_log_path, cfg.app.clone())
        .with_context(|| format!("open audit log {}", cfg.audit_log_path.display()))?;
    Ok(Arc::new(sink))
}

/// Resolve the account context and wrap it for the run.
pub fn connect(cfg: &MonkeyConfig, audit: Arc<dyn AuditSink>) -> Result<Monkey> {
    let state = cfg.state_path.as_ref().ok_or_else(|| {
        anyhow!("no account backend configured: pass --state <file> or set BACKUP_MONKEY_STATE")
    })?;
    let backend = FileCloud::open(state)?;
    let resolver = ConnectionResolver::new(backend, audit.clone());
    let conn = resolver.resolve(&cfg.region, &cfg.connect_mode())?;
    info!("connected to {} ({})", conn.region, conn.mode);
    let ec2 = Retrying::new(conn.handle, cfg.retry_policy(), audit.clone(), conn.region);
    Ok(BackupMonkey::new(ec2, cfg, audit))
}

pub fn print_metrics(m: &MetricsSnapshot) {
    println!("Summary:");
    println!("  volumes selected:   {}", m.volumes_selected);
    println!("  snapshots created:  {}", m.snapshots_created);
    println!("  snapshots deleted:  {}", m.snapshots_deleted);
    println!("  snapshots skipped:  {}", m.snapshots_skipped);
    println!("  provider retries:   {}", m.provider_retries);
    println!("  failures:           {}", m.failures);
}
