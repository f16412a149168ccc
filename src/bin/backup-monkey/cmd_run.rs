use anyhow::Result;
use std::sync::Arc;

use backup_monkey::audit::AuditSink;
use backup_monkey::config::MonkeyConfig;
use backup_monkey::metrics;
use backup_monkey::monkey::RunReport;

use super::util::{connect, print_metrics};

pub fn exec(
    cfg: &MonkeyConfig,
    audit: Arc<dyn AuditSink>,
    snapshot_only: bool,
    remove_only: bool,
    json: bool,
) -> Result<()> {
    let monkey = connect(cfg, audit)?;

    let mut report = RunReport::default();
    if !remove_only {
        report.merge(monkey.snapshot_volumes()?);
    }
    if !snapshot_only {
        report.merge(monkey.remove_old_snapshots()?);
    }

    let m = metrics::snapshot();
    if json {
        let out = serde_json::json!({
            "region": monkey.region(),
            "report": report,
            "metrics": m,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for c in &report.created {
            println!("created {} from {} ({})", c.snapshot_id, c.volume_id, c.description);
        }
        for id in &report.deleted {
            println!("deleted {}", id);
        }
        print_metrics(&m);
    }
    Ok(())
}
