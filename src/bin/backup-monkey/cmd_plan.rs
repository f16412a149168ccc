use anyhow::Result;
use std::sync::Arc;

use backup_monkey::audit::AuditSink;
use backup_monkey::config::MonkeyConfig;

use super::util::connect;

/// Retention dry run: nothing is deleted.
pub fn exec(cfg: &MonkeyConfig, audit: Arc<dyn AuditSink>, json: bool) -> Result<()> {
    let monkey = connect(cfg, audit)?;
    let plan = monkey.plan_retention()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("keep per volume: {}", plan.keep_per_volume);
    for v in &plan.volumes {
        println!("{}: keep {}, delete {}", v.volume_id, v.keep.len(), v.delete.len());
        for s in &v.keep {
            println!("  keep   {}  {}", s.id, s.start_time.format("%Y-%m-%d %H:%M:%S"));
        }
        for s in &v.delete {
            println!("  delete {}  {}", s.id, s.start_time.format("%Y-%m-%d %H:%M:%S"));
        }
    }
    if !plan.skipped.is_empty() {
        println!("skipped: {}", plan.skipped.len());
    }
    println!(
        "total: keep {}, delete {}",
        plan.kept_count(),
        plan.deletion_count()
    );
    Ok(())
}
