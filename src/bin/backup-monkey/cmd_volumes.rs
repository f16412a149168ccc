use anyhow::Result;
use std::sync::Arc;

use backup_monkey::audit::AuditSink;
use backup_monkey::config::MonkeyConfig;
use backup_monkey::namer::describe;

use super::util::connect;

pub fn exec(cfg: &MonkeyConfig, audit: Arc<dyn AuditSink>, json: bool) -> Result<()> {
    let monkey = connect(cfg, audit)?;
    let volumes = monkey.volumes_to_snapshot()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&volumes)?);
        return Ok(());
    }
    if volumes.is_empty() {
        println!("(no volumes selected)");
        return Ok(());
    }
    for v in &volumes {
        println!("{}  tags=[{}]", describe(v), v.tags_line());
    }
    println!("{} volume(s)", volumes.len());
    Ok(())
}
