//! Console logging.
//!
//! Уровень берём из RUST_LOG, иначе из `-v`:
//!   0   -> info, короткий формат
//!   1   -> info, подробный формат (module(line))
//!   2+  -> debug, подробный формат
//! Backend (`backup_monkey::cloud`) молчит до ERROR, пока не -vvv (info) / -vvvv (debug).
//!
//! WARN и ниже идут в stdout, ERROR в stderr.

use anyhow::{anyhow, Result};
use chrono::Local;
use env_logger::{Builder, Env, Logger, Target};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BACKEND_TARGET: &str = "backup_monkey::cloud";

/// Default filter directives for a verbosity count.
pub fn filter_spec(verbosity: u8) -> String {
    let level = if verbosity >= 2 { "debug" } else { "info" };
    let backend = match verbosity {
        0..=2 => "error",
        3 => "info",
        _ => "debug",
    };
    format!("{level},{BACKEND_TARGET}={backend}")
}

pub fn detailed(verbosity: u8) -> bool {
    verbosity >= 1
}

fn builder(verbosity: u8, target: Target) -> Builder {
    let mut b = Builder::from_env(Env::default().default_filter_or(filter_spec(verbosity)));
    b.target(target);
    if detailed(verbosity) {
        b.format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] [{}({})] {}",
                Local::now().format(TIME_FORMAT),
                record.level(),
                record.module_path().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        });
    } else {
        b.format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format(TIME_FORMAT),
                record.level(),
                record.args()
            )
        });
    }
    b
}

/// Two env_logger instances sharing one filter, routed by level.
struct SplitLogger {
    out: Logger,
    err: Logger,
}

impl SplitLogger {
    fn pick(&self, level: Level) -> &Logger {
        if level == Level::Error {
            &self.err
        } else {
            &self.out
        }
    }
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.pick(metadata.level()).enabled(metadata)
    }

    fn log(&self, record: &Record) {
        let logger = self.pick(record.level());
        if logger.matches(record) {
            logger.log(record);
        }
    }

    fn flush(&self) {
        self.out.flush();
        self.err.flush();
    }
}

/// Install the console logger. Fails if a logger is already installed.
pub fn init(verbosity: u8) -> Result<()> {
    let out = builder(verbosity, Target::Stdout).build();
    let err = builder(verbosity, Target::Stderr).build();
    let max: LevelFilter = out.filter().max(err.filter());
    log::set_boxed_logger(Box::new(SplitLogger { out, err }))
        .map_err(|e| anyhow!("install logger: {}", e))?;
    log::set_max_level(max);
    Ok(())
}
