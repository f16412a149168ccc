use anyhow::{Context, Result};
use chrono::Local;
use log::warn;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{AuditEvent, AuditSink};
use crate::consts::AUDIT_TIME_FORMAT;

/// Append-only audit file: `YYYY-MM-DD HH:MM:SS <record>` per line.
///
/// Writes go through a mutex, so records from concurrent emitters never
/// interleave inside a line.
pub struct FileAuditSink {
    path: PathBuf,
    app: String,
    file: Mutex<File>,
}

impl FileAuditSink {
    pub fn open<P: AsRef<Path>, S: Into<String>>(path: P, app: S) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open audit log {}", path.display()))?;
        Ok(Self {
            path,
            app: app.into(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn write(&self, event: &AuditEvent) {
        let line = format!(
            "{} {}\n",
            Local::now().format(AUDIT_TIME_FORMAT),
            event.to_line(&self.app)
        );
        let mut f = match self.file.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        // аудит не должен ронять прогон: ошибку записи только логируем
        if let Err(e) = f.write_all(line.as_bytes()).and_then(|_| f.flush()) {
            warn!("audit: write to {} failed: {}", self.path.display(), e);
        }
    }
}
