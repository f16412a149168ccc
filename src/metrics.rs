//! Lightweight global metrics for backup-monkey.
//!
//! Потокобезопасные атомарные счётчики прогона:
//! - выбор томов
//! - создание / удаление снапшотов
//! - пропущенные при retention снапшоты (не наши или не completed)
//! - повторы транзиентных ошибок провайдера
//! - ошибки (каждая сообщённая)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static VOLUMES_SELECTED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_CREATED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_DELETED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_SKIPPED: AtomicU64 = AtomicU64::new(0);
static PROVIDER_RETRIES: AtomicU64 = AtomicU64::new(0);
static FAILURES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub volumes_selected: u64,
    pub snapshots_created: u64,
    pub snapshots_deleted: u64,
    pub snapshots_skipped: u64,
    pub provider_retries: u64,
    pub failures: u64,
}

// ----- Recorders -----
pub fn record_volumes_selected(n: usize) {
    VOLUMES_SELECTED.fetch_add(n as u64, Ordering::Relaxed);
}

pub fn record_snapshot_created() {
    SNAPSHOTS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_snapshot_deleted() {
    SNAPSHOTS_DELETED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_snapshots_skipped(n: usize) {
    SNAPSHOTS_SKIPPED.fetch_add(n as u64, Ordering::Relaxed);
}

pub fn record_retry() {
    PROVIDER_RETRIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_failure() {
    FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        volumes_selected: VOLUMES_SELECTED.load(Ordering::Relaxed),
        snapshots_created: SNAPSHOTS_CREATED.load(Ordering::Relaxed),
        snapshots_deleted: SNAPSHOTS_DELETED.load(Ordering::Relaxed),
        snapshots_skipped: SNAPSHOTS_SKIPPED.load(Ordering::Relaxed),
        provider_retries: PROVIDER_RETRIES.load(Ordering::Relaxed),
        failures: FAILURES.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    VOLUMES_SELECTED.store(0, Ordering::Relaxed);
    SNAPSHOTS_CREATED.store(0, Ordering::Relaxed);
    SNAPSHOTS_DELETED.store(0, Ordering::Relaxed);
    SNAPSHOTS_SKIPPED.store(0, Ordering::Relaxed);
    PROVIDER_RETRIES.store(0, Ordering::Relaxed);
    FAILURES.store(0, Ordering::Relaxed);
}
