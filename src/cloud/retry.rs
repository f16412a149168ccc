use log::warn;
use std::sync::Arc;
use std::time::Duration;

use super::{Ec2, ProviderError, ProviderFilters, ProviderResult};
use crate::audit::{AuditEvent, AuditSink, EventType, Severity};
use crate::metrics;
use crate::model::{Snapshot, Tags, Volume};
use crate::status::Status;

/// Bounded retry with exponential backoff (`base * 2^attempt`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Pause before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Wraps an account handle and retries transient provider errors.
/// Non-transient errors pass through on the first occurrence.
pub struct Retrying<E> {
    inner: E,
    policy: RetryPolicy,
    audit: Arc<dyn AuditSink>,
    region: String,
}

impl<E: Ec2> Retrying<E> {
    pub fn new<S: Into<String>>(inner: E, policy: RetryPolicy, audit: Arc<dyn AuditSink>, region: S) -> Self {
        Self {
            inner,
            policy,
            audit,
            region: region.into(),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    fn run<T>(&self, op: &str, mut call: impl FnMut(&E) -> ProviderResult<T>) -> ProviderResult<T> {
        let mut attempt = 0u32;
        loop {
            match call(&self.inner) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && self.policy.max_retries > 0 => {
                    if attempt >= self.policy.max_retries {
                        self.give_up(op, &e);
                        return Err(e);
                    }
                    let delay = self.policy.delay(attempt);
                    attempt += 1;
                    metrics::record_retry();
                    let subject = Status::RetryAfterSleep {
                        attempts: attempt,
                        seconds: delay.as_secs_f64(),
                    };
                    warn!("{}: {} ({})", op, subject, e);
                    self.audit.write(
                        &AuditEvent::new(subject)
                            .body(e.to_string())
                            .severity(Severity::Low)
                            .kind(EventType::Alert)
                            .region(self.region.as_str()),
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn give_up(&self, op: &str, e: &ProviderError) {
        let subject = Status::RetryAllFail {
            retries: self.policy.max_retries,
        };
        warn!("{}: {} ({})", op, subject, e);
        self.audit.write(
            &AuditEvent::new(subject)
                .body(e.to_string())
                .severity(Severity::High)
                .kind(EventType::Alert)
                .region(self.region.as_str()),
        );
    }
}

impl<E: Ec2> Ec2 for Retrying<E> {
    fn list_volumes(&self, filters: Option<&ProviderFilters>) -> ProviderResult<Vec<Volume>> {
        self.run("list_volumes", |e| e.list_volumes(filters))
    }

    fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>> {
        self.run("list_snapshots", |e| e.list_snapshots())
    }

    fn create_snapshot(&self, volume_id: &str, description: &str) -> ProviderResult<Snapshot> {
        self.run("create_snapshot", |e| e.create_snapshot(volume_id, description))
    }

    fn tag_resource(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()> {
        self.run("tag_resource", |e| e.tag_resource(resource_id, tags))
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> ProviderResult<()> {
        self.run("delete_snapshot", |e| e.delete_snapshot(snapshot_id))
    }
}
