use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::errors::CleanupFailure;
use crate::types::{DynError, Instance, Lifetime, TypeInfo};

/// A cleanup routine attached to a registration
#[derive(Clone)]
pub(crate) enum Cleanup {
    Sync(Arc<dyn Fn(Instance) -> Result<(), DynError> + Send + Sync>),
    Async(Arc<dyn Fn(Instance) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>),
}

/// An instance awaiting teardown, in creation order
struct TrackedResource {
    type_info: TypeInfo,
    instance: Instance,
    cleanup: Cleanup,
    tier: Lifetime,
    seq: u64,
}

/// Tracks every produced instance whose registration declares a cleanup.
///
/// Teardown walks strictly in reverse creation order so dependents are torn
/// down before their dependencies. Torn-down resources are drained as they
/// go, which makes repeated shutdown calls no-ops; a sync pass leaves
/// async-only resources tracked (recording a per-resource failure) so an
/// async pass can still reach them.
#[derive(Default)]
pub(crate) struct ResourceTracker {
    entries: Mutex<Vec<TrackedResource>>,
}

impl ResourceTracker {
    pub(crate) fn track(
        &self,
        type_info: TypeInfo,
        instance: Instance,
        cleanup: Cleanup,
        tier: Lifetime,
    ) {
        let mut entries = lock(&self.entries);
        let seq = entries.last().map_or(0, |entry| entry.seq + 1);
        tracing::debug!("tracking resource `{}` (seq {seq})", type_info.short_name());
        entries.push(TrackedResource {
            type_info,
            instance,
            cleanup,
            tier,
            seq,
        });
    }

    pub(crate) fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Tears down every tracked resource, skipping async-only cleanups
    pub(crate) fn shutdown_sync(&self) -> Vec<CleanupFailure> {
        let drained = std::mem::take(&mut *lock(&self.entries));
        let (failures, kept) = run_sync_pass(drained);
        self.restore(kept);
        failures
    }

    /// Tears down scoped- and transient-tier resources only; singleton-tier
    /// resources stay tracked for container-level shutdown.
    pub(crate) fn shutdown_scope_sync(&self) -> Vec<CleanupFailure> {
        let scoped = {
            let mut entries = lock(&self.entries);
            let (scoped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *entries)
                .into_iter()
                .partition(|resource| resource.tier != Lifetime::Singleton);
            *entries = kept;
            scoped
        };
        let (failures, kept) = run_sync_pass(scoped);
        self.restore(kept);
        failures
    }

    /// Tears down every tracked resource, awaiting async cleanups in order
    pub(crate) async fn shutdown_async(&self) -> Vec<CleanupFailure> {
        let drained = std::mem::take(&mut *lock(&self.entries));
        let mut failures = Vec::new();
        for resource in drained.into_iter().rev() {
            let result = match &resource.cleanup {
                Cleanup::Sync(cleanup) => cleanup(resource.instance.clone()),
                Cleanup::Async(cleanup) => cleanup(resource.instance.clone()).await,
            };
            record(&mut failures, &resource, result);
        }
        failures
    }

    /// Puts skipped resources back, ahead of anything tracked meanwhile
    fn restore(&self, kept: Vec<TrackedResource>) {
        if kept.is_empty() {
            return;
        }
        let mut entries = lock(&self.entries);
        let newer = std::mem::replace(&mut *entries, kept);
        entries.extend(newer);
    }
}

fn run_sync_pass(resources: Vec<TrackedResource>) -> (Vec<CleanupFailure>, Vec<TrackedResource>) {
    let mut failures = Vec::new();
    let mut kept = Vec::new();
    for resource in resources.into_iter().rev() {
        match &resource.cleanup {
            Cleanup::Sync(cleanup) => {
                let result = cleanup(resource.instance.clone());
                record(&mut failures, &resource, result);
            }
            Cleanup::Async(_) => {
                tracing::warn!(
                    "skipping async-only cleanup for `{}` in sync teardown",
                    resource.type_info.short_name()
                );
                failures.push(CleanupFailure::AsyncOnly {
                    type_info: resource.type_info,
                });
                kept.push(resource);
            }
        }
    }
    kept.reverse();
    (failures, kept)
}

fn record(
    failures: &mut Vec<CleanupFailure>,
    resource: &TrackedResource,
    result: Result<(), DynError>,
) {
    match result {
        Ok(()) => {
            tracing::debug!("cleaned up `{}`", resource.type_info.short_name());
        }
        Err(error) => {
            tracing::error!(
                "cleanup for `{}` failed: {error}",
                resource.type_info.short_name()
            );
            failures.push(CleanupFailure::Raised {
                type_info: resource.type_info,
                error: Arc::new(error),
            });
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
