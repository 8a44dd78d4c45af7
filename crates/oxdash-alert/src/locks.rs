use dashmap::DashMap;
use oxdash_common::types::AlertId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-alert exclusive scopes.
///
/// Each alert id maps to its own async mutex, created on first use and
/// removed once the last holder or waiter lets go. Scopes for different ids
/// never contend with each other.
#[derive(Default)]
pub struct AlertLocks {
    scopes: DashMap<AlertId, Arc<Mutex<()>>>,
}

/// Exclusive access to one alert. Released on drop.
pub struct AlertScope<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    entry: ScopeEntry<'a>,
}

/// Interest in one registry entry, held from the first wait until the scope
/// is released. Dropping it prunes the entry when nobody else references
/// the mutex, which also covers a waiter cancelled before it got the lock.
struct ScopeEntry<'a> {
    locks: &'a AlertLocks,
    alert_id: AlertId,
}

impl Drop for ScopeEntry<'_> {
    fn drop(&mut self) {
        // Only the map itself still references the mutex: nobody is waiting.
        self.locks
            .scopes
            .remove_if(&self.alert_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl AlertLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `alert_id`.
    ///
    /// Cancel safe: dropping the returned future while it waits leaves no
    /// entry behind once the current holder lets go.
    pub async fn acquire(&self, alert_id: AlertId) -> AlertScope<'_> {
        let mutex = Arc::clone(
            self.scopes
                .entry(alert_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        // Declared before the await so the pending lock future, and the Arc
        // it owns, is dropped first on cancellation.
        let entry = ScopeEntry {
            locks: self,
            alert_id,
        };
        // DashMap shard lock is released before awaiting
        let guard = mutex.lock_owned().await;
        AlertScope {
            guard: Some(guard),
            entry,
        }
    }

    /// Number of alert ids that currently have a holder or waiter.
    pub fn active_scopes(&self) -> usize {
        self.scopes.len()
    }
}

impl AlertScope<'_> {
    pub fn alert_id(&self) -> AlertId {
        self.entry.alert_id
    }
}

impl Drop for AlertScope<'_> {
    fn drop(&mut self) {
        // The guard owns a reference to the mutex; release it before the
        // entry checks whether the mutex is still in use.
        drop(self.guard.take());
    }
}
