//! Repository cache
//!
//! Owns the map from repository label to live handle. Concurrent callers
//! acquiring the same label during a miss storm all receive the one handle
//! a single construction produces; eviction runs on a background cadence
//! against a total weight budget and never touches a handle with live
//! connections.

use super::engine::{StorageError, StorageResult};
use super::handle::{RepositoryHandle, RepositoryLabel};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Eviction policy knobs.
///
/// Weights are dynamic per handle: 0 with live connections (never a
/// target), high while uninitialized (cheap to discard and rebuild),
/// medium when initialized and idle.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub weight_budget: u64,
    pub weight_uninitialized: u64,
    pub weight_idle: u64,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            weight_budget: 900,
            weight_uninitialized: 600,
            weight_idle: 200,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

struct CacheSlot {
    handle: Arc<RepositoryHandle>,
    last_access: Instant,
}

/// The repository cache and lifecycle manager.
pub struct RepositoryCache {
    cfg: CacheConfig,
    slots: Arc<DashMap<RepositoryLabel, CacheSlot>>,
    /// Per-label construction gates for single-flight acquires
    inflight: tokio::sync::Mutex<HashMap<RepositoryLabel, Arc<tokio::sync::Mutex<()>>>>,
}

impl RepositoryCache {
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            cfg,
            slots: Arc::new(DashMap::new()),
            inflight: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for `label`, constructing it via `open` on
    /// first access.
    ///
    /// Construction happens at most once per label even under a miss storm:
    /// racing callers wait on a per-label gate and pick up the one result.
    /// The construction itself runs on a blocking thread and inserts its
    /// handle directly, so a caller that stops waiting (timeout) abandons
    /// only its wait — the handle still lands in the cache for the next
    /// caller. No partially built handle is ever visible.
    pub async fn acquire<F>(
        &self,
        label: &RepositoryLabel,
        open: F,
    ) -> StorageResult<Arc<RepositoryHandle>>
    where
        F: FnOnce() -> StorageResult<RepositoryHandle> + Send + 'static,
    {
        if let Some(handle) = self.lookup(label) {
            return Ok(handle);
        }

        let gate = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(label.clone())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        let _guard = gate.lock().await;

        // a racer may have finished construction while we waited
        if let Some(handle) = self.lookup(label) {
            return Ok(handle);
        }

        let slots = Arc::clone(&self.slots);
        let slot_label = label.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let handle = Arc::new(open()?);
            slots.insert(
                slot_label,
                CacheSlot {
                    handle: Arc::clone(&handle),
                    last_access: Instant::now(),
                },
            );
            Ok::<_, StorageError>(handle)
        })
        .await
        .map_err(|e| StorageError::Background(e.to_string()))??;

        let mut inflight = self.inflight.lock().await;
        inflight.remove(label);

        Ok(handle)
    }

    fn lookup(&self, label: &RepositoryLabel) -> Option<Arc<RepositoryHandle>> {
        self.slots.get_mut(label).map(|mut slot| {
            slot.last_access = Instant::now();
            Arc::clone(&slot.handle)
        })
    }

    /// Fail if a handle is stuck mid-construction or corrupted: it exists
    /// but is neither initialized nor connected.
    pub fn validate(&self, handle: &RepositoryHandle) -> StorageResult<()> {
        if !handle.is_initialized() && handle.connection_count() == 0 {
            warn!(label = %handle.label(), "repository handle is not initialized");
            return Err(StorageError::NotInitialized(handle.label().clone()));
        }
        Ok(())
    }

    /// Forcibly evict a handle regardless of pressure, for tenant deletion
    /// or reset.
    ///
    /// With live connections the physical engine shutdown is deferred to
    /// the last connection guard; the slot is removed either way.
    pub fn invalidate(&self, label: &RepositoryLabel) {
        if let Some((_, slot)) = self.slots.remove(label) {
            let connections = slot.handle.connection_count();
            if connections > 0 {
                warn!(
                    label = %label,
                    connections,
                    "invalidating repository with live connections, shutdown deferred"
                );
            }
            if let Err(e) = slot.handle.shut_down() {
                warn!(label = %label, error = %e, "engine shutdown failed during invalidation");
            }
        }
    }

    /// One eviction pass: while the total weight exceeds the budget,
    /// remove the highest-weight zero-connection slots, least recently
    /// accessed first among equals. Shutdown failures are logged and the
    /// slot is removed regardless.
    pub fn sweep(&self) {
        let mut candidates: Vec<(RepositoryLabel, u64, Instant)> = Vec::new();
        let mut total: u64 = 0;
        for entry in self.slots.iter() {
            let weight = self.weight_of(&entry.handle);
            total += weight;
            if weight > 0 {
                candidates.push((entry.key().clone(), weight, entry.last_access));
            }
        }
        if total <= self.cfg.weight_budget {
            return;
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        for (label, weight, _) in candidates {
            if total <= self.cfg.weight_budget {
                break;
            }
            // re-checked under the map shard lock: a connection opened
            // since ranking keeps the slot alive
            let removed = self
                .slots
                .remove_if(&label, |_, slot| slot.handle.connection_count() == 0);
            if let Some((_, slot)) = removed {
                debug!(label = %label, weight, "evicting repository handle");
                if let Err(e) = slot.handle.shut_down() {
                    warn!(label = %label, error = %e, "engine shutdown failed during eviction");
                }
                total -= weight;
            }
        }
    }

    /// Run [`sweep`](Self::sweep) on the configured background cadence.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cache.cfg.sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                cache.sweep();
            }
        })
    }

    /// Drain and close every cached handle, regardless of pressure.
    /// Invoked once at process shutdown.
    pub fn shutdown(&self) {
        let labels: Vec<RepositoryLabel> = self.slots.iter().map(|e| e.key().clone()).collect();
        for label in labels {
            if let Some((_, slot)) = self.slots.remove(&label) {
                debug!(label = %label, "shutting down repository handle");
                if let Err(e) = slot.handle.shut_down() {
                    warn!(label = %label, error = %e, "engine shutdown failed during teardown");
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, label: &RepositoryLabel) -> bool {
        self.slots.contains_key(label)
    }

    fn weight_of(&self, handle: &RepositoryHandle) -> u64 {
        if handle.connection_count() > 0 {
            0
        } else if !handle.is_initialized() {
            self.cfg.weight_uninitialized
        } else {
            self.cfg.weight_idle
        }
    }
}
