//! Single-flight memoization of loaded series and fitted models
//!
//! The cache is an ordinary value handed to whoever needs it; there is no
//! process-wide instance. For every key at most one load or fit runs at a
//! time. Callers arriving while it runs block until it publishes, then all
//! receive the same outcome. Failures are handed to every waiter but never
//! stored, so the next call tries again.

use crate::data::LoadedSeries;
use crate::error::{ForecastError, Result};
use crate::models::FittedModel;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One in-progress computation and the outcome its waiters block on
struct Flight<V> {
    outcome: Mutex<Option<Result<Arc<V>>>>,
    published: Condvar,
}

impl<V> Flight<V> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            published: Condvar::new(),
        }
    }

    fn publish(&self, outcome: Result<Arc<V>>) {
        *lock(&self.outcome) = Some(outcome);
        self.published.notify_all();
    }

    fn wait(&self) -> Result<Arc<V>> {
        let mut outcome = lock(&self.outcome);
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            outcome = self
                .published
                .wait(outcome)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

enum Slot<V> {
    InFlight(Arc<Flight<V>>),
    Ready(Arc<V>),
}

struct Slots<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// Ready keys, oldest first
    ready_order: VecDeque<K>,
}

enum Lookup<V> {
    Hit(Arc<V>),
    Wait(Arc<Flight<V>>),
    Lead(Arc<Flight<V>>),
}

/// Publishes a failure if the leader's computation unwinds before finishing
struct FlightGuard<'a, K: Eq + Hash + Clone + Debug, V> {
    cache: &'a SingleFlight<K, V>,
    key: &'a K,
    flight: Arc<Flight<V>>,
    finished: bool,
}

impl<K: Eq + Hash + Clone + Debug, V> Drop for FlightGuard<'_, K, V> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.finish(
                self.key,
                &self.flight,
                Err(ForecastError::FitFailure(format!(
                    "Computation for {:?} panicked",
                    self.key
                ))),
            );
        }
    }
}

/// Keyed single-flight memoization with an optional bound on ready entries
pub struct SingleFlight<K, V> {
    slots: Mutex<Slots<K, V>>,
    capacity: Option<usize>,
}

impl<K: Eq + Hash + Clone + Debug, V> SingleFlight<K, V> {
    /// Create an empty cache; `capacity` bounds the number of ready entries
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                ready_order: VecDeque::new(),
            }),
            capacity,
        }
    }

    /// Return the value for `key`, computing it at most once across concurrent callers
    pub fn get_or_compute<F>(&self, key: &K, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let lookup = {
            let mut slots = lock(&self.slots);
            let existing = match slots.entries.get(key) {
                Some(Slot::Ready(value)) => Some(Lookup::Hit(Arc::clone(value))),
                Some(Slot::InFlight(flight)) => Some(Lookup::Wait(Arc::clone(flight))),
                None => None,
            };

            existing.unwrap_or_else(|| {
                let flight = Arc::new(Flight::new());
                slots
                    .entries
                    .insert(key.clone(), Slot::InFlight(Arc::clone(&flight)));
                Lookup::Lead(flight)
            })
        };

        match lookup {
            Lookup::Hit(value) => {
                debug!(key = ?key, "cache hit");
                Ok(value)
            }
            Lookup::Wait(flight) => {
                debug!(key = ?key, "waiting for in-flight computation");
                flight.wait()
            }
            Lookup::Lead(flight) => {
                debug!(key = ?key, "cache miss");
                let mut guard = FlightGuard {
                    cache: self,
                    key,
                    flight,
                    finished: false,
                };

                let outcome = compute().map(Arc::new);
                guard.finished = true;
                self.finish(key, &guard.flight, outcome.clone());
                outcome
            }
        }
    }

    /// Store a successful outcome if the slot still belongs to `flight`, then wake its waiters
    fn finish(&self, key: &K, flight: &Arc<Flight<V>>, outcome: Result<Arc<V>>) {
        {
            let mut slots = lock(&self.slots);
            let owned = matches!(
                slots.entries.get(key),
                Some(Slot::InFlight(current)) if Arc::ptr_eq(current, flight)
            );

            if owned {
                match &outcome {
                    Ok(value) => {
                        slots
                            .entries
                            .insert(key.clone(), Slot::Ready(Arc::clone(value)));
                        slots.ready_order.push_back(key.clone());
                        self.evict(&mut slots);
                    }
                    Err(e) => {
                        debug!(key = ?key, error = %e, "computation failed, not cached");
                        slots.entries.remove(key);
                    }
                }
            }
        }

        flight.publish(outcome);
    }

    fn evict(&self, slots: &mut Slots<K, V>) {
        let Some(capacity) = self.capacity else {
            return;
        };

        while slots.ready_order.len() > capacity {
            if let Some(oldest) = slots.ready_order.pop_front() {
                debug!(key = ?oldest, "evicting oldest cache entry");
                slots.entries.remove(&oldest);
            }
        }
    }

    /// Drop every entry whose key fails `keep`
    pub fn retain<P: Fn(&K) -> bool>(&self, keep: P) {
        let mut slots = lock(&self.slots);
        slots.entries.retain(|key, _| keep(key));
        slots.ready_order.retain(|key| keep(key));
    }

    /// Drop a single entry
    pub fn invalidate(&self, key: &K) {
        self.retain(|candidate| candidate != key);
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut slots = lock(&self.slots);
        slots.entries.clear();
        slots.ready_order.clear();
    }

    /// Number of ready entries
    pub fn len(&self) -> usize {
        lock(&self.slots).ready_order.len()
    }

    /// Check if no entry is ready
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has a ready value
    pub fn contains(&self, key: &K) -> bool {
        matches!(lock(&self.slots).entries.get(key), Some(Slot::Ready(_)))
    }
}

/// Stable identity of a data source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    /// A file, identified by path, modification time and size
    File {
        path: PathBuf,
        modified: Option<SystemTime>,
        len: u64,
    },
    /// A caller-chosen identity for non-file sources
    Named(String),
}

impl SourceKey {
    /// Identity of a file as it is on disk now; a rewritten file gets a new key
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| {
            ForecastError::DataUnavailable(format!("{}: {}", path.display(), e))
        })?;

        Ok(SourceKey::File {
            path: fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }

    /// Identity supplied by the caller
    pub fn named(name: &str) -> Self {
        SourceKey::Named(name.to_string())
    }

    /// Whether `other` is an older or newer state of the same file
    pub fn supersedes(&self, other: &SourceKey) -> bool {
        match (self, other) {
            (SourceKey::File { path, .. }, SourceKey::File { path: other_path, .. }) => {
                path == other_path && self != other
            }
            _ => false,
        }
    }
}

/// Identity of a fitted model: the data it was fit on and the strategy fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub source: SourceKey,
    pub fingerprint: String,
}

impl ModelKey {
    pub fn new(source: SourceKey, fingerprint: impl Into<String>) -> Self {
        Self {
            source,
            fingerprint: fingerprint.into(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Most ready entries kept per kind; unbounded when `None`
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl CacheConfig {
    /// Bound each kind of entry to `capacity` ready values
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ForecastError::InvalidParameter(
                "Cache capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            capacity: Some(capacity),
        })
    }
}

/// Memoizes loaded series and fitted models
pub struct ModelCache {
    series: SingleFlight<SourceKey, LoadedSeries>,
    models: SingleFlight<ModelKey, FittedModel>,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("series", &self.series.len())
            .field("models", &self.models.len())
            .finish()
    }
}

impl ModelCache {
    /// Create a new cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            series: SingleFlight::new(config.capacity),
            models: SingleFlight::new(config.capacity),
        }
    }

    /// Loaded series for `key`, running `load` only if no load is cached or in flight
    pub fn get_or_load<F>(&self, key: &SourceKey, load: F) -> Result<Arc<LoadedSeries>>
    where
        F: FnOnce() -> Result<LoadedSeries>,
    {
        self.series.get_or_compute(key, load)
    }

    /// Fitted model for `key`, running `fit` only if no fit is cached or in flight
    pub fn get_or_fit<F>(&self, key: &ModelKey, fit: F) -> Result<Arc<FittedModel>>
    where
        F: FnOnce() -> Result<FittedModel>,
    {
        self.models.get_or_compute(key, fit)
    }

    /// Forget a source and every model fit on it
    pub fn invalidate_source(&self, key: &SourceKey) {
        self.series.invalidate(key);
        self.models.retain(|model| &model.source != key);
    }

    /// Forget series and models cached for other states of the file behind `current`
    pub fn replace_source(&self, current: &SourceKey) {
        self.series.retain(|key| !current.supersedes(key));
        self.models.retain(|model| !current.supersedes(&model.source));
    }

    /// Forget one fitted model
    pub fn invalidate_model(&self, key: &ModelKey) {
        self.models.invalidate(key);
    }

    /// Forget everything
    pub fn clear(&self) {
        self.series.clear();
        self.models.clear();
    }

    /// Number of ready series
    pub fn series_len(&self) -> usize {
        self.series.len()
    }

    /// Number of ready models
    pub fn model_len(&self) -> usize {
        self.models.len()
    }
}
