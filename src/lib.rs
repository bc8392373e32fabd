mod bucket;
mod counter;
mod error;
mod grow;
pub mod hash;
mod hashtable;
mod item;
mod janitor;
mod metrics;
mod snapshot;

pub use counter::Counter;
pub use error::{Error, Result};
pub use hash::HashFn;
pub use hashtable::BucketStats;
pub use item::Value;
pub use metrics::{CacheMetrics, Metric};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::grow::GROW_RUNNING;
use crate::hashtable::Generation;
use crate::item::Item;
use crate::janitor::Janitor;

/// A bucket longer than this before an insert schedules a table grow.
const GROW_THRESHOLD: usize = 14;

/// Working capacity for freshly built buckets: the grow threshold plus a
/// little slack so steady-state inserts do not reallocate.
const SEED_CAPACITY: usize = GROW_THRESHOLD + 4;

/// Bucket count used when the builder is given 0.
const DEFAULT_BUCKETS: usize = 1000;

/// Called with each expiring item just before the sweeper removes it.
pub trait EvictionCallback: Send + Sync + 'static {
    fn on_evict(&self, key: &[u8], value: &Value);
}

impl<F> EvictionCallback for F
where
    F: Fn(&[u8], &Value) + Send + Sync + 'static,
{
    fn on_evict(&self, key: &[u8], value: &Value) {
        self(key, value)
    }
}

/// State shared between the public handle, the grower, and the janitor.
pub(crate) struct Shared {
    /// Current generation. Loaded exactly once per operation; swapped with
    /// release semantics by the grower.
    pub(crate) table: ArcSwap<Generation>,
    pub(crate) count: Counter,
    pub(crate) touch_on_read: bool,
    /// 0 when idle, [`GROW_RUNNING`] while a grower owns the table.
    pub(crate) grow_flag: AtomicU32,
    pub(crate) callback: Option<Arc<dyn EvictionCallback>>,
    pub(crate) metrics: CacheMetrics,
}

/// Concurrent sharded key-value cache.
///
/// Keys hash to one of many independently locked buckets; the bucket array
/// doubles online when buckets get long, and an optional background sweeper
/// expires items that have not been touched between sweeps (second-chance
/// eviction). Dropping the cache stops and joins the sweeper.
pub struct Cache {
    pub(crate) shared: Arc<Shared>,
    // Declared after `shared` only by convention; the janitor thread owns
    // its own Arc into the shared state, so drop order is not load-bearing.
    janitor: Option<Janitor>,
}

/// Builder for constructing a [`Cache`].
pub struct CacheBuilder {
    hash: HashFn,
    initial_buckets: usize,
    touch_on_read: bool,
    sweep_interval: Duration,
    capacity: u64,
    callback: Option<Arc<dyn EvictionCallback>>,
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self {
            hash: hash::faq6,
            initial_buckets: DEFAULT_BUCKETS,
            touch_on_read: true,
            sweep_interval: Duration::ZERO,
            capacity: 0,
            callback: None,
        }
    }

    /// Hash function used for slot placement, fixed for the cache's
    /// lifetime. Defaults to [`hash::faq6`].
    pub fn hash(mut self, hash: HashFn) -> Self {
        self.hash = hash;
        self
    }

    /// Initial bucket count. 0 selects the default of 1000.
    pub fn initial_buckets(mut self, count: usize) -> Self {
        self.initial_buckets = count;
        self
    }

    /// Whether a lookup refreshes the item's liveness for the sweeper.
    /// Defaults to true.
    pub fn touch_on_read(mut self, enabled: bool) -> Self {
        self.touch_on_read = enabled;
        self
    }

    /// Period between sweeper passes. Zero (the default) disables the
    /// sweeper entirely; no background thread is started.
    pub fn sweep_interval(mut self, period: Duration) -> Self {
        self.sweep_interval = period;
        self
    }

    /// Hard ceiling on the number of items. 0 (the default) is unlimited.
    pub fn capacity(mut self, limit: u64) -> Self {
        self.capacity = limit;
        self
    }

    /// Callback invoked with (key, value) just before the sweeper removes
    /// an expired item.
    pub fn eviction_callback(mut self, callback: impl EvictionCallback) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Cache {
        let buckets = if self.initial_buckets == 0 {
            DEFAULT_BUCKETS
        } else {
            self.initial_buckets
        };

        let shared = Arc::new(Shared {
            table: ArcSwap::from_pointee(Generation::new(buckets, SEED_CAPACITY, self.hash)),
            count: Counter::new(self.capacity),
            touch_on_read: self.touch_on_read,
            grow_flag: AtomicU32::new(0),
            callback: self.callback,
            metrics: CacheMetrics::new(),
        });

        let janitor = (!self.sweep_interval.is_zero())
            .then(|| Janitor::spawn(Arc::clone(&shared), self.sweep_interval));

        Cache { shared, janitor }
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Look up a key.
    ///
    /// Numeric payloads come back by value; opaque payloads come back as a
    /// shared handle onto the stored bytes. When touch-on-read is enabled
    /// the hit also refreshes the item for the sweeper.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        let table = self.shared.table.load();
        let items = table.bucket_for(key).read();
        match bucket::position(&items, key) {
            Some(idx) => {
                let item = &items[idx];
                if self.shared.touch_on_read {
                    item.refresh();
                }
                self.shared.metrics.hit.increment();
                Some(item.value.clone())
            }
            None => {
                self.shared.metrics.miss.increment();
                None
            }
        }
    }

    /// Insert or update a key.
    ///
    /// Updates overwrite in place and always succeed. Inserts consult the
    /// occupancy ceiling first and return false, storing nothing, when the
    /// cache is full. An insert that leaves the bucket past the grow
    /// threshold schedules a single background grow.
    pub fn set(&self, key: &[u8], value: impl Into<Value>) -> bool {
        let value = value.into();
        let table = self.shared.table.load();
        let bucket = table.bucket_for(key);

        let mut items = bucket.write();
        if let Some(idx) = bucket::position(&items, key) {
            items[idx].value = value;
            drop(items);
            self.shared.metrics.update.increment();
            return true;
        }

        if !self.shared.count.check() {
            drop(items);
            self.shared.metrics.full.increment();
            return false;
        }

        let len_before = items.len();
        items.push(Item::new(key, value));
        self.shared.count.inc();
        drop(items);
        self.shared.metrics.insert.increment();

        if len_before > GROW_THRESHOLD && self.try_claim_grow() {
            let shared = Arc::clone(&self.shared);
            std::thread::Builder::new()
                .name("growcache-grow".to_string())
                .spawn(move || shared.grow())
                .unwrap();
        }
        true
    }

    /// Remove a key, returning its value.
    pub fn del(&self, key: &[u8]) -> Option<Value> {
        let table = self.shared.table.load();
        let mut items = table.bucket_for(key).write();
        let idx = bucket::position(&items, key)?;
        let item = items.swap_remove(idx);
        self.shared.count.dec();
        drop(items);
        self.shared.metrics.delete.increment();
        Some(item.value)
    }

    /// Add `n` to a numeric payload, converted to the payload's own kind,
    /// and return the updated value. Returns `None` for a missing key or a
    /// non-numeric payload (which is left unchanged).
    pub fn inc(&self, key: &[u8], n: f64) -> Option<Value> {
        let table = self.shared.table.load();
        let mut items = table.bucket_for(key).write();
        let idx = bucket::position(&items, key)?;
        let item = &mut items[idx];
        let updated = item.value.numeric_add(n)?;
        item.value = updated.clone();
        item.refresh();
        Some(updated)
    }

    /// Current number of items.
    pub fn len(&self) -> u64 {
        self.shared.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle to the occupancy counter, for external observers.
    pub fn counter(&self) -> &Counter {
        &self.shared.count
    }

    /// Per-instance operation metrics.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.shared.metrics
    }

    /// Shape of the current generation: item total, bucket count, and a
    /// bucket-size histogram sorted ascending by size.
    pub fn bucket_stats(&self) -> BucketStats {
        let table = self.shared.table.load();
        BucketStats {
            items: self.shared.count.get(),
            buckets: table.len(),
            histogram: table.histogram(),
        }
    }

    fn try_claim_grow(&self) -> bool {
        self.shared
            .grow_flag
            .compare_exchange(0, GROW_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
