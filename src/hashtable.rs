use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bucket::Bucket;
use crate::hash::HashFn;

/// An immutable-shape snapshot of the hash table: the bucket array plus the
/// hash function, published through the cache's atomic generation pointer.
///
/// The array never mutates after construction; only bucket *contents* change,
/// under each bucket's own lock. Growing installs a whole new generation
/// whose lower half shares these bucket handles.
pub(crate) struct Generation {
    buckets: Vec<Arc<Bucket>>,
    hash: HashFn,
}

impl Generation {
    /// Initial table: `len` buckets seeded with working capacity.
    pub(crate) fn new(len: usize, capacity: usize, hash: HashFn) -> Self {
        let buckets = (0..len)
            .map(|_| Arc::new(Bucket::with_capacity(capacity)))
            .collect();
        Self { buckets, hash }
    }

    /// A doubled table assembled by the grower.
    pub(crate) fn from_parts(buckets: Vec<Arc<Bucket>>, hash: HashFn) -> Self {
        Self { buckets, hash }
    }

    /// Slot index for a key under this generation's size and hash function.
    #[inline]
    pub(crate) fn slot(&self, key: &[u8]) -> usize {
        (self.hash)(key) as usize % self.buckets.len()
    }

    #[inline]
    pub(crate) fn bucket_for(&self, key: &[u8]) -> &Bucket {
        &self.buckets[self.slot(key)]
    }

    #[inline]
    pub(crate) fn buckets(&self) -> &[Arc<Bucket>] {
        &self.buckets
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn hash(&self) -> HashFn {
        self.hash
    }

    /// Bucket-size histogram, ascending by size. Takes one read lock at a
    /// time and releases it before moving on.
    pub(crate) fn histogram(&self) -> Vec<(usize, usize)> {
        let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
        for bucket in &self.buckets {
            let len = bucket.read().len();
            *sizes.entry(len).or_default() += 1;
        }
        sizes.into_iter().collect()
    }
}

/// Table shape statistics returned by [`crate::Cache::bucket_stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketStats {
    /// Total items currently accounted by the occupancy counter.
    pub items: u64,
    /// Number of buckets in the current generation.
    pub buckets: usize,
    /// `(bucket_size, bucket_count)` pairs, ascending by size.
    pub histogram: Vec<(usize, usize)>,
}
