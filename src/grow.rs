use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::bucket::Bucket;
use crate::hashtable::Generation;
use crate::Shared;

/// Flag value parked in `grow_flag` while a grower is running. The flag is
/// either 0 (idle) or this; set turns it 0 -> GROW_RUNNING under CAS, so at
/// most one grower exists and the bulk upper-half lock acquisition can never
/// deadlock against a second grower.
pub(crate) const GROW_RUNNING: u32 = 2;

impl Shared {
    /// Double the table and repartition, while readers and writers continue.
    ///
    /// The lower half of the new generation shares the old generation's
    /// bucket handles, so an operation that loaded the old pointer keeps
    /// working on the very same buckets. The fresh upper half is write-locked
    /// *before* the new generation is published: a lookup that computes an
    /// upper-half slot blocks until that slot's partition step has run,
    /// instead of observing a premature empty bucket.
    pub(crate) fn grow(&self) {
        let old = self.table.load_full();
        let old_len = old.len();
        let new_len = old_len << 1;

        let mut buckets: Vec<Arc<Bucket>> = Vec::with_capacity(new_len);
        buckets.extend(old.buckets().iter().cloned());
        for _ in old_len..new_len {
            buckets.push(Arc::new(Bucket::new()));
        }
        let next = Arc::new(Generation::from_parts(buckets, old.hash()));

        let upper: Vec<_> = next.buckets()[old_len..]
            .iter()
            .map(|bucket| bucket.write())
            .collect();

        self.table.store(Arc::clone(&next));
        drop(old);

        // Ascending per-slot partition. Items whose new slot is i stay,
        // items whose new slot is i + old_len move. Each upper lock is
        // released before its lower counterpart, restoring the slot
        // invariant for both halves of the pair at once.
        for (i, mut upper_guard) in upper.into_iter().enumerate() {
            let mut lower_guard = next.buckets()[i].write();
            let drained = std::mem::take(&mut *lower_guard);
            let (stay, moved): (Vec<_>, Vec<_>) = drained
                .into_iter()
                .partition(|item| next.slot(&item.key) == i);
            *lower_guard = stay;
            *upper_guard = moved;
            drop(upper_guard);
            drop(lower_guard);
        }

        self.grow_flag.store(0, Ordering::Release);
        self.metrics.grow.increment();
        debug!(from = old_len, to = new_len, "hash table grown");
    }
}
