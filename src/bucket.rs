use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::item::Item;

/// One slot of the hash table: a reader/writer-locked small array of items.
///
/// Every item in a bucket hashes to the bucket's index under the current
/// generation, except transiently while the grower is partitioning that
/// index. Order inside a bucket is not observable: deletion swaps with the
/// last item and the grower repartitions wholesale.
#[derive(Debug, Default)]
pub(crate) struct Bucket {
    items: RwLock<Vec<Item>>,
}

impl Bucket {
    /// A fresh, empty bucket. Upper-half buckets created by the grower
    /// start like this and receive their items during partition.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A bucket pre-sized for the steady-state load a slot carries before
    /// a grow is scheduled.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            items: RwLock::new(Vec::with_capacity(capacity)),
        }
    }

    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<Item>> {
        self.items.read()
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<Item>> {
        self.items.write()
    }
}

/// Linear scan for a key. Buckets stay small (the grower keeps them near
/// the threshold), so this beats any per-bucket index.
#[inline]
pub(crate) fn position(items: &[Item], key: &[u8]) -> Option<usize> {
    items.iter().position(|item| &*item.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Value;

    #[test]
    fn scan_finds_by_exact_key() {
        let bucket = Bucket::with_capacity(4);
        {
            let mut items = bucket.write();
            items.push(Item::new(b"alpha", Value::U32(1)));
            items.push(Item::new(b"beta", Value::U32(2)));
        }
        let items = bucket.read();
        assert_eq!(position(&items, b"beta"), Some(1));
        assert_eq!(position(&items, b"bet"), None);
        assert_eq!(position(&items, b"betaa"), None);
    }

    #[test]
    fn swap_remove_keeps_remaining_items() {
        let bucket = Bucket::new();
        {
            let mut items = bucket.write();
            for i in 0..4u32 {
                items.push(Item::new(format!("k{i}").as_bytes(), Value::U32(i)));
            }
            let idx = position(&items, b"k1").unwrap();
            let removed = items.swap_remove(idx);
            assert_eq!(removed.value, Value::U32(1));
        }
        let items = bucket.read();
        assert_eq!(items.len(), 3);
        for key in [b"k0".as_slice(), b"k2", b"k3"] {
            assert!(position(&items, key).is_some(), "missing {:?}", key);
        }
    }
}
