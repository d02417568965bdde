//! Recency-ordered key map.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

struct Slot<V> {
    value: V,
    freshness: u64,
}

/// Map from key to value ordered by recency of touch.
///
/// Every [`put`](Self::put) and [`touch`](Self::touch) stamps the entry with
/// a freshness value drawn from an instance-owned monotonic counter;
/// [`pop_oldest`](Self::pop_oldest) removes the entry with the smallest
/// stamp, i.e. the one touched least recently. Plain lookups never change
/// freshness.
///
/// The map itself never evicts: the caller enforces whatever bound it wants
/// by popping before inserting. Backing structure is a hash map plus an
/// ordered freshness index, giving amortized O(1) lookups and O(log n)
/// put/touch/pop.
pub struct RecencyKeyMap<K, V> {
    slots: HashMap<K, Slot<V>>,
    by_freshness: BTreeMap<u64, K>,
    next_freshness: u64,
}

impl<K, V> RecencyKeyMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            by_freshness: BTreeMap::new(),
            next_freshness: 0,
        }
    }

    /// Create an empty map sized for roughly `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            by_freshness: BTreeMap::new(),
            next_freshness: 0,
        }
    }

    /// Look up a value without altering its freshness.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.slots.get(key).map(|slot| &slot.value)
    }

    /// Mutably look up a value without altering its freshness.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.slots.get_mut(key).map(|slot| &mut slot.value)
    }

    /// Insert or overwrite, stamping the entry with the newest freshness.
    pub fn put(&mut self, key: K, value: V) {
        let freshness = self.next_freshness;
        self.next_freshness += 1;

        if let Some(slot) = self.slots.get_mut(&key) {
            self.by_freshness.remove(&slot.freshness);
            slot.freshness = freshness;
            slot.value = value;
            let displaced = self.by_freshness.insert(freshness, key);
            debug_assert!(displaced.is_none(), "freshness values never repeat");
        } else {
            self.slots.insert(key.clone(), Slot { value, freshness });
            let displaced = self.by_freshness.insert(freshness, key);
            debug_assert!(displaced.is_none(), "freshness values never repeat");
        }
    }

    /// Re-stamp an existing entry with the newest freshness, marking it just
    /// touched. Returns `false` when the key is absent.
    ///
    /// An entry accumulating successfully must be touched after every add,
    /// or it becomes unfairly eligible for eviction despite active use.
    pub fn touch(&mut self, key: &K) -> bool {
        let slot = match self.slots.get_mut(key) {
            Some(slot) => slot,
            None => return false,
        };

        let freshness = self.next_freshness;
        self.next_freshness += 1;

        // The index entry owns a key copy; move it to the new stamp.
        if let Some(owned_key) = self.by_freshness.remove(&slot.freshness) {
            slot.freshness = freshness;
            let displaced = self.by_freshness.insert(freshness, owned_key);
            debug_assert!(displaced.is_none(), "freshness values never repeat");
        }
        true
    }

    /// Remove and return the least-recently-touched entry, or `None` when
    /// the map is empty.
    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.by_freshness.pop_first()?;
        let slot = self.slots.remove(&key)?;
        Some((key, slot.value))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<K, V> Default for RecencyKeyMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
