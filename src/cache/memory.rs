//! In-memory cache store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::entry::{CacheKey, CacheValue};
use super::store::CacheStore;

/// Thread-safe in-memory store bounded by total cost.
///
/// A write costlier than the whole capacity is refused. Any other write is
/// admitted after evicting the oldest entries until it fits.
pub struct MemoryStore {
    max_cost: i64,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    /// Insertion sequence -> key, oldest first.
    order: BTreeMap<u64, String>,
    used: i64,
    next_seq: u64,
}

struct Slot {
    value: CacheValue,
    cost: i64,
    seq: u64,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<Slot> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        self.used -= slot.cost;
        Some(slot)
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, key)) = self.order.pop_first() else {
            return false;
        };
        if let Some(slot) = self.entries.remove(&key) {
            self.used -= slot.cost;
            tracing::debug!("Evicted {} from memory store", key);
        }
        true
    }
}

impl MemoryStore {
    /// Create a store admitting up to `max_cost` in total.
    pub fn new(max_cost: i64) -> Self {
        Self {
            max_cost,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of costs of held entries.
    pub fn used_cost(&self) -> i64 {
        self.lock().used
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.lock()
            .entries
            .get(&key.encode())
            .map(|slot| slot.value.clone())
    }

    fn set(&self, key: &CacheKey, value: CacheValue, cost: i64) -> bool {
        if cost > self.max_cost {
            return false;
        }

        let encoded = key.encode();
        let mut inner = self.lock();
        inner.remove(&encoded);

        while inner.used + cost > self.max_cost {
            if !inner.evict_oldest() {
                break;
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, encoded.clone());
        inner.used += cost;
        inner.entries.insert(encoded, Slot { value, cost, seq });
        true
    }

    fn remove(&self, key: &CacheKey) -> bool {
        self.lock().remove(&key.encode()).is_some()
    }
}
