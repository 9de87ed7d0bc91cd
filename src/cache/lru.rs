//! LRU Cache Module
//!
//! Fixed-capacity key-value cache with strict recency ordering and O(1)
//! amortized access. The least recently touched entry is evicted whenever
//! an insert would exceed capacity.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::cache::CacheStats;
use crate::error::{CacheError, Result};

// == Eviction Callback ==
/// Callback invoked with the key and value of an entry leaving the cache,
/// either under capacity pressure or during an explicit flush.
///
/// Pure notification: the cache ignores anything the callback returns, and
/// the callback cannot re-enter the cache (it runs under `&mut self`). It
/// executes synchronously on the caller's stack, so it must not block.
pub type OnEvict<K, V> = Box<dyn FnMut(&K, &V)>;

// == Handles ==
/// Stable index of a slot in the arena.
type Handle = usize;

/// Null link marker for `prev`/`next`/`head`/`tail`.
const NIL: Handle = usize::MAX;

// == Slot ==
/// One live entry plus its links in the recency list.
///
/// `prev` points toward the head (more recently used), `next` toward the
/// tail (less recently used).
struct Slot<K, V> {
    key: K,
    value: V,
    prev: Handle,
    next: Handle,
}

// == LRU Cache ==
/// Fixed-capacity key-value cache with least-recently-used eviction.
///
/// Two coupled structures are kept synchronized on every operation: a
/// recency-ordered doubly linked list (head = most recently used, tail =
/// least recently used) and a hash index from key to list position. The
/// list is threaded through an arena of slots addressed by stable integer
/// handles, so removing an entry invalidates exactly one slot and two
/// links instead of any outstanding references.
///
/// Single-threaded by design: no locking, no atomics. Embedders that share
/// one instance across threads must supply their own mutual exclusion.
pub struct LruCache<K, V> {
    /// Key to handle of the slot holding it
    index: HashMap<K, Handle>,
    /// Slot arena; `None` marks a recycled slot
    slots: Vec<Option<Slot<K, V>>>,
    /// Handles of recycled slots available for reuse
    free: Vec<Handle>,
    /// Most recently used entry
    head: Handle,
    /// Least recently used entry, the next eviction candidate
    tail: Handle,
    /// Maximum number of entries, fixed at construction
    capacity: usize,
    /// Optional eviction observer
    on_evict: Option<OnEvict<K, V>>,
    /// Hit/miss/eviction counters
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    // == Constructors ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Panics
    /// Panics if `capacity` is zero. A cache that can hold nothing is a
    /// construction bug, not a runtime condition; use [`LruCache::try_new`]
    /// to surface it as an error instead.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "LruCache capacity must be at least 1");
        Self::assemble(capacity, None)
    }

    /// Creates a cache that reports departing entries through `on_evict`.
    ///
    /// The callback fires once per entry leaving the cache: on the
    /// capacity-pressure path of [`LruCache::put`], and once per held entry
    /// during [`LruCache::clear`] when requested. Overwriting an existing
    /// key never fires it.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_on_evict(capacity: usize, on_evict: OnEvict<K, V>) -> Self {
        assert!(capacity >= 1, "LruCache capacity must be at least 1");
        Self::assemble(capacity, Some(on_evict))
    }

    /// Fallible constructor for callers that treat capacity as input data
    /// rather than a hard-coded decision.
    pub fn try_new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self::assemble(capacity, None))
    }

    fn assemble(capacity: usize, on_evict: Option<OnEvict<K, V>>) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
            on_evict,
            stats: CacheStats::new(),
        }
    }

    // == Put ==
    /// Inserts a key-value pair, or overwrites the value of an existing key.
    ///
    /// Either way the key becomes the most recently used. Inserting a new
    /// key into a full cache first evicts the least recently used entry,
    /// firing the eviction callback if one is registered. Overwriting an
    /// existing key is an update, not an eviction, and never fires it.
    pub fn put(&mut self, key: K, value: V) {
        // Update in place: promote and overwrite.
        if let Some(&handle) = self.index.get(&key) {
            self.promote(handle);
            self.slot_mut(handle).value = value;
            return;
        }

        // Make room before linking so capacity is never exceeded, not even
        // transiently.
        if self.is_full() {
            self.evict_lru();
        }

        let handle = self.alloc(key.clone(), value);
        self.push_front(handle);
        self.index.insert(key, handle);
    }

    // == Get ==
    /// Returns the value stored under `key`, refreshing its recency.
    ///
    /// A hit promotes the entry to most recently used; a miss returns
    /// `None` and changes nothing. Absence is a normal outcome here, not
    /// an error.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let handle = match self.index.get(key) {
            Some(&handle) => handle,
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        self.promote(handle);
        self.stats.record_hit();
        Some(&self.slot(handle).value)
    }

    // == Contains ==
    /// Checks for `key` without counting as a use.
    ///
    /// Unlike [`LruCache::get`] this leaves the recency order untouched,
    /// so probing for membership never shields an entry from eviction.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    // == Clear ==
    /// Removes every entry.
    ///
    /// With `fire_on_evict` set and a callback registered, the callback is
    /// invoked once per entry from least to most recently used, the same
    /// relative order capacity pressure would have produced. The structures
    /// are emptied afterwards regardless of the flag.
    pub fn clear(&mut self, fire_on_evict: bool) {
        if fire_on_evict {
            if let Some(on_evict) = self.on_evict.as_mut() {
                // Tail-to-head walk: least recently used first.
                let mut cursor = self.tail;
                while cursor != NIL {
                    let slot = self.slots[cursor]
                        .as_ref()
                        .expect("recency list handle points at a live slot");
                    on_evict(&slot.key, &slot.value);
                    cursor = slot.prev;
                }
            }
        }

        let drained = self.index.len();
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        debug!(entries = drained, fired = fire_on_evict, "cache cleared");
    }

    // == Introspection ==
    /// Returns the number of entries currently held.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the maximum number of entries, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true when the next new key will trigger an eviction.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    // == Stats ==
    /// Returns a snapshot of the hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.len());
        stats
    }

    // == Eviction ==
    /// Drops the least recently used entry.
    ///
    /// Only reachable from `put` once `is_full()` holds, so the list is
    /// never empty here. The callback observes the entry while it is still
    /// resident.
    fn evict_lru(&mut self) {
        let handle = self.tail;
        debug_assert!(handle != NIL, "eviction requires at least one entry");

        if let (Some(on_evict), Some(slot)) =
            (self.on_evict.as_mut(), self.slots[handle].as_ref())
        {
            on_evict(&slot.key, &slot.value);
        }

        self.detach(handle);
        let slot = self.slots[handle]
            .take()
            .expect("recency list handle points at a live slot");
        self.index.remove(&slot.key);
        self.free.push(handle);

        self.stats.record_eviction();
        trace!(remaining = self.index.len(), "evicted least recently used entry");
    }

    // == List Plumbing ==
    /// Stores an entry in a recycled or fresh slot, still unlinked.
    fn alloc(&mut self, key: K, value: V) -> Handle {
        let slot = Slot {
            key,
            value,
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(slot);
                handle
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    /// Links an unlinked slot in at the head (most recently used).
    fn push_front(&mut self, handle: Handle) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(handle);
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            self.slot_mut(old_head).prev = handle;
        }
        self.head = handle;
        if self.tail == NIL {
            self.tail = handle;
        }
    }

    /// Unlinks a slot from the recency list, leaving it in the arena.
    fn detach(&mut self, handle: Handle) {
        let (prev, next) = {
            let slot = self.slot(handle);
            (slot.prev, slot.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.slot_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slot_mut(next).prev = prev;
        }
    }

    /// Moves an entry to the head of the recency list.
    fn promote(&mut self, handle: Handle) {
        if self.head == handle {
            return;
        }
        self.detach(handle);
        self.push_front(handle);
    }

    fn slot(&self, handle: Handle) -> &Slot<K, V> {
        self.slots[handle]
            .as_ref()
            .expect("recency list handle points at a live slot")
    }

    fn slot_mut(&mut self, handle: Handle) -> &mut Slot<K, V> {
        self.slots[handle]
            .as_mut()
            .expect("recency list handle points at a live slot")
    }
}

// == Debug ==
// Manual impl: the callback closure has no Debug.
impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .field("on_evict", &self.on_evict.is_some())
            .finish_non_exhaustive()
    }
}
