//! Dict: two chained hash tables sharing one entry arena, with lookups and
//! mutations that each advance a pending rehash by one bucket.

use core::hash::Hash;
use core::mem;
use core::sync::atomic::{AtomicU64, Ordering};
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

use crate::config::DictConfig;
use crate::entry::{Entry, EntryKey, Value};
use crate::error::DictError;
use crate::table::HashTable;
use crate::type_descriptor::{HashDescriptor, TypeDescriptor};

static NEXT_DICT_ID: AtomicU64 = AtomicU64::new(1);

/// Chained hash dictionary with progressive rehashing.
///
/// Entries live in a slot arena; each table's buckets hold the arena key of
/// their chain head. While rehashing, `ht[0]` holds entries not yet
/// migrated and `ht[1]` holds migrated or newly inserted ones.
pub struct Dict<K, V, P = ()> {
    pub(crate) dtype: Rc<dyn TypeDescriptor<K, V, P>>,
    pub(crate) privdata: P,
    pub(crate) entries: SlotMap<EntryKey, Entry<K, V>>,
    pub(crate) ht: [HashTable; 2],
    /// Next `ht[0]` bucket to migrate; `None` while idle.
    pub(crate) rehash_idx: Option<usize>,
    pub(crate) safe_iterators: usize,
    pub(crate) config: DictConfig,
    pub(crate) rng: SmallRng,
    pub(crate) id: u64,
}

/// Outcome of `Dict::replace`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Replaced {
    Inserted,
    Updated,
}

/// Where a key was found: table, bucket, chain predecessor and the entry.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Location {
    pub(crate) table: usize,
    pub(crate) bucket: usize,
    pub(crate) prev: Option<EntryKey>,
    pub(crate) entry: EntryKey,
}

/// Walks one bucket chain.
pub(crate) struct Chain<'a, K, V> {
    entries: &'a SlotMap<EntryKey, Entry<K, V>>,
    cur: Option<EntryKey>,
}

impl<'a, K, V> Chain<'a, K, V> {
    pub(crate) fn new(entries: &'a SlotMap<EntryKey, Entry<K, V>>, head: Option<EntryKey>) -> Self {
        Self { entries, cur: head }
    }
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = &'a Entry<K, V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.cur?)?;
        self.cur = entry.next;
        Some(entry)
    }
}

impl<K, V> Dict<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_config(DictConfig::default())
    }

    pub fn with_config(config: DictConfig) -> Self {
        let dtype: Rc<HashDescriptor> = Rc::new(HashDescriptor::default());
        Dict::with_type_and_config(dtype, (), config)
    }
}

impl<K, V> Default for Dict<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P> Dict<K, V, P> {
    pub fn with_type(dtype: Rc<dyn TypeDescriptor<K, V, P>>, privdata: P) -> Self {
        Self::with_type_and_config(dtype, privdata, DictConfig::default())
    }

    /// Both tables start unallocated; the first insert allocates `ht[0]`.
    pub fn with_type_and_config(
        dtype: Rc<dyn TypeDescriptor<K, V, P>>,
        privdata: P,
        config: DictConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self {
            dtype,
            privdata,
            entries: SlotMap::with_key(),
            ht: [HashTable::unallocated(), HashTable::unallocated()],
            rehash_idx: None,
            safe_iterators: 0,
            config,
            rng,
            id: NEXT_DICT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.ht[0].used + self.ht[1].used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bucket count across both tables.
    pub fn slots(&self) -> usize {
        self.ht[0].size() + self.ht[1].size()
    }

    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx.is_some()
    }

    pub fn rehash_index(&self) -> Option<usize> {
        self.rehash_idx
    }

    /// Bucket count of table `table` (0 or 1); 0 when unallocated.
    pub fn table_size(&self, table: usize) -> usize {
        self.ht[table].size()
    }

    pub fn table_used(&self, table: usize) -> usize {
        self.ht[table].used
    }

    pub fn safe_iterators(&self) -> usize {
        self.safe_iterators
    }

    pub fn privdata(&self) -> &P {
        &self.privdata
    }

    pub fn type_descriptor(&self) -> &Rc<dyn TypeDescriptor<K, V, P>> {
        &self.dtype
    }

    pub fn enable_resize(&mut self) {
        self.config.resize_enabled = true;
    }

    pub fn disable_resize(&mut self) {
        self.config.resize_enabled = false;
    }

    pub fn resize_enabled(&self) -> bool {
        self.config.resize_enabled
    }

    pub fn config(&self) -> &DictConfig {
        &self.config
    }

    /// Remove every entry, running the descriptor's destructors.
    pub fn clear(&mut self) {
        self.clear_with(|_| {});
    }

    /// Like `clear`, calling `callback(privdata)` every 65536 buckets so a
    /// caller can keep serving other work while a huge table is freed.
    pub fn clear_with<F>(&mut self, mut callback: F)
    where
        F: FnMut(&P),
    {
        for table in 0..2 {
            let buckets = mem::take(&mut self.ht[table].buckets);
            for (i, head) in buckets.into_iter().enumerate() {
                if i & 0xffff == 0 {
                    callback(&self.privdata);
                }
                let mut cur = head;
                while let Some(ek) = cur {
                    let Some(entry) = self.entries.remove(ek) else {
                        break;
                    };
                    cur = entry.next;
                    self.free_pair(entry.key, entry.value);
                }
            }
            self.ht[table] = HashTable::unallocated();
        }
        self.rehash_idx = None;
        debug_assert!(self.entries.is_empty());
        self.entries.clear();
    }

    pub(crate) fn chain(&self, head: Option<EntryKey>) -> Chain<'_, K, V> {
        Chain::new(&self.entries, head)
    }

    pub(crate) fn free_pair(&self, key: K, value: Value<V>) {
        self.dtype.key_destructor(&self.privdata, key);
        self.free_value(value);
    }

    pub(crate) fn free_value(&self, value: Value<V>) {
        if let Value::Ref(v) = value {
            self.dtype.val_destructor(&self.privdata, v);
        }
    }

    fn dup_value(&self, value: Value<V>) -> Value<V> {
        match value {
            Value::Ref(v) => Value::Ref(self.dtype.val_dup(&self.privdata, &v).unwrap_or(v)),
            inline => inline,
        }
    }

    /// Prepend a new entry to its bucket in the table currently receiving
    /// inserts. The key must not be present.
    fn link_new(&mut self, key: K, value: Value<V>) -> EntryKey {
        let hash = self.dtype.hash(&key);
        let key = self.dtype.key_dup(&self.privdata, &key).unwrap_or(key);
        let value = self.dup_value(value);
        let ht = &mut self.ht[usize::from(self.rehash_idx.is_some())];
        let bucket = ht.bucket_of(hash);
        let ek = self.entries.insert(Entry {
            key,
            value,
            next: ht.buckets[bucket],
        });
        ht.buckets[bucket] = Some(ek);
        ht.used += 1;
        ek
    }

    /// Unlink a located entry from its chain and take it out of the arena.
    fn detach(&mut self, loc: Location) -> Entry<K, V> {
        let entry = self
            .entries
            .remove(loc.entry)
            .expect("located entry must be live");
        match loc.prev {
            Some(prev) => self.entries[prev].next = entry.next,
            None => self.ht[loc.table].buckets[loc.bucket] = entry.next,
        }
        self.ht[loc.table].used -= 1;
        entry
    }
}

impl<K, V, P> Dict<K, V, P>
where
    K: Eq,
{
    #[inline]
    fn keys_match(&self, a: &K, b: &K) -> bool {
        self.dtype
            .key_compare(&self.privdata, a, b)
            .unwrap_or_else(|| a == b)
    }

    /// Search `ht[0]`, then `ht[1]` if a rehash is pending. Never steps.
    pub(crate) fn locate(&self, key: &K) -> Option<Location> {
        if !self.ht[0].is_allocated() {
            return None;
        }
        let hash = self.dtype.hash(key);
        for table in 0..2 {
            let ht = &self.ht[table];
            let bucket = ht.bucket_of(hash);
            let mut prev = None;
            let mut cur = ht.buckets[bucket];
            while let Some(ek) = cur {
                let entry = &self.entries[ek];
                if self.keys_match(key, &entry.key) {
                    return Some(Location {
                        table,
                        bucket,
                        prev,
                        entry: ek,
                    });
                }
                prev = cur;
                cur = entry.next;
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    /// Insert a new key. Fails with `KeyExists` if the key is present.
    pub fn add(&mut self, key: K, value: Value<V>) -> Result<(), DictError> {
        if self.is_rehashing() {
            self.rehash_step();
        }
        self.expand_if_needed()?;
        if self.locate(&key).is_some() {
            return Err(DictError::KeyExists);
        }
        self.link_new(key, value);
        Ok(())
    }

    /// Insert or overwrite. The previous value is released only after the
    /// new one is installed, so a duplicator that aliases old and new
    /// never observes a destroyed value.
    pub fn replace(&mut self, key: K, value: Value<V>) -> Result<Replaced, DictError> {
        if self.is_rehashing() {
            self.rehash_step();
        }
        self.expand_if_needed()?;
        match self.locate(&key) {
            Some(loc) => {
                let value = self.dup_value(value);
                let old = mem::replace(&mut self.entries[loc.entry].value, value);
                self.free_value(old);
                Ok(Replaced::Updated)
            }
            None => {
                self.link_new(key, value);
                Ok(Replaced::Inserted)
            }
        }
    }

    /// Rehash-aware lookup; advances a pending rehash by one bucket.
    pub fn find(&mut self, key: &K) -> Option<&Entry<K, V>> {
        if !self.ht[0].is_allocated() {
            return None;
        }
        if self.is_rehashing() {
            self.rehash_step();
        }
        let loc = self.locate(key)?;
        Some(&self.entries[loc.entry])
    }

    /// Lookup that leaves the structure untouched (no rehash step), for
    /// read-only contexts such as an outstanding unsafe iterator.
    pub fn get(&self, key: &K) -> Option<&Entry<K, V>> {
        self.locate(key).map(|loc| &self.entries[loc.entry])
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    pub fn fetch_value(&mut self, key: &K) -> Option<&Value<V>> {
        self.find(key).map(Entry::value)
    }

    /// Remove `key`, running the key and value destructors.
    pub fn delete(&mut self, key: &K) -> Result<(), DictError> {
        let (key, value) = self.unlink(key)?;
        self.free_pair(key, value);
        Ok(())
    }

    /// Remove `key` without running destructors; ownership of the stored
    /// key and value passes to the caller.
    pub fn unlink(&mut self, key: &K) -> Result<(K, Value<V>), DictError> {
        if !self.ht[0].is_allocated() {
            return Err(DictError::NotFound);
        }
        if self.is_rehashing() {
            self.rehash_step();
        }
        let loc = self.locate(key).ok_or(DictError::NotFound)?;
        let entry = self.detach(loc);
        Ok((entry.key, entry.value))
    }

    /// A random entry, chosen by picking a random non-empty bucket and then
    /// a random position in its chain.
    ///
    /// Sampling is uniform over buckets, not over entries: keys sharing a
    /// long chain are each less likely to be returned than a key alone in
    /// its bucket.
    pub fn random_key(&mut self) -> Option<&Entry<K, V>> {
        if self.is_empty() {
            return None;
        }
        if self.is_rehashing() {
            self.rehash_step();
        }
        let head = match self.rehash_idx {
            // ht[0] buckets below the rehash index are empty, skip them.
            Some(idx) => loop {
                let s0 = self.ht[0].size();
                let h = idx + self.rng.random_range(0..s0 + self.ht[1].size() - idx);
                let head = if h >= s0 {
                    self.ht[1].buckets[h - s0]
                } else {
                    self.ht[0].buckets[h]
                };
                if head.is_some() {
                    break head;
                }
            },
            None => loop {
                let h = self.rng.random_range(0..self.ht[0].size());
                let head = self.ht[0].buckets[h];
                if head.is_some() {
                    break head;
                }
            },
        };
        let len = self.chain(head).count();
        let pick = self.rng.random_range(0..len);
        Chain::new(&self.entries, head).nth(pick)
    }

    /// Up to `count` distinct entries gathered by walking each table
    /// linearly from a random bucket. Fast, not uniform: neighbouring
    /// buckets are returned together. Returns `min(count, len())` entries.
    pub fn random_keys(&mut self, count: usize) -> Vec<&Entry<K, V>> {
        let count = count.min(self.len());
        if count == 0 {
            return Vec::new();
        }
        for _ in 0..count {
            if !self.is_rehashing() {
                break;
            }
            self.rehash_step();
        }

        let tables = if self.is_rehashing() { 2 } else { 1 };
        let starts = [
            self.rng.random_range(0..=self.ht[0].mask),
            self.rng.random_range(0..=self.ht[1].mask),
        ];
        let mut out = Vec::with_capacity(count);
        'tables: for (table, &start) in starts.iter().enumerate().take(tables) {
            let ht = &self.ht[table];
            for step in 0..ht.size() {
                let i = (start + step) & ht.mask;
                if table == 0 && self.rehash_idx.is_some_and(|idx| i < idx) {
                    continue;
                }
                for entry in Chain::new(&self.entries, ht.buckets[i]) {
                    out.push(entry);
                    if out.len() == count {
                        break 'tables;
                    }
                }
            }
        }
        out
    }
}

impl<K, V, P> Drop for Dict<K, V, P> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
impl<K, V, P> Dict<K, V, P> {
    /// Structural invariants: chain placement, used counts, idle/rehash
    /// table layout, emptiness of already-migrated buckets.
    pub(crate) fn check_invariants(&self) {
        let mut total = 0;
        for table in 0..2 {
            let ht = &self.ht[table];
            let mut used = 0;
            for (i, &head) in ht.buckets.iter().enumerate() {
                for entry in self.chain(head) {
                    let hash = self.dtype.hash(&entry.key);
                    assert_eq!(ht.bucket_of(hash), i, "entry in wrong bucket");
                    used += 1;
                }
                if table == 0 {
                    if let Some(idx) = self.rehash_idx {
                        if i < idx {
                            assert!(head.is_none(), "migrated bucket not empty");
                        }
                    }
                }
            }
            assert_eq!(used, ht.used, "used count drift in table {table}");
            total += used;
        }
        assert_eq!(total, self.entries.len());
        if !self.is_rehashing() {
            assert!(!self.ht[1].is_allocated());
        }
    }
}
