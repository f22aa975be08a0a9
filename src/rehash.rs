//! Rehash engine: table allocation, growth policy and the incremental
//! bucket-by-bucket migration from `ht[0]` to `ht[1]`.

use core::mem;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::config::DICT_HT_INITIAL_SIZE;
use crate::dict::Dict;
use crate::error::DictError;
use crate::table::HashTable;

/// Smallest power of two that is at least `max(size, DICT_HT_INITIAL_SIZE)`.
fn next_power(size: usize) -> Result<usize, DictError> {
    size.max(DICT_HT_INITIAL_SIZE)
        .checked_next_power_of_two()
        .ok_or(DictError::AllocationFailed { buckets: size })
}

impl<K, V, P> Dict<K, V, P> {
    /// Allocate a table for at least `size` entries. With no table yet it
    /// becomes `ht[0]` directly; otherwise it becomes the rehash target.
    pub fn expand(&mut self, size: usize) -> Result<(), DictError> {
        if self.is_rehashing() {
            return Err(DictError::AlreadyRehashing);
        }
        if self.ht[0].used > size {
            return Err(DictError::SizeTooSmall {
                requested: size,
                used: self.ht[0].used,
            });
        }
        let table = HashTable::with_size(next_power(size)?)?;
        if !self.ht[0].is_allocated() {
            debug!(size = table.size(), "dict table allocated");
            self.ht[0] = table;
        } else {
            debug!(
                from = self.ht[0].size(),
                to = table.size(),
                used = self.ht[0].used,
                "dict rehash started"
            );
            self.ht[1] = table;
            self.rehash_idx = Some(0);
        }
        Ok(())
    }

    /// Shrink (or grow) to the smallest table holding every entry at load
    /// factor <= 1.
    pub fn resize(&mut self) -> Result<(), DictError> {
        if !self.config.resize_enabled {
            return Err(DictError::ResizeDisabled);
        }
        if self.is_rehashing() {
            return Err(DictError::AlreadyRehashing);
        }
        self.expand(self.ht[0].used.max(DICT_HT_INITIAL_SIZE))
    }

    /// Growth policy, checked before every insert: grow at load factor 1
    /// when resizing is enabled, or past the force ratio regardless.
    pub(crate) fn expand_if_needed(&mut self) -> Result<(), DictError> {
        if self.is_rehashing() {
            return Ok(());
        }
        if !self.ht[0].is_allocated() {
            return self.expand(DICT_HT_INITIAL_SIZE);
        }
        let used = self.ht[0].used;
        let size = self.ht[0].size();
        if used >= size
            && (self.config.resize_enabled || used / size > self.config.force_resize_ratio)
        {
            return self.expand(used.saturating_mul(2));
        }
        Ok(())
    }

    /// Migrate up to `n` non-empty buckets from `ht[0]` to `ht[1]`.
    ///
    /// Returns `true` while entries remain to be moved. The call that finds
    /// `ht[0]` empty swaps the target table into place and returns `false`.
    pub fn rehash(&mut self, n: usize) -> bool {
        let Some(mut idx) = self.rehash_idx else {
            return false;
        };
        for _ in 0..n {
            if self.ht[0].used == 0 {
                self.ht[0] = mem::replace(&mut self.ht[1], HashTable::unallocated());
                self.rehash_idx = None;
                debug!(size = self.ht[0].size(), used = self.ht[0].used, "dict rehash finished");
                return false;
            }

            // ht[0] still holds entries, so a non-empty bucket exists at or
            // past idx.
            debug_assert!(idx < self.ht[0].size());
            while self.ht[0].buckets[idx].is_none() {
                idx += 1;
            }

            let mut cur = self.ht[0].buckets[idx].take();
            while let Some(ek) = cur {
                let entry = &mut self.entries[ek];
                cur = entry.next;
                let bucket = self.ht[1].bucket_of(self.dtype.hash(&entry.key));
                entry.next = self.ht[1].buckets[bucket];
                self.ht[1].buckets[bucket] = Some(ek);
                self.ht[0].used -= 1;
                self.ht[1].used += 1;
            }
            idx += 1;
            self.rehash_idx = Some(idx);
        }
        true
    }

    /// Rehash in chunks of `config.rehash_chunk` buckets until done or
    /// `budget` has elapsed. At least one chunk always runs, so progress is
    /// made even with a zero budget; a chunk is never interrupted.
    /// Returns the number of bucket migrations attempted.
    pub fn rehash_for(&mut self, budget: Duration) -> usize {
        let start = Instant::now();
        // The field is public; a zero chunk would spin without migrating.
        let chunk = self.config.rehash_chunk.max(1);
        let mut rehashes = 0;
        while self.rehash(chunk) {
            rehashes += chunk;
            if start.elapsed() > budget {
                break;
            }
        }
        trace!(rehashes, elapsed = ?start.elapsed(), "dict bounded rehash");
        rehashes
    }

    /// One lazy migration step, skipped while safe iterators are
    /// outstanding so their view of the two tables stays fixed.
    #[inline]
    pub(crate) fn rehash_step(&mut self) {
        if self.safe_iterators == 0 {
            self.rehash(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DictConfig;
    use crate::{Dict, DictError, Value};

    fn filled(n: u64) -> Dict<u64, ()> {
        let mut d = Dict::new();
        for i in 0..n {
            d.add(i, Value::U64(i)).unwrap();
        }
        d
    }

    #[test]
    fn next_power_respects_minimum() {
        assert_eq!(super::next_power(0).unwrap(), 4);
        assert_eq!(super::next_power(5).unwrap(), 8);
        assert_eq!(super::next_power(16).unwrap(), 16);
        assert!(super::next_power(usize::MAX).is_err());
    }

    /// Invariant: expand refuses while rehashing and below the live count.
    #[test]
    fn expand_preconditions() {
        let mut d = filled(4);
        assert_eq!(
            d.expand(2),
            Err(DictError::SizeTooSmall {
                requested: 2,
                used: 4
            })
        );
        d.expand(64).unwrap();
        assert!(d.is_rehashing());
        assert_eq!(d.table_size(1), 64);
        assert_eq!(d.expand(128), Err(DictError::AlreadyRehashing));
        assert_eq!(d.resize(), Err(DictError::AlreadyRehashing));
    }

    /// Invariant: a rehash finishes with every entry in `ht[0]`, `ht[1]`
    /// unallocated and the cursor idle.
    #[test]
    fn rehash_runs_to_completion() {
        let mut d = filled(100);
        while d.rehash(1) {}
        d.expand(1024).unwrap();
        let mut steps = 0;
        while d.rehash(1) {
            steps += 1;
            d.check_invariants();
        }
        assert!(steps > 0);
        assert!(!d.is_rehashing());
        assert_eq!(d.table_size(0), 1024);
        assert_eq!(d.table_size(1), 0);
        assert_eq!(d.len(), 100);
        for i in 0..100 {
            assert!(d.contains_key(&i));
        }
    }

    /// Invariant: the cursor only moves forward and skips empty buckets.
    #[test]
    fn rehash_cursor_advances_monotonically() {
        let mut d = filled(40);
        while d.rehash(1) {}
        d.expand(512).unwrap();
        let mut last = 0;
        while let Some(idx) = d.rehash_index() {
            assert!(idx >= last);
            last = idx;
            d.rehash(1);
        }
    }

    /// Invariant: shrinking picks the smallest power of two >= used.
    #[test]
    fn resize_shrinks_to_fit() {
        let mut d = filled(200);
        while d.rehash(100) {}
        for i in 0..190 {
            d.delete(&i).unwrap();
        }
        while d.rehash(100) {}
        d.resize().unwrap();
        assert_eq!(d.table_size(1), 16);
        while d.rehash(100) {}
        assert_eq!(d.table_size(0), 16);
        assert_eq!(d.len(), 10);
        d.check_invariants();
    }

    #[test]
    fn resize_refused_when_disabled() {
        let mut d: Dict<u64, ()> = Dict::with_config(DictConfig::new().resize_enabled(false));
        d.add(1, Value::U64(1)).unwrap();
        assert_eq!(d.resize(), Err(DictError::ResizeDisabled));
        d.enable_resize();
        assert_eq!(d.resize(), Ok(()));
    }
}
