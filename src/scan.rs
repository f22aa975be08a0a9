//! Stateless full-dictionary scan addressed by an opaque cursor.
//!
//! The cursor is advanced by incrementing its *reversed* bits: the high
//! bits of the bucket index change fastest. When a table doubles, bucket
//! `i` splits into `i` and `i | size`; when it halves, those two merge.
//! Walking indices in reverse-bit order means every bucket already visited
//! at one size maps onto buckets that are also already visited at the
//! other size, so entries present for the whole scan are never skipped.
//! An entry may be reported more than once.

use crate::dict::Dict;
use crate::entry::Entry;
use crate::table::HashTable;

/// Reverse-binary increment of the bits covered by `mask`.
#[inline]
fn next_cursor(cursor: u64, mask: u64) -> u64 {
    (cursor | !mask).reverse_bits().wrapping_add(1).reverse_bits()
}

impl<K, V, P> Dict<K, V, P> {
    /// Visit the entries of the bucket(s) addressed by `cursor` and return
    /// the cursor for the next call. Start with 0; a returned 0 means the
    /// scan is complete.
    ///
    /// Every entry present from the first call to the last is visited at
    /// least once, even if the Dict grows, shrinks or rehashes between
    /// calls. `visit` must not mutate the Dict (it is given shared access).
    pub fn scan<F>(&self, cursor: u64, mut visit: F) -> u64
    where
        F: FnMut(&Entry<K, V>),
    {
        if self.is_empty() {
            return 0;
        }
        let mut v = cursor;
        if !self.is_rehashing() {
            let t0 = &self.ht[0];
            let m0 = t0.mask as u64;
            self.visit_bucket(t0, (v & m0) as usize, &mut visit);
            return next_cursor(v, m0);
        }

        let (t0, t1) = if self.ht[0].size() <= self.ht[1].size() {
            (&self.ht[0], &self.ht[1])
        } else {
            (&self.ht[1], &self.ht[0])
        };
        let m0 = t0.mask as u64;
        let m1 = t1.mask as u64;

        self.visit_bucket(t0, (v & m0) as usize, &mut visit);

        // Every bucket of the larger table that the smaller table's bucket
        // expands into: same low bits, each combination of the extra bits.
        loop {
            self.visit_bucket(t1, (v & m1) as usize, &mut visit);
            v = ((v | m0).wrapping_add(1) & !m0) | (v & m0);
            if v & (m0 ^ m1) == 0 {
                break;
            }
        }

        next_cursor(v, m0)
    }

    fn visit_bucket<F>(&self, table: &HashTable, bucket: usize, visit: &mut F)
    where
        F: FnMut(&Entry<K, V>),
    {
        for entry in self.chain(table.buckets[bucket]) {
            visit(entry);
        }
    }
}
