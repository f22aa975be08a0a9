//! Iteration over a `Dict`.
//!
//! - `DictIterator` is a detached cursor: it does not borrow the Dict
//!   between steps, so the caller may mutate the Dict while one is live.
//!   - Safe iterators suspend lazy rehash steps for their whole lifetime;
//!     the caller may add entries or delete the entry just returned.
//!   - Unsafe iterators allow no structural change. This is checked after
//!     the fact: `Dict::release_iterator` compares the Dict's fingerprint
//!     with the one taken at the first `next` and panics on mismatch.
//!   Both must be handed back through `Dict::release_iterator`; dropping a
//!   safe iterator without releasing it panics, since rehashing would
//!   otherwise stay suspended forever.
//! - `Iter` is the borrowing `std::iter::Iterator`; the borrow checker
//!   rules out mutation, so it needs neither counter nor fingerprint.
//!
//! Both walk `ht[0]` bucket by bucket and continue into `ht[1]` when a
//! rehash is pending. The successor of the yielded entry is captured
//! before the entry is returned; arena keys are generational, so a
//! successor removed in the meantime reads as end-of-chain instead of
//! dangling.

use tracing::error;

use crate::dict::Dict;
use crate::entry::{Entry, EntryKey};
use crate::hashing::mix64;

#[derive(Clone, Debug)]
struct Cursor {
    table: usize,
    /// Current bucket; `None` before the first advance.
    index: Option<usize>,
    entry: Option<EntryKey>,
    next_entry: Option<EntryKey>,
}

impl Cursor {
    const fn new() -> Self {
        Self {
            table: 0,
            index: None,
            entry: None,
            next_entry: None,
        }
    }

    fn advance<'a, K, V, P>(&mut self, dict: &'a Dict<K, V, P>) -> Option<&'a Entry<K, V>> {
        loop {
            let candidate = match self.entry {
                None => {
                    let mut index = self.index.map_or(0, |i| i + 1);
                    if index >= dict.ht[self.table].size() {
                        if dict.is_rehashing() && self.table == 0 {
                            self.table = 1;
                            index = 0;
                        } else {
                            self.index = Some(index);
                            return None;
                        }
                    }
                    self.index = Some(index);
                    dict.ht[self.table].buckets.get(index).copied().flatten()
                }
                Some(_) => self.next_entry,
            };
            self.entry = candidate;
            match candidate.and_then(|ek| dict.entries.get(ek)) {
                Some(entry) => {
                    self.next_entry = entry.next;
                    return Some(entry);
                }
                None => self.entry = None,
            }
        }
    }
}

/// Detached traversal cursor created by `Dict::iterator` or
/// `Dict::safe_iterator`.
#[derive(Debug)]
pub struct DictIterator {
    owner: u64,
    safe: bool,
    fingerprint: Option<u64>,
    released: bool,
    cursor: Cursor,
}

impl DictIterator {
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    /// Next entry, or `None` once every table has been walked.
    ///
    /// Panics if `dict` is not the Dict this iterator was created from.
    pub fn next<'a, K, V, P>(&mut self, dict: &'a Dict<K, V, P>) -> Option<&'a Entry<K, V>> {
        assert_eq!(
            self.owner, dict.id,
            "DictIterator used with a Dict it was not created from"
        );
        if !self.safe && self.fingerprint.is_none() {
            self.fingerprint = Some(dict.fingerprint());
        }
        self.cursor.advance(dict)
    }
}

impl Drop for DictIterator {
    fn drop(&mut self) {
        if self.safe && !self.released && !std::thread::panicking() {
            panic!("safe DictIterator dropped without Dict::release_iterator");
        }
    }
}

/// Borrowing iterator over every entry of a `Dict`.
pub struct Iter<'a, K, V, P = ()> {
    dict: &'a Dict<K, V, P>,
    cursor: Cursor,
    remaining: usize,
}

impl<'a, K, V, P> Iterator for Iter<'a, K, V, P> {
    type Item = &'a Entry<K, V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.advance(self.dict)?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, P> ExactSizeIterator for Iter<'a, K, V, P> {}

impl<'a, K, V, P> IntoIterator for &'a Dict<K, V, P> {
    type Item = &'a Entry<K, V>;
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, P> Dict<K, V, P> {
    /// Structural fingerprint: bucket-array identity, size and used count
    /// of both tables, mixed into one value. Any insert, delete, resize or
    /// rehash step changes it; value updates in place do not.
    pub fn fingerprint(&self) -> u64 {
        let parts = [
            self.ht[0].id,
            self.ht[0].size() as u64,
            self.ht[0].used as u64,
            self.ht[1].id,
            self.ht[1].size() as u64,
            self.ht[1].used as u64,
        ];
        parts
            .iter()
            .fold(0u64, |hash, &part| mix64(hash.wrapping_add(part)))
    }

    /// Unsafe iterator: no structural mutation allowed until released.
    pub fn iterator(&self) -> DictIterator {
        DictIterator {
            owner: self.id,
            safe: false,
            fingerprint: None,
            released: false,
            cursor: Cursor::new(),
        }
    }

    /// Safe iterator: lazy rehashing pauses until it is released.
    pub fn safe_iterator(&mut self) -> DictIterator {
        self.safe_iterators += 1;
        DictIterator {
            owner: self.id,
            safe: true,
            fingerprint: None,
            released: false,
            cursor: Cursor::new(),
        }
    }

    /// Hand an iterator back. Releasing a safe iterator resumes lazy
    /// rehashing once no other safe iterator is live. Releasing an unsafe
    /// iterator panics if the Dict was structurally modified since its
    /// first `next`. The panic stands in for a process abort: it is a
    /// caller bug, never a recoverable error, but unwinding lets tests and
    /// `panic = "abort"` builds each get the behavior they want.
    pub fn release_iterator(&mut self, mut it: DictIterator) {
        assert_eq!(
            it.owner, self.id,
            "DictIterator released to a Dict it was not created from"
        );
        it.released = true;
        if it.safe {
            self.safe_iterators -= 1;
        } else if let Some(expected) = it.fingerprint {
            let actual = self.fingerprint();
            if actual != expected {
                error!(expected, actual, "dict mutated during unsafe iteration");
                panic!("Dict structurally modified while an unsafe iterator was live");
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter {
            dict: self,
            cursor: Cursor::new(),
            remaining: self.len(),
        }
    }
}
