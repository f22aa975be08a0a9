//! rehash-dict: a single-threaded chained hash dictionary that grows and
//! shrinks without a stop-the-world pause.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: bound the latency of every call. Resizing allocates a second
//!   table and migrates entries a bucket at a time, piggybacking on
//!   ordinary traffic, instead of rehashing everything at once.
//! - Layers:
//!   - HashTable: power-of-two bucket array of chain heads plus a live
//!     count. Pure data.
//!   - Dict<K, V, P>: two HashTables over one slot arena of entries, a
//!     rehash cursor, a safe-iterator counter and a shared
//!     TypeDescriptor.
//!   - Rehash engine: growth policy, `expand`/`resize`, `rehash(n)` and
//!     the time-bounded `rehash_for`.
//!   - Read paths: `DictIterator` (safe/unsafe detached cursors), `Iter`
//!     (borrowing iterator) and `scan` (stateless cursor).
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (the descriptor is held by `Rc`).
//!   The progressive rehash bounds pause length; it is not a concurrency
//!   mechanism.
//! - `add`/`find`/`delete` each advance a pending rehash by one bucket,
//!   unless a safe iterator is outstanding.
//! - While idle every entry lives in `ht[0]` and `ht[1]` is unallocated.
//!   While rehashing, `ht[0]` buckets below the cursor are empty and new
//!   entries go to `ht[1]`.
//!
//! Entry storage
//! - Entries live in a `slotmap` arena; buckets and `next` links are
//!   arena keys. Unlinking is O(1) given the predecessor, and migration
//!   relinks keys without moving entries.
//! - Keys are generational, so an iterator's remembered "next" entry that
//!   was removed in the meantime reads as absent rather than dangling.
//!
//! TypeDescriptor
//! - Callers describe their key/value types with a `TypeDescriptor`:
//!   hash (required), optional duplicators, comparator and destructors,
//!   each receiving the Dict's private data `P`. Descriptors are shared
//!   through `Rc` across dictionaries.
//!
//! Failure model
//! - Recoverable conditions return `DictError`. Bucket arrays are
//!   allocated fallibly so a failed resize leaves the Dict untouched.
//! - Structural mutation under an unsafe iterator is a caller bug and
//!   panics at `release_iterator`.
//!
//! Notes and non-goals
//! - No thread safety, persistence or wire format.
//! - Scan may report an entry more than once; callers deduplicate.
//! - `random_key` is uniform over buckets, not over entries.

mod config;
mod dict;
#[cfg(test)]
mod dict_proptest;
mod entry;
mod error;
pub mod hashing;
mod iter;
mod rehash;
mod scan;
mod stats;
mod table;
mod type_descriptor;

// Public surface
pub use config::{DictConfig, DICT_FORCE_RESIZE_RATIO, DICT_HT_INITIAL_SIZE, DICT_REHASH_CHUNK};
pub use dict::{Dict, Replaced};
pub use entry::{Entry, Value};
pub use error::DictError;
pub use iter::{DictIterator, Iter};
pub use stats::{DictStats, TableStats, DICT_STATS_VECTLEN};
pub use type_descriptor::{
    BytesDescriptor, CaseInsensitiveDescriptor, HashDescriptor, TypeDescriptor,
};
