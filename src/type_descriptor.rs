//! TypeDescriptor: the capability bundle a `Dict` uses to handle its keys
//! and values.
//!
//! Only `hash` is mandatory. Every other hook has a default that means
//! "capability absent": no duplication, comparison through `K: Eq`, and a
//! plain drop on destruction. A descriptor is shared through `Rc` so several
//! dictionaries can use the same one; the private-data value `P` lives in
//! each `Dict` and is passed to every hook that accepts it.

use core::hash::{BuildHasher, Hash};
use hashbrown::DefaultHashBuilder;

use crate::hashing::{gen_case_hash, gen_hash, DEFAULT_HASH_SEED};

pub trait TypeDescriptor<K, V, P = ()> {
    fn hash(&self, key: &K) -> u64;

    /// Copy stored on insert instead of the caller's key. `None` stores
    /// the key that was passed in.
    fn key_dup(&self, _privdata: &P, _key: &K) -> Option<K> {
        None
    }

    /// Copy stored on insert/replace instead of the caller's value.
    fn val_dup(&self, _privdata: &P, _value: &V) -> Option<V> {
        None
    }

    /// Key equality. `None` defers to `K: Eq`.
    fn key_compare(&self, _privdata: &P, _a: &K, _b: &K) -> Option<bool> {
        None
    }

    fn key_destructor(&self, _privdata: &P, key: K) {
        drop(key);
    }

    fn val_destructor(&self, _privdata: &P, value: V) {
        drop(value);
    }
}

/// Descriptor for any `K: Hash`, hashing through a `BuildHasher`
/// (hashbrown's default hasher unless another is supplied).
#[derive(Clone, Debug, Default)]
pub struct HashDescriptor<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S: BuildHasher> HashDescriptor<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<K, V, P, S> TypeDescriptor<K, V, P> for HashDescriptor<S>
where
    K: Hash,
    S: BuildHasher,
{
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }
}

/// MurmurHash2 over the key's bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BytesDescriptor {
    pub seed: u32,
}

impl Default for BytesDescriptor {
    fn default() -> Self {
        Self {
            seed: DEFAULT_HASH_SEED,
        }
    }
}

impl<K, V, P> TypeDescriptor<K, V, P> for BytesDescriptor
where
    K: AsRef<[u8]>,
{
    fn hash(&self, key: &K) -> u64 {
        gen_hash(key.as_ref(), self.seed) as u64
    }
}

/// Keys that differ only in ASCII case are the same key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CaseInsensitiveDescriptor {
    pub seed: u32,
}

impl Default for CaseInsensitiveDescriptor {
    fn default() -> Self {
        Self {
            seed: DEFAULT_HASH_SEED,
        }
    }
}

impl<K, V, P> TypeDescriptor<K, V, P> for CaseInsensitiveDescriptor
where
    K: AsRef<[u8]>,
{
    fn hash(&self, key: &K) -> u64 {
        gen_case_hash(key.as_ref(), self.seed) as u64
    }

    fn key_compare(&self, _privdata: &P, a: &K, b: &K) -> Option<bool> {
        Some(a.as_ref().eq_ignore_ascii_case(b.as_ref()))
    }
}
