//! HashTable: a power-of-two bucket array of chain heads.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::entry::EntryKey;
use crate::error::DictError;

// Distinguishes bucket arrays for the fingerprint; 0 marks "unallocated".
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub(crate) struct HashTable {
    pub(crate) buckets: Vec<Option<EntryKey>>,
    pub(crate) mask: usize,
    pub(crate) used: usize,
    pub(crate) id: u64,
}

impl HashTable {
    pub(crate) const fn unallocated() -> Self {
        Self {
            buckets: Vec::new(),
            mask: 0,
            used: 0,
            id: 0,
        }
    }

    /// Allocate `size` empty buckets; `size` must be a power of two.
    pub(crate) fn with_size(size: usize) -> Result<Self, DictError> {
        debug_assert!(size.is_power_of_two());
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(size)
            .map_err(|_| DictError::AllocationFailed { buckets: size })?;
        buckets.resize(size, None);
        Ok(Self {
            buckets,
            mask: size - 1,
            used: 0,
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn is_allocated(&self) -> bool {
        !self.buckets.is_empty()
    }

    #[inline]
    pub(crate) fn bucket_of(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }
}
