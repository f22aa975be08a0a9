//! Resize policy and tunables injected into each `Dict`.

/// Smallest bucket array ever allocated; every table size is a power of
/// two at least this large.
pub const DICT_HT_INITIAL_SIZE: usize = 4;

/// Load factor above which a table grows even when resizing is disabled.
pub const DICT_FORCE_RESIZE_RATIO: usize = 5;

/// Buckets migrated per chunk by `Dict::rehash_for`.
pub const DICT_REHASH_CHUNK: usize = 100;

/// Per-instance policy. Replaces process-wide resize switches so that two
/// dictionaries in one process can follow different policies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DictConfig {
    /// Proactive growth at load factor 1. When false, tables only grow
    /// once `used / size > force_resize_ratio`, and `resize` is refused.
    pub resize_enabled: bool,
    pub force_resize_ratio: usize,
    pub rehash_chunk: usize,
    /// Seed for the sampling RNG; `None` draws one from the thread RNG.
    pub rng_seed: Option<u64>,
}

impl DictConfig {
    pub fn new() -> Self {
        Self {
            resize_enabled: true,
            force_resize_ratio: DICT_FORCE_RESIZE_RATIO,
            rehash_chunk: DICT_REHASH_CHUNK,
            rng_seed: None,
        }
    }

    pub fn resize_enabled(mut self, enabled: bool) -> Self {
        self.resize_enabled = enabled;
        self
    }

    pub fn force_resize_ratio(mut self, ratio: usize) -> Self {
        self.force_resize_ratio = ratio;
        self
    }

    pub fn rehash_chunk(mut self, buckets: usize) -> Self {
        self.rehash_chunk = buckets.max(1);
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

impl Default for DictConfig {
    fn default() -> Self {
        Self::new()
    }
}
