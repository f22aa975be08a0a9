//! Hash functions for building `TypeDescriptor`s, plus the integer mix
//! used by the structural fingerprint.
//!
//! The byte hashes take their seed explicitly; there is no process-wide
//! seed. `DEFAULT_HASH_SEED` is the conventional starting value.

/// Seed used by the ready-made byte descriptors unless told otherwise.
pub const DEFAULT_HASH_SEED: u32 = 5381;

/// Thomas Wang's 32-bit integer mix.
#[inline]
pub fn int_hash(mut key: u32) -> u32 {
    key = key.wrapping_add(!(key << 15));
    key ^= key >> 10;
    key = key.wrapping_add(key << 3);
    key ^= key >> 6;
    key = key.wrapping_add(!(key << 11));
    key ^= key >> 16;
    key
}

/// Identity hash for integer keys that are already well distributed.
#[inline]
pub fn identity_hash(key: u32) -> u32 {
    key
}

/// MurmurHash2 (Austin Appleby) over `key`, reading 4-byte blocks as
/// little-endian words so results do not depend on the host byte order.
pub fn gen_hash(key: &[u8], seed: u32) -> u32 {
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let mut h = seed ^ (key.len() as u32);
    let mut blocks = key.chunks_exact(4);
    for block in &mut blocks {
        let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = blocks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Case-insensitive djb2 hash: ASCII letters are folded to lowercase.
pub fn gen_case_hash(buf: &[u8], seed: u32) -> u32 {
    buf.iter().fold(seed, |hash, &b| {
        (hash << 5)
            .wrapping_add(hash)
            .wrapping_add(b.to_ascii_lowercase() as u32)
    })
}

/// Thomas Wang's 64-bit mix; folds the fingerprint inputs together.
#[inline]
pub(crate) fn mix64(mut key: u64) -> u64 {
    key = (!key).wrapping_add(key << 21);
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8);
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4);
    key ^= key >> 28;
    key.wrapping_add(key << 31)
}
