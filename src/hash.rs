//! The two hash families used throughout the sketches: `AwareHash`, a 64-bit
//! rolling multiply-add hash with deterministic instance seeding, and
//! `BOBHash32`, Bob Jenkins' lookup3 adaptation returning 32-bit values.

use crate::flowkey::FlowKey;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::OnceLock;

const MANGLE_MAGIC: u64 = 2_083_697_005;

/// Common interface for the hash family used by the primitive sketches
/// (`BloomFilter`, `BitBf`, `CMSketch`). Only `AwareHash` implements it; the
/// type parameter exists so those sketches stay generic the way the
/// original's `hash_t` template parameter does.
pub trait HashFamily: Default + Clone + PartialEq {
    fn hash_flowkey(&self, key: &FlowKey) -> u64;
}

impl HashFamily for AwareHash {
    fn hash_flowkey(&self, key: &FlowKey) -> u64 {
        AwareHash::hash_flowkey(self, key)
    }
}

/// Byte-swap the first half of `key`'s little-endian representation with the
/// second half, then multiply by the fixed magic constant. Mirrors the
/// original generator's `Mangle<T>`.
fn mangle(key: u64) -> u64 {
    let mut bytes = key.to_le_bytes();
    let n = bytes.len();
    for i in 0..(n / 2) {
        bytes.swap(i, n - 1 - i);
    }
    u64::from_le_bytes(bytes).wrapping_mul(MANGLE_MAGIC)
}

/// A 64-bit rolling hash: `h = init; for b in bytes { h = h*scale + b }; h ^ hardener`.
#[derive(Clone, Copy, Debug)]
pub struct AwareHash {
    init: u64,
    scale: u64,
    hardener: u64,
}

impl AwareHash {
    /// Construct with an explicit fixed triple (used only to seed the
    /// process-wide generator instance).
    fn with_triple(init: u64, scale: u64, hardener: u64) -> Self {
        Self {
            init,
            scale,
            hardener,
        }
    }

    pub fn hash_bytes(&self, data: &[u8]) -> u64 {
        let mut result = self.init;
        for &b in data {
            result = result.wrapping_mul(self.scale);
            result = result.wrapping_add(b as u64);
        }
        result ^ self.hardener
    }

    pub fn hash_flowkey(&self, key: &FlowKey) -> u64 {
        self.hash_bytes(key.as_bytes())
    }
}

impl PartialEq for AwareHash {
    fn eq(&self, other: &Self) -> bool {
        self.init == other.init && self.scale == other.scale && self.hardener == other.hardener
    }
}
impl Eq for AwareHash {}

fn generator() -> &'static AwareHash {
    static GEN: OnceLock<AwareHash> = OnceLock::new();
    GEN.get_or_init(|| AwareHash::with_triple(388_650_253, 388_650_319, 1_176_845_762))
}

/// Running index into the deterministic seed stream; wraps at 18 (three
/// words consumed per default-constructed instance, six instances per period).
static SEED_INDEX: AtomicU64 = AtomicU64::new(0);
const SEED_BASE: u64 = 3407;

fn next_seed_triple() -> (u64, u64, u64) {
    let base = SEED_INDEX.load(Ordering::Relaxed);
    let next = (base + 3) % 18;
    SEED_INDEX.store(next, Ordering::Relaxed);

    let gen = generator();
    let init = gen.hash_bytes(&mangle(SEED_BASE + base).to_le_bytes());
    let scale = gen.hash_bytes(&mangle(SEED_BASE + base + 1).to_le_bytes());
    let hardener = gen.hash_bytes(&mangle(SEED_BASE + base + 2).to_le_bytes());
    (init, scale, hardener)
}

impl Default for AwareHash {
    /// The *k*-th default-constructed `AwareHash` in process order is
    /// identical across runs: seeds are drawn from a fixed counter-seeded
    /// generator, not from any source of real randomness.
    fn default() -> Self {
        let (init, scale, hardener) = next_seed_triple();
        Self {
            init,
            scale,
            hardener,
        }
    }
}

/// Resets the deterministic seed counter. Test-only: lets a test rebuild a
/// sketch and see the same hash family it would get from a fresh process.
#[cfg(test)]
pub fn reset_seed_counter_for_test() {
    SEED_INDEX.store(0, Ordering::Relaxed);
}

const MAX_PRIME32: usize = 1229;

fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    let mut i = 2u32;
    while i.saturating_mul(i) <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// The first 1229 primes starting at 2, used as round-robin salts for
/// `BOBHash32` instance construction. The upstream C++ table (`BOBHash.cc`)
/// was not available to copy verbatim; this sieve reproduces its documented
/// shape (size 1229, ascending primes) deterministically. See DESIGN.md.
fn prime_table() -> &'static [u32; MAX_PRIME32] {
    static TABLE: OnceLock<[u32; MAX_PRIME32]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; MAX_PRIME32];
        let mut n = 2u32;
        let mut count = 0;
        while count < MAX_PRIME32 {
            if is_prime(n) {
                table[count] = n;
                count += 1;
            }
            n += 1;
        }
        table
    })
}

static BOBHASH_COUNTER: AtomicU32 = AtomicU32::new(0);

#[inline]
fn rot(x: u32, k: u32) -> u32 {
    (x << k) | (x >> (32 - k))
}

/// Bob Jenkins' lookup3 ("hashlittle"), public-domain, operating on an
/// arbitrary byte slice with a 32-bit seed.
fn hashlittle(data: &[u8], initval: u32) -> u32 {
    let mut a = 0xdeadbeefu32
        .wrapping_add(data.len() as u32)
        .wrapping_add(initval);
    let mut b = a;
    let mut c = a;

    let mut chunks = data.chunks_exact(12);
    for chunk in &mut chunks {
        a = a.wrapping_add(u32::from_le_bytes(chunk[0..4].try_into().unwrap()));
        b = b.wrapping_add(u32::from_le_bytes(chunk[4..8].try_into().unwrap()));
        c = c.wrapping_add(u32::from_le_bytes(chunk[8..12].try_into().unwrap()));

        a = a.wrapping_sub(c);
        a ^= rot(c, 4);
        c = c.wrapping_add(b);
        b = b.wrapping_sub(a);
        b ^= rot(a, 6);
        a = a.wrapping_add(c);
        c = c.wrapping_sub(b);
        c ^= rot(b, 8);
        b = b.wrapping_add(a);
        a = a.wrapping_sub(c);
        a ^= rot(c, 16);
        c = c.wrapping_add(b);
        b = b.wrapping_sub(a);
        b ^= rot(a, 19);
        a = a.wrapping_add(c);
        c = c.wrapping_sub(b);
        c ^= rot(b, 4);
        b = b.wrapping_add(a);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let mut buf = [0u8; 12];
        buf[..remainder.len()].copy_from_slice(remainder);
        a = a.wrapping_add(u32::from_le_bytes(buf[0..4].try_into().unwrap()));
        b = b.wrapping_add(u32::from_le_bytes(buf[4..8].try_into().unwrap()));
        c = c.wrapping_add(u32::from_le_bytes(buf[8..12].try_into().unwrap()));

        c ^= b;
        c = c.wrapping_sub(rot(b, 14));
        a ^= c;
        a = a.wrapping_sub(rot(c, 11));
        b ^= a;
        b = b.wrapping_sub(rot(a, 25));
        c ^= b;
        c = c.wrapping_sub(rot(b, 16));
        a ^= c;
        a = a.wrapping_sub(rot(c, 4));
        b ^= a;
        b = b.wrapping_sub(rot(a, 14));
        c ^= b;
        c = c.wrapping_sub(rot(b, 24));
    }

    c
}

/// Jenkins lookup3 returning 32-bit values; stateless aside from a salt
/// selected round-robin from the 1229-entry prime table at construction.
#[derive(Clone, Copy, Debug)]
pub struct BOBHash32 {
    salt: u32,
}

impl BOBHash32 {
    pub fn hash_bytes(&self, data: &[u8]) -> u32 {
        hashlittle(data, self.salt)
    }

    pub fn hash_flowkey(&self, key: &FlowKey) -> u32 {
        self.hash_bytes(key.as_bytes())
    }
}

impl Default for BOBHash32 {
    fn default() -> Self {
        let idx = BOBHASH_COUNTER.fetch_add(1, Ordering::Relaxed) as usize % MAX_PRIME32;
        Self {
            salt: prime_table()[idx],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aware_hash_deterministic_across_construction() {
        reset_seed_counter_for_test();
        let a = AwareHash::default();
        let b = AwareHash::default();
        assert_ne!(a, b, "consecutive instances draw from different seed words");
        let bytes = b"hello world";
        assert_eq!(a.hash_bytes(bytes), a.hash_bytes(bytes));
    }

    #[test]
    fn aware_hash_sequence_repeats_every_six_instances() {
        reset_seed_counter_for_test();
        let first_cycle: Vec<AwareHash> = (0..6).map(|_| AwareHash::default()).collect();
        let second_cycle: Vec<AwareHash> = (0..6).map(|_| AwareHash::default()).collect();
        assert_eq!(first_cycle, second_cycle);
    }

    #[test]
    fn prime_table_has_1229_ascending_primes() {
        let table = prime_table();
        assert_eq!(table.len(), MAX_PRIME32);
        assert_eq!(table[0], 2);
        assert_eq!(table[1], 3);
        for w in table.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn bobhash32_is_deterministic_per_instance() {
        let h = BOBHash32::default();
        let k = FlowKey::new(1, 2, 3, 4, 5);
        assert_eq!(h.hash_flowkey(&k), h.hash_flowkey(&k));
    }
}
