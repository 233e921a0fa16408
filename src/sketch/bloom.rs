//! Fixed-size Bloom filter over `k` independent hash functions.

use crate::error::{Error, Result};
use crate::flowkey::FlowKey;
use crate::hash::HashFamily;
use crate::util::nearest_prime;

/// A bit array of `nbits` bits (rounded up to the next prime) with `num_hash`
/// independent hash instances. Bits set by `insert` are cleared only by
/// `reset` or `clear`; `query` is a standard Bloom membership test.
#[derive(Clone)]
pub struct BloomFilter<H> {
    nbits: usize,
    num_hash: usize,
    arr: Vec<u8>,
    hash_fns: Vec<H>,
}

impl<H: HashFamily> BloomFilter<H> {
    pub fn new(nbits: usize, num_hash: usize) -> Self {
        let nbits = nearest_prime(nbits.max(2) as u64) as usize;
        let nbytes = (nbits + 7) / 8;
        Self {
            nbits,
            num_hash,
            arr: vec![0u8; nbytes],
            hash_fns: (0..num_hash).map(|_| H::default()).collect(),
        }
    }

    /// Derives a bit count from a byte budget: the original's
    /// `getNbitsBySize`, rounded to the nearest prime.
    pub fn nbits_by_size(mem_size: usize) -> usize {
        nearest_prime((mem_size * 8) as u64) as usize
    }

    #[inline]
    fn byte(pos: usize) -> usize {
        pos / 8
    }
    #[inline]
    fn bit(pos: usize) -> usize {
        pos % 8
    }
    #[inline]
    fn set_bit(&mut self, pos: usize) {
        self.arr[Self::byte(pos)] |= 1 << (7 - Self::bit(pos));
    }
    #[inline]
    fn reset_bit(&mut self, pos: usize) {
        self.arr[Self::byte(pos)] &= !(1 << (7 - Self::bit(pos)));
    }
    #[inline]
    fn get_bit(&self, pos: usize) -> u8 {
        (self.arr[Self::byte(pos)] >> (7 - Self::bit(pos))) & 1
    }

    fn indices(&self, key: &FlowKey) -> impl Iterator<Item = usize> + '_ {
        self.hash_fns
            .iter()
            .map(move |h| (h.hash_flowkey(key) % self.nbits as u64) as usize)
    }

    pub fn insert(&mut self, key: &FlowKey) {
        for idx in self.indices(key).collect::<Vec<_>>() {
            self.set_bit(idx);
        }
    }

    /// Clears the bits this key would have set. Caller must guarantee no
    /// other live member shares those bits.
    pub fn reset(&mut self, key: &FlowKey) {
        for idx in self.indices(key).collect::<Vec<_>>() {
            self.reset_bit(idx);
        }
    }

    pub fn query(&self, key: &FlowKey) -> bool {
        self.indices(key).all(|idx| self.get_bit(idx) != 0)
    }

    pub fn size(&self) -> usize {
        self.arr.len()
    }

    pub fn clear(&mut self) {
        self.arr.iter_mut().for_each(|b| *b = 0);
    }

    fn same_dimensions(&self, rhs: &Self) -> bool {
        self.nbits == rhs.nbits && self.num_hash == rhs.num_hash && self.hash_fns == rhs.hash_fns
    }

    pub fn and(&mut self, rhs: &Self) -> Result<()> {
        if !self.same_dimensions(rhs) {
            return Err(Error::DimensionMismatch {
                reason: "BloomFilter::and requires identical dimensions and hash family"
                    .to_string(),
            });
        }
        for (a, b) in self.arr.iter_mut().zip(rhs.arr.iter()) {
            *a &= *b;
        }
        Ok(())
    }

    pub fn or(&mut self, rhs: &Self) -> Result<()> {
        if !self.same_dimensions(rhs) {
            return Err(Error::DimensionMismatch {
                reason: "BloomFilter::or requires identical dimensions and hash family"
                    .to_string(),
            });
        }
        for (a, b) in self.arr.iter_mut().zip(rhs.arr.iter()) {
            *a |= *b;
        }
        Ok(())
    }

    pub fn swap(&mut self, rhs: &mut Self) {
        std::mem::swap(self, rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::AwareHash;

    #[test]
    fn insert_then_query_is_true() {
        let mut bf = BloomFilter::<AwareHash>::new(1024, 3);
        let k = FlowKey::new(1, 2, 3, 4, 5);
        assert!(!bf.query(&k));
        bf.insert(&k);
        assert!(bf.query(&k));
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut bf = BloomFilter::<AwareHash>::new(1024, 3);
        let k = FlowKey::new(1, 2, 3, 4, 5);
        bf.insert(&k);
        bf.clear();
        assert!(!bf.query(&k));
    }

    #[test]
    fn and_or_reject_dimension_mismatch() {
        let a = BloomFilter::<AwareHash>::new(1024, 3);
        let b = BloomFilter::<AwareHash>::new(2048, 3);
        let mut a2 = a.clone();
        assert!(a2.and(&b).is_err());
        assert!(a2.or(&b).is_err());
    }
}
