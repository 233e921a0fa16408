//! The direct-mapped last-IFPD table shared by `FDFilter` and `DelaySketch`.
//!
//! A fixed-size array of `(FlowKey, u64)` pairs indexed by `BOBHash32(key)
//! mod N`. Lossy by design: a collision silently overwrites the previous
//! occupant and is not detected as such. Do not back this with a hash map —
//! the collision silence is the contract (§9).

use crate::flowkey::FlowKey;
use crate::hash::BOBHash32;

pub struct LastIfpdMap {
    entries: Vec<(FlowKey, u64)>,
    hash: BOBHash32,
}

impl LastIfpdMap {
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![(FlowKey::default(), 0); size.max(1)],
            hash: BOBHash32::default(),
        }
    }

    /// Looks up `key`'s previous IFPD, if the slot it hashes to currently
    /// holds that exact key, then unconditionally stores `new_ifpd` there
    /// under `key`. Returns `None` when the slot is empty, occupied by a
    /// different flow (collision), or the table has zero capacity — no
    /// jitter test is performed that packet.
    pub fn swap(&mut self, key: &FlowKey, new_ifpd: u64) -> Option<u64> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = (self.hash.hash_flowkey(key) as usize) % self.entries.len();
        let (stored_key, stored_ifpd) = self.entries[idx];
        let old = if stored_key == *key {
            Some(stored_ifpd)
        } else {
            None
        };
        self.entries[idx] = (*key, new_ifpd);
        old
    }

    pub fn size(&self) -> usize {
        self.entries.len() * std::mem::size_of::<(FlowKey, u64)>()
    }

    pub fn clear(&mut self) {
        self.entries
            .iter_mut()
            .for_each(|e| *e = (FlowKey::default(), 0));
    }
}
