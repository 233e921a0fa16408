//! Count-Min sketch: a `d x w` counter matrix with `d` independent hashes.

use crate::flowkey::FlowKey;
use crate::hash::HashFamily;

#[derive(Clone)]
pub struct CMSketch<H> {
    width: usize,
    depth: usize,
    counters: Vec<Vec<u32>>,
    hash_fns: Vec<H>,
}

impl<H: HashFamily> CMSketch<H> {
    pub fn new(width: usize, depth: usize) -> Self {
        Self {
            width,
            depth,
            counters: vec![vec![0u32; width.max(1)]; depth],
            hash_fns: (0..depth).map(|_| H::default()).collect(),
        }
    }

    pub fn update(&mut self, key: &FlowKey, count: u32) {
        if self.width == 0 {
            return;
        }
        for i in 0..self.depth {
            let idx = (self.hash_fns[i].hash_flowkey(key) % self.width as u64) as usize;
            self.counters[i][idx] = self.counters[i][idx].saturating_add(count);
        }
    }

    pub fn query(&self, key: &FlowKey) -> u32 {
        if self.width == 0 {
            return 0;
        }
        (0..self.depth)
            .map(|i| {
                let idx = (self.hash_fns[i].hash_flowkey(key) % self.width as u64) as usize;
                self.counters[i][idx]
            })
            .min()
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        for row in &mut self.counters {
            row.iter_mut().for_each(|c| *c = 0);
        }
    }

    pub fn size(&self) -> usize {
        self.depth * self.width * std::mem::size_of::<u32>()
    }
}
