//! Fixed-memory probabilistic primitives: `BloomFilter`, the bit-sliced
//! `BitBf` counter, and `CMSketch` (Count-Min).

pub mod bitbf;
pub mod bloom;
pub mod cmsketch;

pub use bitbf::BitBf;
pub use bloom::BloomFilter;
pub use cmsketch::CMSketch;
