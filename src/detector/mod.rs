//! The four approximate jitter detectors plus the ground-truth oracle, all
//! behind one capability interface (§4.7, §9 "polymorphism over detectors").

mod delay_sketch;
mod fdfilter;
mod ground_truth;
mod jitter_sketch;
mod jitter_sketch_s1opt;
mod last_ifpd;

pub use delay_sketch::DelaySketch;
pub use fdfilter::FDFilter;
pub use ground_truth::GroundTruthDetector;
pub use jitter_sketch::JitterSketch;
pub use jitter_sketch_s1opt::JitterSketchS1Opt;

use crate::event::AbnormalEvent;
use crate::flowkey::FlowKey;

/// Capability interface shared by every detector variant. The evaluation
/// harness holds a `&mut dyn Detector`, never a concrete type (§9).
pub trait Detector {
    fn set_init_time(&mut self, timestamp_us: u64);
    fn name(&self) -> &'static str;
    fn size(&self) -> usize;
    /// Processes one packet, returning the detector's estimate of the
    /// inter-flow-packet delay. Strictly O(1) amortized expected time; no
    /// per-flow map growth.
    fn update(&mut self, flowkey: &FlowKey, timestamp_us: u64) -> u64;
    fn abnormal_events(&self) -> &[AbnormalEvent];
    fn clear(&mut self);
}
