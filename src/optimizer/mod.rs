//! The two re-timing optimizers (§4.8): plain `OLDC` and the sketch-gated
//! `JitterSketchOptimizer`, behind one capability interface analogous to
//! `detector::Detector` (§9 "polymorphism over detectors/optimizers").

mod jitter_sketch_optimizer;
mod oldc;

pub use jitter_sketch_optimizer::JitterSketchOptimizer;
pub use oldc::Oldc;

use crate::flowkey::FlowKey;

/// Capability interface shared by every optimizer variant. The control
/// experiment holds a `&mut dyn Optimizer`, never a concrete type.
pub trait Optimizer {
    fn name(&self) -> &'static str;

    /// (Re)applies the buffering-horizon parameter. Separate from
    /// construction so the same boxed optimizer can be retargeted at a
    /// different `B` without rebuilding its (possibly large) internal
    /// sketch state.
    fn configure(&mut self, buffering_horizon: usize);

    /// Observes one packet before it is (maybe) buffered. A no-op for
    /// `OLDC`, which has no internal state; `JitterSketchOptimizer` feeds
    /// its embedded `JitterSketch` here to decide admission.
    fn process_packet(&mut self, flowkey: &FlowKey, timestamp_us: u64);

    /// Whether `flowkey` is currently considered jittered. Gates buffer
    /// admission in `JitterControlExperiment` (§4.9). Always `true` for
    /// `OLDC` — it has no sketch, so admission is unconditional.
    fn has_jitter(&self, flowkey: &FlowKey) -> bool;

    /// The anchored-average re-timing transform (§4.8), applied to one
    /// flow's buffered arrival timestamps.
    fn optimize(&self, timestamps: &[u64]) -> Vec<u64>;
}
