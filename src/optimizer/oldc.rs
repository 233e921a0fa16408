//! Online Delay Compensation: the anchored-average re-timing transform
//! shared by both optimizer variants (§4.8, §8 properties 4-5).

use super::Optimizer;
use crate::flowkey::FlowKey;

/// Pure transform over one flow's buffered arrival timestamps. No sketch,
/// no gating: every flow that reaches the buffer pool is admitted.
pub struct Oldc {
    buffering_horizon: usize,
}

impl Oldc {
    pub fn new(buffering_horizon: usize) -> Self {
        Self { buffering_horizon }
    }
}

impl Optimizer for Oldc {
    fn name(&self) -> &'static str {
        "OLDC"
    }

    fn configure(&mut self, buffering_horizon: usize) {
        self.buffering_horizon = buffering_horizon;
    }

    fn process_packet(&mut self, _flowkey: &FlowKey, _timestamp_us: u64) {}

    fn has_jitter(&self, _flowkey: &FlowKey) -> bool {
        true
    }

    fn optimize(&self, timestamps: &[u64]) -> Vec<u64> {
        optimize(timestamps, self.buffering_horizon)
    }
}

/// `s*_k = a_B + k * X_a`, clamped to `[a_k, a_{k+2B}]` (`+inf` when
/// `k + 2B >= n`). Returns the input unchanged when `n <= 2B` (boundary
/// case, §8 property 4). `X_a` is the average inter-arrival over the whole
/// buffered window, so the transform never decreases (property 5): each
/// clamp interval `[a_k, a_{k+2B}]` is itself non-decreasing in `k` because
/// the input timestamps are arrival-ordered.
///
/// Matches the original's truncation order: `k * X_a` is truncated to an
/// integer microsecond count *before* it is added to the anchor, not after
/// the two are summed as floats and rounded.
pub fn optimize(timestamps: &[u64], buffering_horizon: usize) -> Vec<u64> {
    let n = timestamps.len();
    let b = buffering_horizon;
    if n <= 2 * b || n < 2 {
        return timestamps.to_vec();
    }

    let x_a = (timestamps[n - 1] - timestamps[0]) as f64 / (n - 1) as f64;
    let anchor = timestamps[b];

    (0..n)
        .map(|k| {
            let candidate = anchor + (k as f64 * x_a) as u64;
            let bound_a = timestamps[k];
            let bound_b = if k + 2 * b < n {
                timestamps[k + 2 * b]
            } else {
                u64::MAX
            };
            // bound_a and bound_b are not guaranteed ordered when the
            // window itself contains the spike being corrected, so clamp
            // against their min/max rather than assuming bound_a <= bound_b.
            let lower = bound_a.min(bound_b);
            let upper = bound_a.max(bound_b);
            candidate.clamp(lower, upper)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::delay_variation;

    #[test]
    fn empty_input_stays_empty() {
        assert!(optimize(&[], 2).is_empty());
    }

    #[test]
    fn short_input_is_returned_unchanged() {
        let a: Vec<u64> = (0..5).map(|i| i * 1000).collect();
        assert_eq!(optimize(&a, 10), a);
    }

    /// `n=100 > 2B=20`, so the transform is not the identity: it re-anchors
    /// the whole stream at `a_B`. What must hold on an already-even stream
    /// is that the delay variation stays zero, not that the timestamps are
    /// unchanged.
    #[test]
    fn steady_stream_keeps_zero_delay_variation() {
        let a: Vec<u64> = (0..100).map(|i| i * 1000).collect();
        let out = optimize(&a, 10);
        assert_eq!(delay_variation(&out), 0.0);
    }

    #[test]
    fn single_spike_is_pulled_toward_its_neighbors() {
        let mut a: Vec<u64> = (0..20).map(|i| i * 10).collect();
        a[3] = 1000; // spike
        let out = optimize(&a, 2);
        assert!(out[3] <= 1000);
        assert!(out[3] >= a[3].min(out[3]));
    }

    #[test]
    fn output_is_non_decreasing() {
        let mut a: Vec<u64> = (0..30).map(|i| i * 100).collect();
        a[10] = 50_000;
        a[11] = 50_100;
        let out = optimize(&a, 3);
        for w in out.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    /// The `a_B`-anchored transform re-anchors on every call, so a second
    /// pass over an already-optimized stream does not reproduce it
    /// byte-for-byte (the anchor shifts again). What survives a second pass
    /// is that an already-even stream's delay variation stays zero.
    #[test]
    fn reapplying_to_an_already_even_stream_keeps_zero_delay_variation() {
        let a: Vec<u64> = (0..50).map(|i| i * 1000).collect();
        let once = optimize(&a, 5);
        let twice = optimize(&once, 5);
        assert_eq!(delay_variation(&once), 0.0);
        assert_eq!(delay_variation(&twice), 0.0);
    }
}
