//! The jitter-control pipeline (§4.9): per-flow timestamp buffers with
//! inactivity eviction, feeding an `Optimizer` to re-time jittered flows and
//! reduce their delay variation.

use std::collections::HashMap;

use crate::flowkey::FlowKey;
use crate::optimizer::Optimizer;
use crate::record::Record;

/// One buffered flow's state: `{flowkey, last_arrival_time, timestamps[],
/// active}` (§3). Slots live in a fixed-capacity pool and are recycled
/// through `free_list` on timeout or end-of-stream.
struct BufferSlot {
    flowkey: FlowKey,
    last_arrival_time: u64,
    timestamps: Vec<u64>,
}

/// Per-flow delay-variation summary, emitted for every flow with at least
/// `frequency_threshold` buffered timestamps.
#[derive(Clone, Copy, Debug)]
pub struct FlowVariation {
    pub flowkey: FlowKey,
    pub original_v: f64,
    pub optimized_v: f64,
}

/// Aggregate result of one control-experiment run (§4.9 "Metric").
#[derive(Clone, Debug, Default)]
pub struct ControlMetrics {
    pub sum_original_v: f64,
    pub sum_optimized_v: f64,
    pub flows_with_original_v_positive: usize,
    pub flows_with_optimized_v_positive: usize,
    pub flows_considered: usize,
    pub buffers_dropped: u64,
}

impl ControlMetrics {
    /// `(sum_original_v - sum_optimized_v) / sum_original_v * 100`, or 0
    /// when there is nothing to reduce.
    pub fn percent_reduction(&self) -> f64 {
        if self.sum_original_v > 0.0 {
            (self.sum_original_v - self.sum_optimized_v) / self.sum_original_v * 100.0
        } else {
            0.0
        }
    }
}

/// Fixed-capacity slab of buffer slots plus the `FlowKey -> slot` index.
/// Buffer-pool-full is a silent drop by design (§9 "Open question").
pub struct JitterControlExperiment {
    optimizer: Box<dyn Optimizer>,
    slots: Vec<Option<BufferSlot>>,
    free_list: Vec<usize>,
    flow_to_slot: HashMap<FlowKey, usize>,
    buffer_timeout_us: u64,
    frequency_threshold: u32,
    buffers_dropped: u64,
}

impl JitterControlExperiment {
    pub fn new(
        optimizer: Box<dyn Optimizer>,
        max_buffers: usize,
        buffer_timeout_us: u64,
        frequency_threshold: u32,
    ) -> Self {
        Self {
            optimizer,
            slots: (0..max_buffers).map(|_| None).collect(),
            free_list: (0..max_buffers).rev().collect(),
            flow_to_slot: HashMap::new(),
            buffer_timeout_us,
            frequency_threshold,
            buffers_dropped: 0,
        }
    }

    pub fn optimizer_name(&self) -> &'static str {
        self.optimizer.name()
    }

    /// Runs the whole record stream through the pipeline and reports the
    /// aggregate delay-variation metric (§4.9).
    pub fn run(&mut self, records: &[Record]) -> ControlMetrics {
        let mut sorted: Vec<Record> = records.to_vec();
        sorted.sort_by_key(|r| r.timestamp_us);

        let mut all_original: HashMap<FlowKey, Vec<u64>> = HashMap::new();
        let mut all_optimized: HashMap<FlowKey, Vec<u64>> = HashMap::new();

        for record in &sorted {
            let ts = record.timestamp_us;
            let flowkey = record.flowkey;

            self.optimizer.process_packet(&flowkey, ts);
            self.flush_expired(ts, &mut all_original, &mut all_optimized);

            if let Some(&idx) = self.flow_to_slot.get(&flowkey) {
                let slot = self.slots[idx].as_mut().expect("mapped slot must be occupied");
                slot.timestamps.push(ts);
                slot.last_arrival_time = ts;
            } else if self.optimizer.has_jitter(&flowkey) {
                if let Some(idx) = self.free_list.pop() {
                    self.slots[idx] = Some(BufferSlot {
                        flowkey,
                        last_arrival_time: ts,
                        timestamps: vec![ts],
                    });
                    self.flow_to_slot.insert(flowkey, idx);
                } else {
                    self.buffers_dropped += 1;
                }
            }
        }

        // End of stream: flush every still-active slot.
        let remaining: Vec<FlowKey> = self.flow_to_slot.keys().copied().collect();
        for flowkey in remaining {
            self.flush_flow(&flowkey, &mut all_original, &mut all_optimized);
        }

        self.summarize(&all_original, &all_optimized)
    }

    /// Flushes every slot whose flow has gone quiet for longer than
    /// `buffer_timeout_us` as of `now`.
    fn flush_expired(
        &mut self,
        now: u64,
        all_original: &mut HashMap<FlowKey, Vec<u64>>,
        all_optimized: &mut HashMap<FlowKey, Vec<u64>>,
    ) {
        let expired: Vec<FlowKey> = self
            .flow_to_slot
            .iter()
            .filter_map(|(key, &idx)| {
                let slot = self.slots[idx].as_ref()?;
                if now.saturating_sub(slot.last_arrival_time) > self.buffer_timeout_us {
                    Some(*key)
                } else {
                    None
                }
            })
            .collect();
        for flowkey in expired {
            self.flush_flow(&flowkey, all_original, all_optimized);
        }
    }

    fn flush_flow(
        &mut self,
        flowkey: &FlowKey,
        all_original: &mut HashMap<FlowKey, Vec<u64>>,
        all_optimized: &mut HashMap<FlowKey, Vec<u64>>,
    ) {
        let Some(idx) = self.flow_to_slot.remove(flowkey) else {
            return;
        };
        let slot = self.slots[idx].take().expect("mapped slot must be occupied");
        let optimized = self.optimizer.optimize(&slot.timestamps);
        all_original
            .entry(*flowkey)
            .or_default()
            .extend(slot.timestamps);
        all_optimized.entry(*flowkey).or_default().extend(optimized);
        self.free_list.push(idx);
    }

    fn summarize(
        &self,
        all_original: &HashMap<FlowKey, Vec<u64>>,
        all_optimized: &HashMap<FlowKey, Vec<u64>>,
    ) -> ControlMetrics {
        let mut metrics = ControlMetrics {
            buffers_dropped: self.buffers_dropped,
            ..Default::default()
        };

        for (flowkey, original_ts) in all_original {
            if original_ts.len() < self.frequency_threshold as usize {
                continue;
            }
            let optimized_ts = all_optimized.get(flowkey).map(Vec::as_slice).unwrap_or(&[]);

            let original_v = delay_variation(original_ts);
            let optimized_v = delay_variation(optimized_ts);

            metrics.flows_considered += 1;
            metrics.sum_original_v += original_v;
            metrics.sum_optimized_v += optimized_v;
            if original_v > 0.0 {
                metrics.flows_with_original_v_positive += 1;
            }
            if optimized_v > 0.0 {
                metrics.flows_with_optimized_v_positive += 1;
            }
        }

        metrics
    }
}

/// `V = max_{i,j} |t[i] - t[j] - (i-j) * X_a|`, `X_a = (t[m-1]-t[0])/(m-1)`.
/// Translation-invariant (§8 property 6). Computed in O(m): writing
/// `r[i] = t[i] - i*X_a`, `t[i]-t[j]-(i-j)*X_a = r[i]-r[j]`, so the maximum
/// absolute pairwise difference is simply `max(r) - min(r)`.
pub fn delay_variation(timestamps: &[u64]) -> f64 {
    let m = timestamps.len();
    if m < 2 {
        return 0.0;
    }
    let x_a = (timestamps[m - 1] - timestamps[0]) as f64 / (m - 1) as f64;
    let mut min_r = f64::INFINITY;
    let mut max_r = f64::NEG_INFINITY;
    for (i, &t) in timestamps.iter().enumerate() {
        let r = t as f64 - i as f64 * x_a;
        min_r = min_r.min(r);
        max_r = max_r.max(r);
    }
    max_r - min_r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::Oldc;

    #[test]
    fn delay_variation_is_zero_for_a_perfectly_even_stream() {
        let ts: Vec<u64> = (0..20).map(|i| i * 1000).collect();
        assert_eq!(delay_variation(&ts), 0.0);
    }

    #[test]
    fn delay_variation_is_translation_invariant() {
        let ts: Vec<u64> = vec![0, 900, 2200, 2900, 4100];
        let shifted: Vec<u64> = ts.iter().map(|t| t + 1_000_000).collect();
        assert_eq!(delay_variation(&ts), delay_variation(&shifted));
    }

    #[test]
    fn empty_stream_yields_zero_metrics() {
        let mut exp = JitterControlExperiment::new(Box::new(Oldc::new(2)), 16, 500_000, 30);
        let metrics = exp.run(&[]);
        assert_eq!(metrics.sum_original_v, 0.0);
        assert_eq!(metrics.flows_considered, 0);
    }

    #[test]
    fn full_pool_drops_new_flows_silently() {
        let mut exp = JitterControlExperiment::new(Box::new(Oldc::new(2)), 1, 1_000_000, 2);
        let k1 = FlowKey::new(1, 1, 1, 1, 1);
        let k2 = FlowKey::new(2, 2, 2, 2, 2);
        let records = vec![
            Record::new(k1, 0, 0),
            Record::new(k2, 100, 0),
            Record::new(k1, 1000, 0),
            Record::new(k2, 1100, 0),
        ];
        let metrics = exp.run(&records);
        // Only k1 ever gets a slot; k2's packets are dropped.
        assert!(metrics.buffers_dropped >= 1);
    }

    #[test]
    fn steady_stream_has_zero_variation_before_and_after() {
        let mut exp = JitterControlExperiment::new(Box::new(Oldc::new(5)), 8, 1_000_000, 10);
        let k = FlowKey::new(1, 2, 3, 4, 5);
        let records: Vec<Record> = (0..50)
            .map(|i| Record::new(k, i as u64 * 1000, 0))
            .collect();
        let metrics = exp.run(&records);
        assert_eq!(metrics.flows_considered, 1);
        assert_eq!(metrics.sum_original_v, 0.0);
        assert_eq!(metrics.sum_optimized_v, 0.0);
    }
}
