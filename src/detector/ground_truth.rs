//! The exact oracle detector used to score approximate detectors against.

use std::collections::HashMap;

use super::Detector;
use crate::event::{AbnormalEvent, JitterParams};
use crate::flowkey::FlowKey;
use crate::record::Record;

/// Exact per-flow state: no sketching, no collisions. `update` writes
/// `last_ifpd_map[key]` only once `flow_counts[key] >= frequency_threshold`
/// — the original nests that write inside the frequency-gated branch, not
/// unconditionally on every packet (resolved ambiguity, see DESIGN.md).
pub struct GroundTruthDetector {
    flow_map: HashMap<FlowKey, u64>,
    last_ifpd_map: HashMap<FlowKey, u64>,
    flow_counts: HashMap<FlowKey, u32>,
    abnormal_events: Vec<AbnormalEvent>,
    params: JitterParams,
}

impl GroundTruthDetector {
    pub fn new(params: JitterParams) -> Self {
        Self {
            flow_map: HashMap::new(),
            last_ifpd_map: HashMap::new(),
            flow_counts: HashMap::new(),
            abnormal_events: Vec::new(),
            params,
        }
    }

    pub fn flow_count(&self) -> usize {
        self.flow_map.len()
    }

    /// Oracle update over a full `Record` (needs the timestamp and key
    /// together, unlike the approximate detectors' split `update(key, ts)`).
    pub fn update(&mut self, record: &Record) -> u64 {
        let real_delay = match self.flow_map.get_mut(&record.flowkey) {
            Some(last_ts) => {
                let delay = record.timestamp_us - *last_ts;
                *last_ts = record.timestamp_us;
                delay
            }
            None => {
                self.flow_map.insert(record.flowkey, record.timestamp_us);
                0
            }
        };

        let count = self.flow_counts.entry(record.flowkey).or_insert(0);
        *count += 1;

        if *count >= self.params.frequency_threshold {
            if let Some(&old_ifpd) = self.last_ifpd_map.get(&record.flowkey) {
                if self.params.evaluate(old_ifpd, real_delay).is_some() {
                    self.abnormal_events.push(AbnormalEvent::new(
                        record.flowkey,
                        old_ifpd,
                        real_delay,
                        record.timestamp_us,
                    ));
                }
            }
            self.last_ifpd_map.insert(record.flowkey, real_delay);
        }

        real_delay
    }

    pub fn clear(&mut self) {
        self.flow_map.clear();
        self.last_ifpd_map.clear();
        self.flow_counts.clear();
        self.abnormal_events.clear();
    }

    pub fn abnormal_events(&self) -> &[AbnormalEvent] {
        &self.abnormal_events
    }
}

/// `GroundTruthDetector` is not itself fed through `Detector::update`
/// (it needs the full `Record`, see above) but implements the rest of the
/// capability surface so it can be constructed and reported on uniformly.
impl Detector for GroundTruthDetector {
    fn set_init_time(&mut self, _timestamp_us: u64) {}

    fn name(&self) -> &'static str {
        "GroundTruth"
    }

    fn size(&self) -> usize {
        let entry = std::mem::size_of::<FlowKey>() + std::mem::size_of::<u64>();
        (self.flow_map.len() + self.last_ifpd_map.len()) * entry
    }

    fn update(&mut self, flowkey: &FlowKey, timestamp_us: u64) -> u64 {
        self.update(&Record::new(*flowkey, timestamp_us, 0))
    }

    fn abnormal_events(&self) -> &[AbnormalEvent] {
        GroundTruthDetector::abnormal_events(self)
    }

    fn clear(&mut self) {
        GroundTruthDetector::clear(self)
    }
}
