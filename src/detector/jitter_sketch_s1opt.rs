//! `JitterSketch` with an S1 generalized to `s1_hash_num` independent
//! candidate cells and a narrower (16-bit) S2 IFPD cap (§4.7.4).

use super::Detector;
use crate::event::{AbnormalEvent, JitterParams};
use crate::flowkey::FlowKey;
use crate::hash::BOBHash32;

type Small = u16;

#[derive(Clone, Copy, Default)]
struct StageOneBucket {
    fp: u16,
    freq: u32,
}

#[derive(Clone, Copy)]
struct StageTwoBucket {
    small_ifpd: Small,
    long_fp: u32,
    last_arrival_time: u64,
}

impl Default for StageTwoBucket {
    fn default() -> Self {
        Self {
            small_ifpd: 0,
            long_fp: 0,
            last_arrival_time: 0xFF,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct StageThreeEntry {
    full_id: FlowKey,
    last_arrival_time: u64,
    ifpd: u64,
}

pub struct JitterSketchS1Opt {
    s1_hashes: Vec<BOBHash32>,
    bob_hash_2: BOBHash32,
    bob_hash_3: BOBHash32,
    stage_one: Vec<StageOneBucket>,
    stage_two: Vec<StageTwoBucket>,
    stage_three: Vec<Vec<StageThreeEntry>>,
    w1: usize,
    w2: usize,
    w3: usize,
    d3: usize,
    s1_hash_num: usize,
    params: JitterParams,
    promotion_threshold: u32,
    abnormal_events: Vec<AbnormalEvent>,
}

impl JitterSketchS1Opt {
    pub fn new(
        w1: usize,
        w2: usize,
        w3: usize,
        d3: usize,
        s1_hash_num: usize,
        params: JitterParams,
    ) -> Self {
        let s1_hash_num = s1_hash_num.max(1);
        Self {
            s1_hashes: (0..s1_hash_num).map(|_| BOBHash32::default()).collect(),
            bob_hash_2: BOBHash32::default(),
            bob_hash_3: BOBHash32::default(),
            stage_one: vec![StageOneBucket::default(); w1.max(1)],
            stage_two: vec![StageTwoBucket::default(); w2.max(1)],
            stage_three: vec![vec![StageThreeEntry::default(); d3]; w3.max(1)],
            w1: w1.max(1),
            w2: w2.max(1),
            w3: w3.max(1),
            d3,
            s1_hash_num,
            promotion_threshold: params.frequency_threshold.saturating_sub(2),
            params,
            abnormal_events: Vec::new(),
        }
    }

    fn promote_to_s3(&mut self, s3_idx: usize, flowkey: FlowKey, timestamp_us: u64, ifpd: u64) {
        let bucket = &mut self.stage_three[s3_idx];
        let mut empty_idx = None;
        let mut replace_idx = 0usize;
        let mut max_idle = -1.0f64;
        for (i, entry) in bucket.iter().enumerate() {
            if entry.last_arrival_time == 0 {
                empty_idx = Some(i);
                break;
            }
            let idle_index = if entry.ifpd > 0 {
                (timestamp_us.saturating_sub(entry.last_arrival_time)) as f64 / entry.ifpd as f64
            } else {
                f64::MAX
            };
            if idle_index > max_idle {
                max_idle = idle_index;
                replace_idx = i;
            }
        }
        let target = empty_idx.unwrap_or(replace_idx);
        bucket[target] = StageThreeEntry {
            full_id: flowkey,
            last_arrival_time: timestamp_us,
            ifpd,
        };
    }

    /// Scans the `s1_hash_num` independent candidate cells for this flow,
    /// each cell's fingerprint derived from that cell's own hash value (the
    /// same `hash / w1 & 0xFFFF` split `jitter_sketch.rs` uses for its
    /// single S1 row): an exact fingerprint match wins outright; failing
    /// that, an empty cell is claimed; failing that, the minimum-frequency
    /// cell is decremented.
    fn admit_s1(&mut self, flowkey: &FlowKey) -> Option<usize> {
        let candidates: Vec<(usize, u16)> = self
            .s1_hashes
            .iter()
            .map(|h| {
                let hash_val = h.hash_flowkey(flowkey);
                let idx = (hash_val % self.w1 as u32) as usize;
                let fp = ((hash_val / self.w1 as u32) & 0xFFFF) as u16;
                (idx, fp)
            })
            .collect();

        for &(idx, fp) in &candidates {
            if self.stage_one[idx].fp == fp {
                self.stage_one[idx].freq += 1;
                if self.stage_one[idx].freq > self.promotion_threshold {
                    return Some(idx);
                }
                return None;
            }
        }

        for &(idx, fp) in &candidates {
            if self.stage_one[idx].freq == 0 {
                self.stage_one[idx].fp = fp;
                self.stage_one[idx].freq = 1;
                return None;
            }
        }

        let mut min_pos = 0usize;
        let mut min_freq = self.stage_one[candidates[0].0].freq;
        for (pos, &(idx, _)) in candidates.iter().enumerate().skip(1) {
            if self.stage_one[idx].freq < min_freq {
                min_freq = self.stage_one[idx].freq;
                min_pos = pos;
            }
        }
        let min_idx = candidates[min_pos].0;
        self.stage_one[min_idx].freq -= 1;
        None
    }
}

impl Detector for JitterSketchS1Opt {
    fn set_init_time(&mut self, _timestamp_us: u64) {}

    fn name(&self) -> &'static str {
        "JitterSketchS1Opt"
    }

    fn size(&self) -> usize {
        self.w1 * std::mem::size_of::<StageOneBucket>()
            + self.w2 * std::mem::size_of::<StageTwoBucket>()
            + self.w3 * self.d3 * std::mem::size_of::<StageThreeEntry>()
    }

    fn update(&mut self, flowkey: &FlowKey, timestamp_us: u64) -> u64 {
        let hash2 = self.bob_hash_2.hash_flowkey(flowkey);
        let s2_idx = (hash2 % self.w2 as u32) as usize;
        let long_fp = hash2 / self.w2 as u32;

        let hash3 = self.bob_hash_3.hash_flowkey(flowkey);
        let s3_idx = (hash3 % self.w3 as u32) as usize;

        for entry in self.stage_three[s3_idx].iter_mut() {
            if entry.full_id == *flowkey {
                let old_ifpd = entry.ifpd;
                let esti_delay = timestamp_us.saturating_sub(entry.last_arrival_time);
                if self.params.evaluate(old_ifpd, esti_delay).is_some() {
                    self.abnormal_events.push(AbnormalEvent::new(
                        *flowkey,
                        old_ifpd,
                        esti_delay,
                        timestamp_us,
                    ));
                }
                entry.ifpd = esti_delay;
                entry.last_arrival_time = timestamp_us;
                return esti_delay;
            }
        }

        if self.stage_two[s2_idx].long_fp == long_fp {
            let s2 = self.stage_two[s2_idx];
            let esti_delay = timestamp_us.saturating_sub(s2.last_arrival_time);
            let old_ifpd = s2.small_ifpd as u64;
            let mut reported = false;
            if self.params.evaluate(old_ifpd, esti_delay).is_some() {
                self.abnormal_events.push(AbnormalEvent::new(
                    *flowkey,
                    old_ifpd,
                    esti_delay,
                    timestamp_us,
                ));
                reported = true;
            }

            if esti_delay >= Small::MAX as u64 || reported {
                self.promote_to_s3(s3_idx, *flowkey, timestamp_us, esti_delay);
                self.stage_two[s2_idx] = StageTwoBucket::default();
            } else {
                self.stage_two[s2_idx].last_arrival_time = timestamp_us;
                self.stage_two[s2_idx].small_ifpd = esti_delay as Small;
            }
            return esti_delay;
        }

        if let Some(_promoted_s1_idx) = self.admit_s1(flowkey) {
            self.stage_two[s2_idx] = StageTwoBucket {
                small_ifpd: Small::MAX,
                long_fp,
                last_arrival_time: timestamp_us,
            };
        }

        0
    }

    fn abnormal_events(&self) -> &[AbnormalEvent] {
        &self.abnormal_events
    }

    fn clear(&mut self) {
        self.stage_one.iter_mut().for_each(|b| *b = StageOneBucket::default());
        self.stage_two.iter_mut().for_each(|b| *b = StageTwoBucket::default());
        for bucket in &mut self.stage_three {
            bucket.iter_mut().for_each(|e| *e = StageThreeEntry::default());
        }
        self.abnormal_events.clear();
    }
}
