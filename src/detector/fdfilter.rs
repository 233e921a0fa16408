//! Time-windowed `BitBf`s plus a global Bloom filter and a Count-Min gate.

use super::last_ifpd::LastIfpdMap;
use super::Detector;
use crate::event::{AbnormalEvent, JitterParams};
use crate::flowkey::FlowKey;
use crate::hash::HashFamily;
use crate::sketch::{BitBf, BloomFilter, CMSketch};

/// Hard-coded frequency gate for the last-IFPD lookup, carried over
/// verbatim from the original (§4.7.1): a flow's estimated IFPD only feeds
/// the jitter rule once its Count-Min estimate reaches 30.
const FREQUENCY_GATE: u32 = 30;

pub struct FDFilter<H> {
    bfs: Vec<BitBf<H>>,
    gbf: BloomFilter<H>,
    cm_sketch: CMSketch<H>,
    k: usize,
    kk: usize,
    part: u64,
    sub_win_num: u64,
    delay_thres: u64,
    last_update: u64,
    params: JitterParams,
    last_ifpd_map: LastIfpdMap,
    abnormal_events: Vec<AbnormalEvent>,
}

#[allow(clippy::too_many_arguments)]
impl<H: HashFamily> FDFilter<H> {
    pub fn new(
        k: usize,
        kk: usize,
        nbits: usize,
        num_hash: usize,
        gnbits: usize,
        gnum_hash: usize,
        delay_thres: u64,
        params: JitterParams,
        ifpd_map_size: usize,
        cm_width: usize,
        cm_depth: usize,
    ) -> Self {
        let part = (k as u64) * ((1u64 << kk) - 1);
        Self {
            bfs: (0..=k).map(|_| BitBf::new(kk, nbits, num_hash)).collect(),
            gbf: BloomFilter::new(gnbits, gnum_hash),
            cm_sketch: CMSketch::new(cm_width, cm_depth),
            k,
            kk,
            part,
            sub_win_num: 0,
            delay_thres,
            last_update: 0,
            params,
            last_ifpd_map: LastIfpdMap::new(ifpd_map_size),
            abnormal_events: Vec::new(),
        }
    }
}

impl<H: HashFamily> Detector for FDFilter<H> {
    fn set_init_time(&mut self, timestamp_us: u64) {
        self.last_update = timestamp_us;
    }

    fn name(&self) -> &'static str {
        "FDFilter"
    }

    fn size(&self) -> usize {
        self.bfs[0].size() * (self.k + 1)
            + self.gbf.size()
            + self.last_ifpd_map.size()
            + self.cm_sketch.size()
    }

    fn update(&mut self, flowkey: &FlowKey, timestamp_us: u64) -> u64 {
        let sub_window_span = (1u64 << self.kk) - 1;

        if self.part > 0 && (timestamp_us.saturating_sub(self.last_update)) * self.part >= self.delay_thres
        {
            self.last_update = timestamp_us;
            self.sub_win_num += 1;
            if self.sub_win_num % sub_window_span == 0 {
                for i in 0..self.k {
                    let (left, right) = self.bfs.split_at_mut(i + 1);
                    left[i].swap(&mut right[0]);
                }
                self.bfs[self.k].clear();
            }
        }

        let now = self.sub_win_num % sub_window_span + 1;

        let esti_delay = if !self.gbf.query(flowkey) {
            self.gbf.insert(flowkey);
            self.bfs[self.k].update(flowkey, now);
            0
        } else {
            let mut found_i = self.k;
            let mut found_v = 0u64;
            for i in 0..=self.k {
                let v = self.bfs[self.k - i].query(flowkey);
                if v != 0 {
                    found_i = i;
                    found_v = v;
                    break;
                }
            }

            self.bfs[self.k].update(flowkey, now);

            let interval = if self.part > 0 {
                self.delay_thres / self.part
            } else {
                0
            };

            if found_i == 0 {
                if found_v == now {
                    timestamp_us.saturating_sub(self.last_update)
                } else {
                    timestamp_us.saturating_sub(self.last_update) + (now - 1) * interval
                }
            } else {
                timestamp_us.saturating_sub(self.last_update)
                    + ((sub_window_span - found_v) + (found_i as u64 - 1) * sub_window_span + now
                        - 1)
                        * interval
                    + interval / 2
            }
        };

        self.cm_sketch.update(flowkey, 1);
        if self.cm_sketch.query(flowkey) >= FREQUENCY_GATE {
            if let Some(old_ifpd) = self.last_ifpd_map.swap(flowkey, esti_delay) {
                if self.params.evaluate(old_ifpd, esti_delay).is_some() {
                    self.abnormal_events.push(AbnormalEvent::new(
                        *flowkey,
                        old_ifpd,
                        esti_delay,
                        timestamp_us,
                    ));
                }
            }
        }

        esti_delay
    }

    fn abnormal_events(&self) -> &[AbnormalEvent] {
        &self.abnormal_events
    }

    fn clear(&mut self) {
        for bf in &mut self.bfs {
            bf.clear();
        }
        self.gbf.clear();
        self.cm_sketch.clear();
        self.last_ifpd_map.clear();
        self.abnormal_events.clear();
        self.sub_win_num = 0;
    }
}
