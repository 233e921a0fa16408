//! Fingerprint-timestamp table detector (§4.7.2).

use super::last_ifpd::LastIfpdMap;
use super::Detector;
use crate::event::{AbnormalEvent, JitterParams};
use crate::flowkey::FlowKey;
use crate::hash::{BOBHash32, HashFamily};
use crate::sketch::CMSketch;

#[derive(Clone, Copy, Default)]
struct Bucket {
    fp: u16,
    t: u64,
}

pub struct DelaySketch<H> {
    d: usize,
    w: usize,
    table: Vec<Vec<Bucket>>,
    hash_fns: Vec<H>,
    fp_hash: BOBHash32,
    cm_sketch: CMSketch<H>,
    params: JitterParams,
    last_ifpd_map: LastIfpdMap,
    abnormal_events: Vec<AbnormalEvent>,
}

impl<H: HashFamily> DelaySketch<H> {
    pub fn new(
        d: usize,
        w: usize,
        params: JitterParams,
        ifpd_map_size: usize,
        cm_width: usize,
        cm_depth: usize,
    ) -> Self {
        Self {
            d,
            w,
            table: vec![vec![Bucket::default(); w.max(1)]; d],
            hash_fns: (0..d).map(|_| H::default()).collect(),
            fp_hash: BOBHash32::default(),
            cm_sketch: CMSketch::new(cm_width, cm_depth),
            params,
            last_ifpd_map: LastIfpdMap::new(ifpd_map_size),
            abnormal_events: Vec::new(),
        }
    }
}

impl<H: HashFamily> Detector for DelaySketch<H> {
    fn set_init_time(&mut self, _timestamp_us: u64) {}

    fn name(&self) -> &'static str {
        "DelaySketch"
    }

    fn size(&self) -> usize {
        self.d * self.w * std::mem::size_of::<Bucket>()
            + self.last_ifpd_map.size()
            + self.cm_sketch.size()
    }

    fn update(&mut self, flowkey: &FlowKey, timestamp_us: u64) -> u64 {
        if self.w == 0 {
            return 0;
        }
        let fp = (self.fp_hash.hash_flowkey(flowkey) & 0xFFFF) as u16;

        let mut esti_delay = 0u64;
        let mut updated = false;

        for i in 0..self.d {
            let j = (self.hash_fns[i].hash_flowkey(flowkey) % self.w as u64) as usize;
            let bucket = &mut self.table[i][j];
            if bucket.fp == fp {
                esti_delay = timestamp_us.saturating_sub(bucket.t);
                bucket.t = timestamp_us;
                updated = true;
                break;
            } else if bucket.fp == 0 && bucket.t == 0 {
                bucket.fp = fp;
                bucket.t = timestamp_us;
                esti_delay = 0;
                updated = true;
                break;
            }
        }

        if !updated {
            // Evict the candidate with the largest (freshest) timestamp —
            // preserves older arrivals so their delay still has a chance
            // to be read on a future packet.
            let mut replace: Option<(usize, usize)> = None;
            let mut max_t = 0u64;
            for i in 0..self.d {
                let j = (self.hash_fns[i].hash_flowkey(flowkey) % self.w as u64) as usize;
                if self.table[i][j].t > max_t {
                    max_t = self.table[i][j].t;
                    replace = Some((i, j));
                }
            }
            if let Some((i, j)) = replace {
                let bucket = &mut self.table[i][j];
                esti_delay = timestamp_us.saturating_sub(bucket.t);
                bucket.fp = fp;
                bucket.t = timestamp_us;
            }
        }

        self.cm_sketch.update(flowkey, 1);
        if self.cm_sketch.query(flowkey) >= self.params.frequency_threshold {
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
        for row in &mut self.table {
            row.iter_mut().for_each(|b| *b = Bucket::default());
        }
        self.cm_sketch.clear();
        self.last_ifpd_map.clear();
        self.abnormal_events.clear();
    }
}
