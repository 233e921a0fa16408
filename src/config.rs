//! Typed configuration assembled from an INI document (§6 "Configuration").
//!
//! Resolves the parsed `ini::Ini` document into the `general.*` fields used
//! on every hot path plus, per detector section, the byte-budget-derived
//! dimensions each sketch is constructed with. Missing keys fall back to
//! the defaults documented in spec §6.

use std::path::{Path, PathBuf};

use ini::Ini;

use crate::error::{Error, Result};
use crate::eval::{EvalParams, MatchingMode};
use crate::event::{JitterDetectionMode, JitterParams};
use crate::hash::AwareHash;
use crate::sketch::BloomFilter;

/// Estimated on-the-wire size of one `LastIfpdMap` entry (`FlowKey` padded
/// to 16 bytes + a `u64`), used only to turn a byte budget into a length.
const IFPD_ENTRY_BYTES: usize = 24;
const CM_COUNTER_BYTES: usize = 4;
const S1_BUCKET_BYTES: usize = 8;
const S2_BUCKET_BYTES: usize = 16;
const S3_ENTRY_BYTES: usize = 32;

#[derive(Clone, Copy, Debug)]
pub struct FdFilterParams {
    pub k: usize,
    pub kk: usize,
    pub nbits: usize,
    pub num_hash: usize,
    pub gnbits: usize,
    pub gnum_hash: usize,
    pub delay_thres: u64,
    pub ifpd_map_size: usize,
    pub cm_width: usize,
    pub cm_depth: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct DelaySketchParams {
    pub d: usize,
    pub w: usize,
    pub ifpd_map_size: usize,
    pub cm_width: usize,
    pub cm_depth: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct JitterSketchParams {
    pub w1: usize,
    pub w2: usize,
    pub w3: usize,
    pub d3: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct JitterSketchS1OptParams {
    pub base: JitterSketchParams,
    pub s1_hash_num: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct ControlConfig {
    pub max_buffers: usize,
    pub buffer_timeout_us: u64,
    pub buffering_horizon: usize,
}

/// Resolved, typed view over the parsed `ini::Ini` document. Owns the raw
/// document too, so per-detector sections can be read lazily by the
/// `*_params` accessors without re-parsing the file.
pub struct Config {
    ini: Ini,
    pub data_file: PathBuf,
    pub mem_size: usize,
    pub jitter_params: JitterParams,
    pub control: ControlConfig,
    eval_params: EvalParams,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|e| Error::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let data_file = PathBuf::from(get_str(&ini, "general", "data_file").unwrap_or_default());
        let mem_size = get_int(&ini, "general", "mem_size", 1 << 20) as usize;

        let jitter_params = JitterParams {
            jitter_factor: get_real(&ini, "general", "jitter_factor", 2.0),
            min_absolute_jitter_thres: get_int(&ini, "general", "min_absolute_jitter_thres", 500)
                as u64,
            max_ifpd_diff: get_int(&ini, "general", "max_ifpd_diff", 1_000_000) as u64,
            jitter_detection_mode: JitterDetectionMode::from_i64(get_int(
                &ini,
                "general",
                "jitter_detection_mode",
                2,
            )),
            frequency_threshold: get_int(&ini, "general", "frequency_threshold", 30) as u32,
        };

        let control = ControlConfig {
            max_buffers: get_int(&ini, "JitterControlExperiment", "max_buffers", 4096) as usize,
            buffer_timeout_us: get_int(
                &ini,
                "JitterControlExperiment",
                "buffer_timeout_us",
                5_000_000,
            ) as u64,
            buffering_horizon: get_int(&ini, "JitterControlExperiment", "B_size", 10) as usize,
        };

        let eval_params = EvalParams {
            time_threshold_us: get_int(&ini, "JitterTest", "time_threshold_us", 500_000) as u64,
            ifpd_threshold_us: get_int(&ini, "JitterTest", "ifpd_threshold_us", 1_000) as u64,
            matching_mode: MatchingMode::from_i64(get_int(&ini, "JitterTest", "matching_mode", 0)),
        };

        Ok(Self {
            ini,
            data_file,
            mem_size,
            jitter_params,
            control,
            eval_params,
        })
    }

    pub fn eval_params(&self) -> EvalParams {
        self.eval_params
    }

    pub fn fdfilter_params(&self) -> FdFilterParams {
        fdfilter_budget(&self.ini, "FDFilter", self.mem_size)
    }

    pub fn delay_sketch_params(&self) -> DelaySketchParams {
        delay_sketch_budget(&self.ini, "DelaySketch", self.mem_size)
    }

    pub fn jitter_sketch_params(&self) -> JitterSketchParams {
        jitter_sketch_budget(&self.ini, "JitterSketch", self.mem_size)
    }

    pub fn jitter_sketch_s1opt_params(&self) -> JitterSketchS1OptParams {
        let base = jitter_sketch_budget(&self.ini, "JitterSketchS1Opt", self.mem_size);
        let s1_hash_num = get_int(&self.ini, "JitterSketchS1Opt", "s1_hash_num", 4) as usize;
        JitterSketchS1OptParams { base, s1_hash_num }
    }

    /// `DJSketchOptimizer` mirrors `JitterSketch`'s dimension derivation but
    /// draws from its own, independent memory budget (§6).
    pub fn dj_sketch_optimizer_params(&self) -> JitterSketchParams {
        let mem_size =
            get_int(&self.ini, "DJSketchOptimizer", "mem_size", self.mem_size as i64) as usize;
        jitter_sketch_budget(&self.ini, "DJSketchOptimizer", mem_size)
    }
}

fn get_str<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section)).and_then(|props| props.get(key))
}

fn get_int(ini: &Ini, section: &str, key: &str, default: i64) -> i64 {
    get_str(ini, section, key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn get_real(ini: &Ini, section: &str, key: &str, default: f64) -> f64 {
    get_str(ini, section, key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn fdfilter_budget(ini: &Ini, section: &str, mem_size: usize) -> FdFilterParams {
    let k = get_int(ini, section, "k", 3) as usize;
    let kk = get_int(ini, section, "kk", 4) as usize;
    let num_hash = get_int(ini, section, "num_hash", 3) as usize;
    let gnum_hash = get_int(ini, section, "gnum_hash", 3) as usize;
    let cm_depth = get_int(ini, section, "cm_depth", 4).max(1) as usize;
    let delay_thres = get_int(ini, section, "delay_thres", 2_000_000) as u64;

    let bf_ratio = get_real(ini, section, "bf_ratio", 0.5);
    let gbf_ratio = get_real(ini, section, "gbf_ratio", 0.2);
    let ifpd_map_ratio = get_real(ini, section, "ifpd_map_ratio", 0.2);
    let cm_sketch_ratio = get_real(ini, section, "cm_sketch_ratio", 0.1);

    let bf_bytes = (mem_size as f64 * bf_ratio) as usize;
    let gbf_bytes = (mem_size as f64 * gbf_ratio) as usize;
    let ifpd_bytes = (mem_size as f64 * ifpd_map_ratio) as usize;
    let cm_bytes = (mem_size as f64 * cm_sketch_ratio) as usize;

    let slices = ((k + 1) * kk).max(1);
    let nbits = BloomFilter::<AwareHash>::nbits_by_size((bf_bytes / slices).max(8));
    let gnbits = BloomFilter::<AwareHash>::nbits_by_size(gbf_bytes.max(8));
    let ifpd_map_size = (ifpd_bytes / IFPD_ENTRY_BYTES).max(1);
    let cm_width = (cm_bytes / (cm_depth * CM_COUNTER_BYTES)).max(1);

    FdFilterParams {
        k,
        kk,
        nbits,
        num_hash,
        gnbits,
        gnum_hash,
        delay_thres,
        ifpd_map_size,
        cm_width,
        cm_depth,
    }
}

fn delay_sketch_budget(ini: &Ini, section: &str, mem_size: usize) -> DelaySketchParams {
    let d = get_int(ini, section, "d", 4).max(1) as usize;
    let cm_depth = get_int(ini, section, "cm_depth", 4).max(1) as usize;

    let table_ratio = get_real(ini, section, "table_ratio", 0.7);
    let ifpd_map_ratio = get_real(ini, section, "ifpd_map_ratio", 0.2);
    let cm_sketch_ratio = get_real(ini, section, "cm_sketch_ratio", 0.1);

    let table_bytes = (mem_size as f64 * table_ratio) as usize;
    let ifpd_bytes = (mem_size as f64 * ifpd_map_ratio) as usize;
    let cm_bytes = (mem_size as f64 * cm_sketch_ratio) as usize;

    const BUCKET_BYTES: usize = 16;
    let w = (table_bytes / (d * BUCKET_BYTES)).max(1);
    let ifpd_map_size = (ifpd_bytes / IFPD_ENTRY_BYTES).max(1);
    let cm_width = (cm_bytes / (cm_depth * CM_COUNTER_BYTES)).max(1);

    DelaySketchParams {
        d,
        w,
        ifpd_map_size,
        cm_width,
        cm_depth,
    }
}

fn jitter_sketch_budget(ini: &Ini, section: &str, mem_size: usize) -> JitterSketchParams {
    let stage_one_ratio = get_real(ini, section, "stage_one_ratio", 0.1);
    let stage_two_ratio = get_real(ini, section, "stage_two_ratio", 0.3);
    let d3 = get_int(ini, section, "d3", 4).max(1) as usize;

    let s1_bytes = (mem_size as f64 * stage_one_ratio) as usize;
    let s2_bytes = (mem_size as f64 * stage_two_ratio) as usize;
    let s3_ratio = (1.0 - stage_one_ratio - stage_two_ratio).max(0.0);
    let s3_bytes = (mem_size as f64 * s3_ratio) as usize;

    let w1 = (s1_bytes / S1_BUCKET_BYTES).max(1);
    let w2 = (s2_bytes / S2_BUCKET_BYTES).max(1);
    let w3 = (s3_bytes / (d3 * S3_ENTRY_BYTES)).max(1);

    JitterSketchParams { w1, w2, w3, d3 }
}
