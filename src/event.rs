//! The abnormal jitter event record emitted by every detector.

use crate::flowkey::FlowKey;

/// `{flowkey, old_ifpd, new_ifpd, timestamp}`, appended to a detector's
/// event log whenever its jitter rule fires. Append-only during a run,
/// cleared on `Detector::clear`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbnormalEvent {
    pub flowkey: FlowKey,
    pub old_ifpd: u64,
    pub new_ifpd: u64,
    pub timestamp_us: u64,
}

impl AbnormalEvent {
    pub fn new(flowkey: FlowKey, old_ifpd: u64, new_ifpd: u64, timestamp_us: u64) -> Self {
        Self {
            flowkey,
            old_ifpd,
            new_ifpd,
            timestamp_us,
        }
    }
}

/// Detection mode for the jitter rule shared by every detector (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JitterDetectionMode {
    Deceleration,
    Acceleration,
    Either,
}

impl JitterDetectionMode {
    pub fn from_i64(mode: i64) -> Self {
        match mode {
            0 => JitterDetectionMode::Deceleration,
            1 => JitterDetectionMode::Acceleration,
            _ => JitterDetectionMode::Either,
        }
    }
}

/// The recurring `(jitter_factor, min_absolute_jitter_thres, max_ifpd_diff,
/// jitter_detection_mode, frequency_threshold)` bundle, passed by value to
/// every detector and optimizer constructor instead of threaded field by
/// field (§9 design notes).
#[derive(Clone, Copy, Debug)]
pub struct JitterParams {
    pub jitter_factor: f64,
    pub min_absolute_jitter_thres: u64,
    pub max_ifpd_diff: u64,
    pub jitter_detection_mode: JitterDetectionMode,
    pub frequency_threshold: u32,
}

impl JitterParams {
    /// Evaluates the deceleration/acceleration jitter rule for the
    /// configured mode and returns `Some(diff)` iff the magnitude gate also
    /// passes (`min_absolute_jitter_thres < diff < max_ifpd_diff`).
    pub fn evaluate(&self, old_ifpd: u64, new_ifpd: u64) -> Option<u64> {
        let diff = (new_ifpd as i128 - old_ifpd as i128).unsigned_abs() as u64;

        let deceleration =
            old_ifpd > 0 && (new_ifpd as f64) > self.jitter_factor * old_ifpd as f64;
        let acceleration =
            new_ifpd > 0 && (old_ifpd as f64) > self.jitter_factor * new_ifpd as f64;

        let report = match self.jitter_detection_mode {
            JitterDetectionMode::Deceleration => deceleration,
            JitterDetectionMode::Acceleration => acceleration,
            JitterDetectionMode::Either => deceleration || acceleration,
        };

        if report && diff > self.min_absolute_jitter_thres && diff < self.max_ifpd_diff {
            Some(diff)
        } else {
            None
        }
    }
}
