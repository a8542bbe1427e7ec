use serde::{Deserialize, Serialize};

/// Up to three simultaneous target slots per tracking-radar frame.
pub const MAX_DETECTIONS: usize = 3;

/// A single per-frame radar observation, independent of any prior knowledge.
///
/// `signal_quality` is derived from `resolution_mm` by the parser:
/// `clamp(100 - (res - 100) * 100 / 900, 0, 100)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub valid: bool,
    pub x_mm: i32,
    pub y_mm: i32,
    pub speed_cm_s: i32,
    pub resolution_mm: u32,
    pub signal_quality: u8,
}

impl Detection {
    pub const INVALID: Detection = Detection {
        valid: false,
        x_mm: 0,
        y_mm: 0,
        speed_cm_s: 0,
        resolution_mm: 0,
        signal_quality: 0,
    };

    pub fn quality_from_resolution(resolution_mm: u32) -> u8 {
        let raw = 100i64 - (resolution_mm as i64 - 100) * 100 / 900;
        raw.clamp(0, 100) as u8
    }
}

impl Default for Detection {
    fn default() -> Self {
        Self::INVALID
    }
}

/// One tracking-radar frame: up to [`MAX_DETECTIONS`] slots plus sequencing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    pub detections: [Detection; MAX_DETECTIONS],
    pub target_count: u8,
    pub seq: u32,
    pub timestamp_ms: u64,
}

impl DetectionFrame {
    pub fn empty(seq: u32, timestamp_ms: u64) -> Self {
        Self {
            detections: [Detection::INVALID; MAX_DETECTIONS],
            target_count: 0,
            seq,
            timestamp_ms,
        }
    }

    pub fn valid_slice(&self) -> &[Detection] {
        &self.detections[..self.target_count as usize]
    }
}
