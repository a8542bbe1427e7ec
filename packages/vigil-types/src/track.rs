use serde::{Deserialize, Serialize};

/// At most 3 non-Retired tracks exist at any time.
pub const MAX_TRACKS: usize = 3;

/// Track lifecycle. Id 0 is reserved for "unused"; a `Retired` track carries
/// id 0 and no live state. Only `Confirmed` and `Occluded` ever appear in
/// tracker output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Tentative,
    Confirmed,
    Occluded,
    Retired,
}

/// A persistent identity inferred across frames by associating detections to
/// a constant-velocity state estimator. `x_mm`/`y_mm`/`vx_mm_s`/`vy_mm_s` are
/// the exposed units; the estimator's internal scaling is private to the
/// tracker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: u8,
    pub lifecycle: Lifecycle,
    pub x_mm: f64,
    pub y_mm: f64,
    pub vx_mm_s: f64,
    pub vy_mm_s: f64,
    pub consecutive_hits: u32,
    pub consecutive_misses: u32,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
    pub confidence: u8,
}

impl Track {
    pub fn is_reportable(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Confirmed | Lifecycle::Occluded)
    }
}

/// Output of one tracker pass: only `Confirmed`/`Occluded` tracks, in slot
/// order, with a monotonic frame sequence equal to the tracker's input count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackFrame {
    pub tracks: Vec<Track>,
    pub track_count: u8,
    pub timestamp_ms: u64,
    pub frame_seq: u32,
}

impl TrackFrame {
    pub fn empty(timestamp_ms: u64, frame_seq: u32) -> Self {
        Self {
            tracks: Vec::new(),
            track_count: 0,
            timestamp_ms,
            frame_seq,
        }
    }
}
