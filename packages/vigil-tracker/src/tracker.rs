use tracing::debug;
use vigil_types::{DetectionFrame, Lifecycle, Track, TrackFrame, MAX_TRACKS};

use crate::association::associate;
use crate::kalman::{KalmanConfig, KalmanFilter};

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub confirm_threshold: u32,
    pub occlusion_timeout_frames: u32,
    pub tentative_drop: u32,
    pub base_gate_mm: f64,
    pub kalman: KalmanConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            confirm_threshold: 2,
            occlusion_timeout_frames: 66,
            tentative_drop: 3,
            base_gate_mm: 600.0,
            kalman: KalmanConfig::default(),
        }
    }
}

struct TrackSlot {
    id: u8,
    lifecycle: Lifecycle,
    filter: KalmanFilter,
    consecutive_hits: u32,
    consecutive_misses: u32,
    first_seen_ms: u64,
    last_seen_ms: u64,
    confidence: u8,
}

impl TrackSlot {
    fn gate_mm(&self, base_gate_mm: f64) -> f64 {
        (base_gate_mm + self.filter.speed_m_s() * 100.0).min(1000.0)
    }

    fn age_seconds(&self, now_ms: u64) -> f64 {
        now_ms.saturating_sub(self.first_seen_ms) as f64 / 1000.0
    }

    fn confidence_score(&self, now_ms: u64) -> u8 {
        let base = 50.0
            + (self.consecutive_hits as f64 * 5.0).min(30.0)
            - (self.consecutive_misses as f64 * 8.0).min(40.0)
            + (self.age_seconds(now_ms) * 2.0).min(20.0);
        base.clamp(0.0, 100.0) as u8
    }

    fn to_track(&self) -> Track {
        Track {
            id: self.id,
            lifecycle: self.lifecycle,
            x_mm: self.filter.x[0],
            y_mm: self.filter.x[1],
            vx_mm_s: self.filter.x[2],
            vy_mm_s: self.filter.x[3],
            consecutive_hits: self.consecutive_hits,
            consecutive_misses: self.consecutive_misses,
            first_seen_ms: self.first_seen_ms,
            last_seen_ms: self.last_seen_ms,
            confidence: self.confidence,
        }
    }
}

/// Holds up to [`MAX_TRACKS`] live track slots and runs the per-frame
/// predict/associate/update/spawn/retire/emit pipeline.
pub struct Tracker {
    slots: [Option<TrackSlot>; MAX_TRACKS],
    config: TrackerConfig,
    next_id: u8,
    frame_seq: u32,
    pub filter_resets: u64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            slots: [None, None, None],
            config,
            next_id: 1,
            frame_seq: 0,
            filter_resets: 0,
        }
    }

    fn allocate_id(&mut self) -> u8 {
        let id = self.next_id;
        self.next_id = if self.next_id == 255 { 1 } else { self.next_id + 1 };
        id
    }

    pub fn process(&mut self, detections: &DetectionFrame) -> TrackFrame {
        self.frame_seq += 1;
        let now_ms = detections.timestamp_ms;

        for slot in self.slots.iter_mut().flatten() {
            slot.filter.predict(&self.config.kalman);
        }

        let active_idx: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
            .collect();
        let positions: Vec<(f64, f64)> = active_idx
            .iter()
            .map(|&i| self.slots[i].as_ref().unwrap().filter.predicted_position())
            .collect();
        let gates: Vec<f64> = active_idx
            .iter()
            .map(|&i| self.slots[i].as_ref().unwrap().gate_mm(self.config.base_gate_mm))
            .collect();
        let det_slice = detections.valid_slice();
        let det_positions: Vec<(f64, f64)> = det_slice
            .iter()
            .map(|d| (d.x_mm as f64, d.y_mm as f64))
            .collect();

        let pairs = associate(&positions, &gates, &det_positions);

        let mut matched_slot = vec![false; active_idx.len()];
        let mut matched_det = vec![false; det_slice.len()];

        for (local_i, local_j) in pairs {
            matched_slot[local_i] = true;
            matched_det[local_j] = true;
            let slot_idx = active_idx[local_i];
            let det = &det_slice[local_j];
            self.apply_match(slot_idx, det.x_mm as f64, det.y_mm as f64, now_ms);
        }

        for (local_i, &slot_idx) in active_idx.iter().enumerate() {
            if !matched_slot[local_i] {
                self.apply_miss(slot_idx);
            }
        }

        self.retire_expired();

        for (j, det) in det_slice.iter().enumerate() {
            if !matched_det[j] {
                self.spawn(det.x_mm as f64, det.y_mm as f64, now_ms);
            }
        }

        self.emit(now_ms)
    }

    fn apply_match(&mut self, slot_idx: usize, x_mm: f64, y_mm: f64, now_ms: u64) {
        let config = self.config;
        let slot = self.slots[slot_idx].as_mut().unwrap();
        let ok = slot.filter.update(x_mm, y_mm, &config.kalman);
        if !ok || slot.filter.has_diverged() {
            slot.filter = KalmanFilter::init(x_mm, y_mm);
            self.filter_resets += 1;
            debug!(slot_idx, "tracker filter reset on divergence");
        }
        slot.consecutive_hits += 1;
        slot.consecutive_misses = 0;
        slot.confidence = (slot.confidence + 5).min(100);
        slot.last_seen_ms = now_ms;
        slot.lifecycle = match slot.lifecycle {
            Lifecycle::Tentative => {
                if slot.consecutive_hits >= config.confirm_threshold {
                    Lifecycle::Confirmed
                } else {
                    Lifecycle::Tentative
                }
            }
            Lifecycle::Occluded => Lifecycle::Confirmed,
            other => other,
        };
    }

    fn apply_miss(&mut self, slot_idx: usize) {
        let config = self.config;
        let slot = self.slots[slot_idx].as_mut().unwrap();
        slot.consecutive_misses += 1;
        slot.confidence = slot.confidence.saturating_sub(10);
        slot.lifecycle = match slot.lifecycle {
            Lifecycle::Tentative => {
                if slot.consecutive_misses >= config.tentative_drop {
                    Lifecycle::Retired
                } else {
                    Lifecycle::Tentative
                }
            }
            Lifecycle::Confirmed => Lifecycle::Occluded,
            Lifecycle::Occluded => {
                if slot.consecutive_misses >= config.occlusion_timeout_frames {
                    Lifecycle::Retired
                } else {
                    Lifecycle::Occluded
                }
            }
            Lifecycle::Retired => Lifecycle::Retired,
        };
    }

    fn retire_expired(&mut self) {
        for slot in self.slots.iter_mut() {
            if matches!(slot.as_ref().map(|s| s.lifecycle), Some(Lifecycle::Retired)) {
                *slot = None;
            }
        }
    }

    fn spawn(&mut self, x_mm: f64, y_mm: f64, now_ms: u64) {
        let Some(empty) = self.slots.iter().position(|s| s.is_none()) else {
            return;
        };
        let id = self.allocate_id();
        self.slots[empty] = Some(TrackSlot {
            id,
            lifecycle: Lifecycle::Tentative,
            filter: KalmanFilter::init(x_mm, y_mm),
            consecutive_hits: 1,
            consecutive_misses: 0,
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
            confidence: 50,
        });
    }

    fn emit(&mut self, now_ms: u64) -> TrackFrame {
        let mut tracks = Vec::with_capacity(MAX_TRACKS);
        for slot in self.slots.iter_mut().flatten() {
            if matches!(slot.lifecycle, Lifecycle::Confirmed | Lifecycle::Occluded) {
                slot.confidence = slot.confidence_score(now_ms);
                tracks.push(slot.to_track());
            }
        }
        TrackFrame {
            track_count: tracks.len() as u8,
            tracks,
            timestamp_ms: now_ms,
            frame_seq: self.frame_seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{Detection, MAX_DETECTIONS};

    fn single_detection_frame(x_mm: i32, y_mm: i32, seq: u32, timestamp_ms: u64) -> DetectionFrame {
        let mut detections = [Detection::INVALID; MAX_DETECTIONS];
        detections[0] = Detection {
            valid: true,
            x_mm,
            y_mm,
            speed_cm_s: 0,
            resolution_mm: 100,
            signal_quality: 100,
        };
        DetectionFrame {
            detections,
            target_count: 1,
            seq,
            timestamp_ms,
        }
    }

    #[test]
    fn confirms_after_two_consistent_frames() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let f1 = tracker.process(&single_detection_frame(1000, 2000, 1, 0));
        assert_eq!(f1.track_count, 0); // Tentative, not yet reportable

        let f2 = tracker.process(&single_detection_frame(1000, 2000, 2, 30));
        assert_eq!(f2.track_count, 1);
        assert_eq!(f2.tracks[0].lifecycle, Lifecycle::Confirmed);
        assert_eq!(f2.tracks[0].id, 1);
        let displacement = ((f2.tracks[0].x_mm - 1000.0).powi(2)
            + (f2.tracks[0].y_mm - 2000.0).powi(2))
        .sqrt();
        assert!(displacement < 600.0);
    }

    #[test]
    fn tentative_dropped_after_configured_misses() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.process(&single_detection_frame(1000, 2000, 1, 0));
        let empty = DetectionFrame::empty(0, 0);
        for i in 0..3 {
            tracker.process(&DetectionFrame {
                timestamp_ms: (i + 1) * 30,
                ..empty
            });
        }
        let f = tracker.process(&DetectionFrame {
            timestamp_ms: 150,
            ..empty
        });
        assert_eq!(f.track_count, 0);
    }

    #[test]
    fn confirmed_track_occludes_then_retires() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.process(&single_detection_frame(1000, 2000, 1, 0));
        tracker.process(&single_detection_frame(1000, 2000, 2, 30));

        let empty = DetectionFrame::empty(0, 60);
        let after_miss = tracker.process(&empty);
        assert_eq!(after_miss.tracks[0].lifecycle, Lifecycle::Occluded);

        let mut now = 60;
        for _ in 0..66 {
            now += 30;
            tracker.process(&DetectionFrame {
                timestamp_ms: now,
                ..DetectionFrame::empty(0, now)
            });
        }
        let final_frame = tracker.process(&DetectionFrame {
            timestamp_ms: now + 30,
            ..DetectionFrame::empty(0, now + 30)
        });
        assert_eq!(final_frame.track_count, 0);
    }

    #[test]
    fn at_most_three_tracks_are_kept() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let mut detections = [Detection::INVALID; MAX_DETECTIONS];
        for (i, d) in detections.iter_mut().enumerate() {
            *d = Detection {
                valid: true,
                x_mm: i as i32 * 2000,
                y_mm: 1000,
                speed_cm_s: 0,
                resolution_mm: 100,
                signal_quality: 100,
            };
        }
        let frame = DetectionFrame {
            detections,
            target_count: 3,
            seq: 1,
            timestamp_ms: 0,
        };
        tracker.process(&frame);
        let f2 = tracker.process(&DetectionFrame {
            timestamp_ms: 30,
            ..frame
        });
        assert!(f2.track_count <= MAX_TRACKS as u8);
    }
}
