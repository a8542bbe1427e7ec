use std::sync::mpsc::Receiver;

use tracing::{debug, info};
use vigil_presence_smoother::{SensitivityConfig, Smoother};
use vigil_radar_ingest::ConnectionState;
use vigil_tracker::{Tracker, TrackerConfig};
use vigil_types::{DetectionFrame, PresenceFrame, PresenceState, ZoneMap};
use vigil_zone_engine::ZoneEngine;

use crate::status::SharedStatus;

/// Channel endpoints the radar-core thread's `RadarCallbacks` feed into.
/// Separate from `RadarIngest` itself so the pipeline can own the
/// downstream stages (tracker, zone engine, smoother) without `RadarIngest`
/// knowing anything about them.
pub struct PipelineChannels {
    pub detections: Receiver<DetectionFrame>,
    pub presence: Receiver<PresenceFrame>,
    pub tracking_conn: Receiver<ConnectionState>,
    pub presence_conn: Receiver<ConnectionState>,
}

/// Runs detections through the tracker, tracks through the zone engine, and
/// zone states through the presence smoother, once per drained frame. Owns
/// nothing about I/O; everything arrives over channels fed by
/// `RadarIngest`'s callbacks on the same pinned thread.
pub struct RadarPipeline {
    tracker: Tracker,
    zone_engine: ZoneEngine,
    smoother: Smoother,
    channels: PipelineChannels,
    has_zones: bool,
}

impl RadarPipeline {
    pub fn new(
        zone_map: ZoneMap,
        tracker_config: TrackerConfig,
        sensitivity: SensitivityConfig,
        channels: PipelineChannels,
    ) -> Self {
        let has_zones = !zone_map.zones.is_empty();
        let smoother = Smoother::new(
            sensitivity,
            Box::new(|zone_id, occupied| {
                info!(zone_id, occupied, "zone occupancy changed");
            }),
        );
        Self {
            tracker: Tracker::new(tracker_config),
            zone_engine: ZoneEngine::new(zone_map),
            smoother,
            channels,
            has_zones,
        }
    }

    /// Drains every channel once and publishes the result into `status`.
    /// Called every radar-core loop iteration; each branch is non-blocking.
    pub fn drain(&mut self, status: &SharedStatus) {
        while let Ok(frame) = self.channels.detections.try_recv() {
            let track_frame = self.tracker.process(&frame);
            let (zone_frame, events) = self.zone_engine.process(&track_frame);
            for event in &events {
                debug!(?event, "zone event");
            }
            let smoothed = self.smoother.tick_zone_frame(&zone_frame);

            let mut guard = status.lock().expect("status mutex poisoned");
            guard.tracks = track_frame.tracks;
            guard.zones = zone_frame.states;
            guard.smoothed_zones = smoothed;
        }

        while let Ok(frame) = self.channels.presence.try_recv() {
            if self.has_zones {
                continue;
            }
            let has_target = frame.state != PresenceState::None;
            let smoothed = self.smoother.tick_presence_binary(has_target, 100, frame.timestamp_ms);
            let mut guard = status.lock().expect("status mutex poisoned");
            guard.smoothed_zones = vec![smoothed];
        }

        while let Ok(state) = self.channels.tracking_conn.try_recv() {
            status.lock().expect("status mutex poisoned").tracking_connected =
                state == ConnectionState::Connected;
        }

        while let Ok(state) = self.channels.presence_conn.try_recv() {
            status.lock().expect("status mutex poisoned").presence_connected =
                state == ConnectionState::Connected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use vigil_types::{Detection, MAX_DETECTIONS};

    fn channels() -> (
        PipelineChannels,
        mpsc::Sender<DetectionFrame>,
        mpsc::Sender<ConnectionState>,
    ) {
        let (det_tx, det_rx) = mpsc::channel();
        let (_pres_tx, pres_rx) = mpsc::channel();
        let (tconn_tx, tconn_rx) = mpsc::channel();
        let (_pconn_tx, pconn_rx) = mpsc::channel();
        (
            PipelineChannels {
                detections: det_rx,
                presence: pres_rx,
                tracking_conn: tconn_rx,
                presence_conn: pconn_rx,
            },
            det_tx,
            tconn_tx,
        )
    }

    #[test]
    fn detection_frame_flows_through_to_status() {
        let (chans, det_tx, tconn_tx) = channels();
        let mut pipeline = RadarPipeline::new(
            ZoneMap::default(),
            TrackerConfig::default(),
            SensitivityConfig::default(),
            chans,
        );
        let status: SharedStatus = Arc::new(Mutex::new(crate::status::StatusSnapshot::new()));

        tconn_tx.send(ConnectionState::Connected).unwrap();

        let mut detections = [Detection::INVALID; MAX_DETECTIONS];
        detections[0] = Detection {
            valid: true,
            x_mm: 500,
            y_mm: 1000,
            speed_cm_s: 0,
            resolution_mm: 100,
            signal_quality: 90,
        };
        det_tx
            .send(DetectionFrame {
                detections,
                target_count: 1,
                seq: 1,
                timestamp_ms: 0,
            })
            .unwrap();

        pipeline.drain(&status);

        let snapshot = crate::status::read(&status);
        assert!(snapshot.tracking_connected);
        // A single detection only spawns a Tentative track, which the
        // tracker does not surface until it confirms.
        assert!(snapshot.tracks.is_empty());
    }
}
