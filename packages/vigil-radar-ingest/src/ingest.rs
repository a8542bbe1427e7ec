use std::thread::JoinHandle;

use tracing::{info, warn};
use vigil_radar_protocol::{PresenceRadarParser, TrackingRadarParser};
use vigil_timebase::Timebase;
use vigil_types::{DetectionFrame, PresenceFrame};

use crate::connection::{ConnectionState, DisconnectTracker};
use crate::filter::{apply_filters, FilterConfig};
use crate::port::UartPort;

/// Per-stream frame-rate and health counters, snapshotted for status reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStats {
    pub frames_parsed: u64,
    pub frames_invalid: u64,
    pub sync_lost: u64,
    pub missed_frames: u64,
    pub max_jitter_ms: u64,
    pub connected: bool,
}

/// Expected inter-frame interval, disconnect timeout, and filter bounds for
/// a `RadarIngest` instance.
#[derive(Debug, Clone, Copy)]
pub struct RadarIngestConfig {
    pub tracking_interval_ms: u64,
    pub presence_interval_ms: u64,
    pub disconnect_timeout_ms: u64,
    pub filter: FilterConfig,
}

impl Default for RadarIngestConfig {
    fn default() -> Self {
        Self {
            tracking_interval_ms: 100,
            presence_interval_ms: 500,
            disconnect_timeout_ms: 3000,
            filter: FilterConfig::default(),
        }
    }
}

/// Synchronous, best-effort callbacks invoked on the radar-core thread.
/// Callbacks must not block; nothing here enforces that, it's a contract.
pub struct RadarCallbacks {
    pub on_detection: Box<dyn Fn(DetectionFrame) + Send>,
    pub on_presence: Box<dyn Fn(PresenceFrame) + Send>,
    pub on_tracking_connection: Box<dyn Fn(ConnectionState) + Send>,
    pub on_presence_connection: Box<dyn Fn(ConnectionState) + Send>,
}

/// Ties together both UART streams, their parsers, the post-parse filter,
/// and per-stream disconnect tracking. Meant to run its read loop on a
/// single dedicated thread (see [`spawn_pinned`]).
pub struct RadarIngest {
    tracking_port: Box<dyn UartPort>,
    presence_port: Box<dyn UartPort>,
    tracking_parser: TrackingRadarParser,
    presence_parser: PresenceRadarParser,
    tracking_timebase: Timebase,
    presence_timebase: Timebase,
    tracking_disconnect: DisconnectTracker,
    presence_disconnect: DisconnectTracker,
    config: RadarIngestConfig,
    callbacks: RadarCallbacks,
    last_disconnect_check_ms: u64,
}

impl RadarIngest {
    pub fn new(
        tracking_port: Box<dyn UartPort>,
        presence_port: Box<dyn UartPort>,
        config: RadarIngestConfig,
        callbacks: RadarCallbacks,
    ) -> Self {
        Self {
            tracking_port,
            presence_port,
            tracking_parser: TrackingRadarParser::new(),
            presence_parser: PresenceRadarParser::new(),
            tracking_timebase: Timebase::new(config.tracking_interval_ms),
            presence_timebase: Timebase::new(config.presence_interval_ms),
            tracking_disconnect: DisconnectTracker::new(config.disconnect_timeout_ms),
            presence_disconnect: DisconnectTracker::new(config.disconnect_timeout_ms),
            config,
            callbacks,
            last_disconnect_check_ms: 0,
        }
    }

    pub fn tracking_stats(&self) -> StreamStats {
        StreamStats {
            frames_parsed: self.tracking_parser.frames_parsed,
            frames_invalid: self.tracking_parser.frames_invalid,
            sync_lost: self.tracking_parser.sync_lost,
            missed_frames: self.tracking_timebase.missed_frames(),
            max_jitter_ms: self.tracking_timebase.max_jitter_ms(),
            connected: self.tracking_disconnect.state() == ConnectionState::Connected,
        }
    }

    pub fn presence_stats(&self) -> StreamStats {
        StreamStats {
            frames_parsed: self.presence_parser.frames_parsed,
            frames_invalid: self.presence_parser.frames_invalid,
            sync_lost: self.presence_parser.sync_lost,
            missed_frames: self.presence_timebase.missed_frames(),
            max_jitter_ms: self.presence_timebase.max_jitter_ms(),
            connected: self.presence_disconnect.state() == ConnectionState::Connected,
        }
    }

    /// Drains whatever bytes are currently available from both ports,
    /// dispatches completed frames, and runs the periodic disconnect check.
    /// `now_ms` is monotonic ingest-local time supplied by the caller.
    pub fn poll_once(&mut self, now_ms: u64) {
        let mut buf = [0u8; 256];

        if let Ok(n) = self.tracking_port.read(&mut buf) {
            for &b in &buf[..n] {
                if let Some(mut frame) = self.tracking_parser.push_byte(b, now_ms) {
                    apply_filters(&mut frame, &self.config.filter);
                    self.tracking_timebase.frame_received(now_ms);
                    if self.tracking_disconnect.on_frame(now_ms) {
                        info!("tracking radar connected");
                        (self.callbacks.on_tracking_connection)(ConnectionState::Connected);
                    }
                    (self.callbacks.on_detection)(frame);
                }
            }
        }

        if let Ok(n) = self.presence_port.read(&mut buf) {
            for &b in &buf[..n] {
                if let Some(frame) = self.presence_parser.push_byte(b, now_ms) {
                    self.presence_timebase.frame_received(now_ms);
                    if self.presence_disconnect.on_frame(now_ms) {
                        info!("presence radar connected");
                        (self.callbacks.on_presence_connection)(ConnectionState::Connected);
                    }
                    (self.callbacks.on_presence)(frame);
                }
            }
        }

        if now_ms.saturating_sub(self.last_disconnect_check_ms) >= 500 {
            self.last_disconnect_check_ms = now_ms;
            if self.tracking_disconnect.check(now_ms) {
                warn!("tracking radar disconnected");
                (self.callbacks.on_tracking_connection)(ConnectionState::Disconnected);
            }
            if self.presence_disconnect.check(now_ms) {
                warn!("presence radar disconnected");
                (self.callbacks.on_presence_connection)(ConnectionState::Disconnected);
            }
        }
    }
}

/// Spawns `body` on a new OS thread pinned to the lowest-numbered available
/// core, if the platform exposes one. Pinning failure is non-fatal: the
/// radar core still runs, just without affinity.
pub fn spawn_pinned<F>(name: &str, body: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let core = core_affinity::get_core_ids().and_then(|ids| ids.into_iter().next());
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            if let Some(core_id) = core {
                if !core_affinity::set_for_current(core_id) {
                    warn!("failed to pin {name} thread to core {core_id:?}");
                }
            }
            body();
        })
}
