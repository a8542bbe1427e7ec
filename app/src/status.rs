use std::sync::{Arc, Mutex};

use vigil_types::{OtaProgress, SmoothedZoneState, Track, ZoneRawState};

/// Everything a would-be consumer (LAN protocol server, REST zone editor,
/// event-bus uploader — all out of scope here) would read. The two pipeline
/// threads publish into this under a short-held lock; nothing downstream of
/// the lock ever blocks on radar I/O.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub uptime_ms: u64,
    pub tracking_connected: bool,
    pub presence_connected: bool,
    pub tracks: Vec<Track>,
    pub zones: Vec<ZoneRawState>,
    pub smoothed_zones: Vec<SmoothedZoneState>,
    pub ota: OtaProgress,
}

impl StatusSnapshot {
    pub fn new() -> Self {
        Self {
            ota: OtaProgress::idle(),
            ..Default::default()
        }
    }
}

pub type SharedStatus = Arc<Mutex<StatusSnapshot>>;

/// Copies the snapshot out from behind the lock. The only read path a
/// consumer gets; matches the source's "reads happen via copy-out snapshots
/// taken under a short mutex" contract.
pub fn read(status: &SharedStatus) -> StatusSnapshot {
    status.lock().expect("status mutex poisoned").clone()
}
