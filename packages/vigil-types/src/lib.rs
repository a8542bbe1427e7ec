//! Shared domain types for the sensing pipeline: detections, tracks, zones,
//! presence frames, and OTA manifests/status. These are the values that
//! cross component boundaries; each component owns its own internal state
//! and only ever hands out copies of the types defined here.

mod detection;
mod ota;
mod presence;
mod track;
mod zone;

pub use detection::{Detection, DetectionFrame, MAX_DETECTIONS};
pub use ota::{OtaError, OtaManifest, OtaProgress, OtaStatus};
pub use presence::{PresenceFrame, PresenceState};
pub use track::{Lifecycle, Track, TrackFrame, MAX_TRACKS};
pub use zone::{
    SmoothedZoneState, SmootherFsmState, Zone, ZoneEvent, ZoneFrame, ZoneMap, ZoneRawState,
    ZoneType, MAX_ZONES, MAX_ZONE_VERTICES,
};
