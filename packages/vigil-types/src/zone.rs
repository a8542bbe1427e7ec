use serde::{Deserialize, Serialize};

pub const MAX_ZONES: usize = 16;
pub const MAX_ZONE_VERTICES: usize = 8;

/// A polygon whose interior either contributes to occupancy (`Include`) or
/// suppresses the contribution of any track inside it (`Exclude`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Include,
    Exclude,
}

/// A configured zone. `id` matches `[A-Za-z0-9_]+`, length <= 16; `vertices`
/// holds between 3 and 8 (x_mm, y_mm) pairs forming a simple polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub zone_type: ZoneType,
    pub vertices: Vec<(i32, i32)>,
    pub sensitivity: u8,
}

/// An ordered, versioned collection of up to [`MAX_ZONES`] zones with unique
/// ids. `version` increases monotonically on every accepted replace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMap {
    pub zones: Vec<Zone>,
    pub version: u32,
}

/// Per-frame raw occupancy for one zone, before debouncing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRawState {
    pub zone_id: String,
    pub occupied: bool,
    pub target_count: u8,
    pub track_ids: Vec<u8>,
    pub has_moving: bool,
    pub last_change_ms: u64,
}

/// Events emitted by the zone engine as membership/occupancy changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ZoneEvent {
    Enter { zone_id: String, track_id: u8 },
    Exit { zone_id: String, track_id: u8 },
    Occupied { zone_id: String },
    Vacant { zone_id: String },
}

/// Output of one zone-engine pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneFrame {
    pub states: Vec<ZoneRawState>,
    pub zone_count: u8,
    pub timestamp_ms: u64,
}

/// Presence-smoother debounce state for a single zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmootherFsmState {
    Vacant,
    Entering,
    Occupied,
    Holding,
}

/// Debounced occupancy for one zone. Exactly one of `occupied_since_ms`,
/// `vacant_since_ms` is non-zero; `smoothed_occupied` iff
/// `fsm_state in {Occupied, Holding}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothedZoneState {
    pub zone_id: String,
    pub smoothed_occupied: bool,
    pub raw_occupied: bool,
    pub target_count: u8,
    pub occupied_since_ms: u64,
    pub vacant_since_ms: u64,
    pub fsm_state: SmootherFsmState,
}
