use std::collections::HashMap;

use vigil_types::{SmoothedZoneState, ZoneFrame};

use crate::debounce::{RawTick, SensitivityConfig, ZoneDebounce};

/// Zone id used by the binary fast path for devices with only a presence
/// radar and no tracking-based zone engine.
pub const GLOBAL_ZONE_ID: &str = "global";

/// Per-zone debounce state plus the registered change callback, invoked at
/// most once per processed frame per zone.
pub struct Smoother {
    zones: HashMap<String, ZoneDebounce>,
    config: SensitivityConfig,
    on_change: Box<dyn Fn(&str, bool) + Send>,
}

impl Smoother {
    pub fn new(config: SensitivityConfig, on_change: Box<dyn Fn(&str, bool) + Send>) -> Self {
        Self {
            zones: HashMap::new(),
            config,
            on_change,
        }
    }

    fn zone_entry(&mut self, zone_id: &str) -> &mut ZoneDebounce {
        self.zones.entry(zone_id.to_string()).or_default()
    }

    /// Feeds one zone's raw occupancy reading, firing the change callback
    /// if `smoothed_occupied` flipped.
    pub fn tick_zone(&mut self, zone_id: &str, tick: RawTick) -> SmoothedZoneState {
        let config = self.config;
        let debounce = self.zone_entry(zone_id);
        let flipped = debounce.tick(tick, &config);
        let state = SmoothedZoneState {
            zone_id: zone_id.to_string(),
            smoothed_occupied: debounce.smoothed_occupied(),
            raw_occupied: tick.raw_occupied,
            target_count: tick.target_count,
            occupied_since_ms: debounce.occupied_since_ms(),
            vacant_since_ms: debounce.vacant_since_ms(),
            fsm_state: debounce.state(),
        };
        if flipped {
            (self.on_change)(zone_id, state.smoothed_occupied);
        }
        state
    }

    /// Runs every zone in `frame` through its debouncer.
    pub fn tick_zone_frame(&mut self, frame: &ZoneFrame) -> Vec<SmoothedZoneState> {
        frame
            .states
            .iter()
            .map(|raw| {
                let avg_confidence = 100; // zone-engine raw states carry no per-track confidence average
                self.tick_zone(
                    &raw.zone_id,
                    RawTick {
                        raw_occupied: raw.occupied,
                        target_count: raw.target_count,
                        avg_confidence,
                        timestamp_ms: frame.timestamp_ms,
                    },
                )
            })
            .collect()
    }

    /// Binary fast path: feeds the presence-radar state directly into the
    /// single synthetic `global` zone, for devices with no tracking radar.
    pub fn tick_presence_binary(
        &mut self,
        has_target: bool,
        avg_confidence: u8,
        timestamp_ms: u64,
    ) -> SmoothedZoneState {
        self.tick_zone(
            GLOBAL_ZONE_ID,
            RawTick {
                raw_occupied: has_target,
                target_count: if has_target { 1 } else { 0 },
                avg_confidence,
                timestamp_ms,
            },
        )
    }

    pub fn hold_extensions(&self, zone_id: &str) -> u64 {
        self.zones.get(zone_id).map(|z| z.hold_extensions).unwrap_or(0)
    }

    pub fn false_vacancy_prevented(&self, zone_id: &str) -> u64 {
        self.zones
            .get(zone_id)
            .map(|z| z.false_vacancy_prevented)
            .unwrap_or(0)
    }

    pub fn false_occupancy_prevented(&self, zone_id: &str) -> u64 {
        self.zones
            .get(zone_id)
            .map(|z| z.false_occupancy_prevented)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn change_callback_fires_once_per_flip() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let mut smoother = Smoother::new(
            SensitivityConfig {
                sensitivity: 100,
                confidence_weighting: false,
                ..SensitivityConfig::default()
            },
            Box::new(move |_zone, _occupied| {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        smoother.tick_presence_binary(true, 90, 0);
        smoother.tick_presence_binary(true, 90, 30);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
