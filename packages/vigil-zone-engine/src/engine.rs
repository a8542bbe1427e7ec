use std::collections::HashSet;

use vigil_types::{Track, TrackFrame, ZoneEvent, ZoneFrame, ZoneMap, ZoneRawState, ZoneType};

use crate::geometry::point_in_polygon;

const DEFAULT_MOVING_THRESHOLD_CM_S: f64 = 10.0;

/// Evaluates a `ZoneMap` against track frames, tracking membership across
/// frames to emit `Enter`/`Exit`/`Occupied`/`Vacant` events.
pub struct ZoneEngine {
    map: ZoneMap,
    moving_threshold_cm_s: f64,
    membership: HashSet<(String, u8)>,
    occupied: HashSet<String>,
    last_change_ms: std::collections::HashMap<String, u64>,
    pub tracks_excluded: u64,
}

impl ZoneEngine {
    pub fn new(map: ZoneMap) -> Self {
        Self {
            map,
            moving_threshold_cm_s: DEFAULT_MOVING_THRESHOLD_CM_S,
            membership: HashSet::new(),
            occupied: HashSet::new(),
            last_change_ms: std::collections::HashMap::new(),
            tracks_excluded: 0,
        }
    }

    pub fn replace_map(&mut self, map: ZoneMap) {
        self.map = map;
        self.membership.clear();
        self.occupied.clear();
        self.last_change_ms.clear();
    }

    /// Runs one pass: exclude-before-include, membership diff, event
    /// emission. Returns `(frame, events)`.
    pub fn process(&mut self, tracks: &TrackFrame) -> (ZoneFrame, Vec<ZoneEvent>) {
        let now_ms = tracks.timestamp_ms;
        let live: Vec<&Track> = tracks.tracks.iter().collect();

        let exclude_zones: Vec<&vigil_types::Zone> = self
            .map
            .zones
            .iter()
            .filter(|z| z.zone_type == ZoneType::Exclude)
            .collect();

        let mut excluded_tracks: HashSet<u8> = HashSet::new();
        for track in &live {
            let hit = exclude_zones
                .iter()
                .any(|z| point_in_polygon(track.x_mm as i32, track.y_mm as i32, &z.vertices));
            if hit {
                excluded_tracks.insert(track.id);
            }
        }
        self.tracks_excluded += excluded_tracks.len() as u64;

        let mut events = Vec::new();
        let mut states = Vec::new();
        let mut new_membership = HashSet::new();

        for zone in &self.map.zones {
            if zone.zone_type == ZoneType::Exclude {
                states.push(ZoneRawState {
                    zone_id: zone.id.clone(),
                    occupied: false,
                    target_count: 0,
                    track_ids: Vec::new(),
                    has_moving: false,
                    last_change_ms: *self.last_change_ms.get(&zone.id).unwrap_or(&0),
                });
                continue;
            }

            let mut in_zone = Vec::new();
            for track in &live {
                if excluded_tracks.contains(&track.id) {
                    continue;
                }
                if point_in_polygon(track.x_mm as i32, track.y_mm as i32, &zone.vertices) {
                    in_zone.push(*track);
                }
            }

            for track in &in_zone {
                new_membership.insert((zone.id.clone(), track.id));
            }

            let occupied_now = !in_zone.is_empty();
            let has_moving = in_zone.iter().any(|t| {
                ((t.vx_mm_s / 1000.0).powi(2) + (t.vy_mm_s / 1000.0).powi(2)).sqrt() * 100.0
                    >= self.moving_threshold_cm_s
            });

            for track in &in_zone {
                let key = (zone.id.clone(), track.id);
                if !self.membership.contains(&key) {
                    events.push(ZoneEvent::Enter {
                        zone_id: zone.id.clone(),
                        track_id: track.id,
                    });
                }
            }
            for key in self
                .membership
                .iter()
                .filter(|(zid, _)| *zid == zone.id)
            {
                if !new_membership.contains(key) {
                    events.push(ZoneEvent::Exit {
                        zone_id: key.0.clone(),
                        track_id: key.1,
                    });
                }
            }

            let was_occupied = self.occupied.contains(&zone.id);
            let mut last_change = *self.last_change_ms.get(&zone.id).unwrap_or(&0);
            if occupied_now != was_occupied {
                last_change = now_ms;
                self.last_change_ms.insert(zone.id.clone(), now_ms);
                if occupied_now {
                    events.push(ZoneEvent::Occupied {
                        zone_id: zone.id.clone(),
                    });
                    self.occupied.insert(zone.id.clone());
                } else {
                    events.push(ZoneEvent::Vacant {
                        zone_id: zone.id.clone(),
                    });
                    self.occupied.remove(&zone.id);
                }
            }

            states.push(ZoneRawState {
                zone_id: zone.id.clone(),
                occupied: occupied_now,
                target_count: in_zone.len() as u8,
                track_ids: in_zone.iter().map(|t| t.id).collect(),
                has_moving,
                last_change_ms: last_change,
            });
        }

        self.membership = new_membership;

        let zone_count = states.len() as u8;
        (
            ZoneFrame {
                states,
                zone_count,
                timestamp_ms: now_ms,
            },
            events,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{Lifecycle, Zone};

    fn zone(id: &str, zone_type: ZoneType, verts: Vec<(i32, i32)>) -> Zone {
        Zone {
            id: id.to_string(),
            name: id.to_string(),
            zone_type,
            vertices: verts,
            sensitivity: 50,
        }
    }

    fn track(id: u8, x_mm: f64, y_mm: f64) -> Track {
        Track {
            id,
            lifecycle: Lifecycle::Confirmed,
            x_mm,
            y_mm,
            vx_mm_s: 0.0,
            vy_mm_s: 0.0,
            consecutive_hits: 5,
            consecutive_misses: 0,
            first_seen_ms: 0,
            last_seen_ms: 0,
            confidence: 90,
        }
    }

    #[test]
    fn exclude_preempts_include() {
        let map = ZoneMap {
            zones: vec![
                zone(
                    "a",
                    ZoneType::Include,
                    vec![(0, 0), (2000, 0), (2000, 2000), (0, 2000)],
                ),
                zone(
                    "b",
                    ZoneType::Exclude,
                    vec![(500, 500), (1500, 500), (1500, 1500), (500, 1500)],
                ),
            ],
            version: 1,
        };
        let mut engine = ZoneEngine::new(map);
        let frame = TrackFrame {
            tracks: vec![track(1, 1000.0, 1000.0)],
            track_count: 1,
            timestamp_ms: 100,
            frame_seq: 1,
        };
        let (zone_frame, _) = engine.process(&frame);
        let include_state = zone_frame.states.iter().find(|s| s.zone_id == "a").unwrap();
        assert!(!include_state.occupied);
        assert_eq!(engine.tracks_excluded, 1);
    }

    #[test]
    fn enter_then_exit_on_departure() {
        let map = ZoneMap {
            zones: vec![zone(
                "a",
                ZoneType::Include,
                vec![(0, 0), (2000, 0), (2000, 2000), (0, 2000)],
            )],
            version: 1,
        };
        let mut engine = ZoneEngine::new(map);
        let inside = TrackFrame {
            tracks: vec![track(1, 1000.0, 1000.0)],
            track_count: 1,
            timestamp_ms: 0,
            frame_seq: 1,
        };
        let (_, events) = engine.process(&inside);
        assert!(events.contains(&ZoneEvent::Enter {
            zone_id: "a".to_string(),
            track_id: 1
        }));
        assert!(events.contains(&ZoneEvent::Occupied {
            zone_id: "a".to_string()
        }));

        let outside = TrackFrame {
            tracks: vec![track(1, 5000.0, 5000.0)],
            track_count: 1,
            timestamp_ms: 30,
            frame_seq: 2,
        };
        let (_, events) = engine.process(&outside);
        assert!(events.contains(&ZoneEvent::Exit {
            zone_id: "a".to_string(),
            track_id: 1
        }));
        assert!(events.contains(&ZoneEvent::Vacant {
            zone_id: "a".to_string()
        }));
    }
}
