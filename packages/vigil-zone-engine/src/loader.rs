use std::collections::HashSet;

use vigil_types::{Zone, ZoneMap, MAX_ZONES};

use crate::geometry::{validate_polygon, PolygonError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ZoneMapError {
    #[error("too many zones: {0} > {MAX_ZONES}")]
    TooMany(usize),
    #[error("duplicate zone id {0}")]
    DuplicateId(String),
    #[error("zone {0}: {1}")]
    Polygon(String, PolygonError),
    #[error("zone map version mismatch: expected base {expected}, got {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Validates a candidate zone set atomically: the caller only installs the
/// replacement map if this returns `Ok`, so a rejected map never partially
/// overwrites a loaded one.
pub fn validate_zone_map(zones: &[Zone]) -> Result<(), ZoneMapError> {
    if zones.len() > MAX_ZONES {
        return Err(ZoneMapError::TooMany(zones.len()));
    }
    let mut seen = HashSet::new();
    for zone in zones {
        if !seen.insert(zone.id.clone()) {
            return Err(ZoneMapError::DuplicateId(zone.id.clone()));
        }
        validate_polygon(&zone.vertices).map_err(|e| ZoneMapError::Polygon(zone.id.clone(), e))?;
    }
    Ok(())
}

/// Builds a new, versioned `ZoneMap` from candidate zones, or rejects the
/// whole replacement if any zone fails validation.
///
/// `expected_version` is the base version the caller edited from; it must
/// match `current_version` (the version actually loaded) or the call fails
/// with `VersionMismatch` before validation even runs, so a stale editor
/// can't silently overwrite zones someone else already changed.
pub fn build_zone_map(
    zones: Vec<Zone>,
    current_version: u32,
    expected_version: u32,
) -> Result<ZoneMap, ZoneMapError> {
    if expected_version != current_version {
        return Err(ZoneMapError::VersionMismatch {
            expected: current_version,
            found: expected_version,
        });
    }
    validate_zone_map(&zones)?;
    Ok(ZoneMap {
        zones,
        version: current_version + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::ZoneType;

    fn square(id: &str) -> Zone {
        Zone {
            id: id.to_string(),
            name: id.to_string(),
            zone_type: ZoneType::Include,
            vertices: vec![(0, 0), (2000, 0), (2000, 2000), (0, 2000)],
            sensitivity: 50,
        }
    }

    #[test]
    fn accepts_valid_set_and_bumps_version() {
        let map = build_zone_map(vec![square("a")], 3, 3).unwrap();
        assert_eq!(map.version, 4);
    }

    #[test]
    fn rejects_stale_base_version() {
        let err = build_zone_map(vec![square("a")], 3, 2);
        assert_eq!(err, Err(ZoneMapError::VersionMismatch { expected: 3, found: 2 }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = validate_zone_map(&[square("a"), square("a")]);
        assert_eq!(err, Err(ZoneMapError::DuplicateId("a".to_string())));
    }
}
