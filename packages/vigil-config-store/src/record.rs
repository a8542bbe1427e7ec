use bytemuck::{Pod, Zeroable};
use crc::{Crc, CRC_16_IBM_3740};
use vigil_types::{Zone, ZoneMap, ZoneType, MAX_ZONES, MAX_ZONE_VERTICES};

use crate::error::ConfigError;

/// CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, no reflection, xorout 0.
const CRC16_CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

pub fn crc16_ccitt(bytes: &[u8]) -> u16 {
    CRC16_CCITT.checksum(bytes)
}

/// Fixed-layout mirror of one zone, matching the on-disk byte layout:
/// `{char id[16], char name[32], u8 type, i16 vertices[8][2], u8 vertex_count,
/// u8 sensitivity}`. Fields are reordered here (vertices before the trailing
/// u8s) so the struct carries no implicit padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ZoneRecordWire {
    pub id: [u8; 16],
    pub name: [u8; 32],
    pub vertices: [i16; MAX_ZONE_VERTICES * 2],
    pub zone_type: u8,
    pub vertex_count: u8,
    pub sensitivity: u8,
    pub _reserved: u8,
}

impl ZoneRecordWire {
    pub const EMPTY: ZoneRecordWire = ZoneRecordWire {
        id: [0; 16],
        name: [0; 32],
        vertices: [0; MAX_ZONE_VERTICES * 2],
        zone_type: 0,
        vertex_count: 0,
        sensitivity: 0,
        _reserved: 0,
    };

    pub fn from_zone(zone: &Zone) -> Result<Self, ConfigError> {
        if zone.id.len() > 16 || !zone.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Invalid(format!("bad zone id '{}'", zone.id)));
        }
        if zone.name.len() > 32 {
            return Err(ConfigError::Invalid(format!("zone name too long: {}", zone.name)));
        }
        if !(3..=MAX_ZONE_VERTICES).contains(&zone.vertices.len()) {
            return Err(ConfigError::Invalid(format!(
                "vertex_count {} out of [3,{}]",
                zone.vertices.len(),
                MAX_ZONE_VERTICES
            )));
        }
        if zone.sensitivity > 100 {
            return Err(ConfigError::Invalid("sensitivity > 100".into()));
        }
        let mut wire = ZoneRecordWire::EMPTY;
        wire.id[..zone.id.len()].copy_from_slice(zone.id.as_bytes());
        wire.name[..zone.name.len()].copy_from_slice(zone.name.as_bytes());
        for (i, (x, y)) in zone.vertices.iter().enumerate() {
            wire.vertices[i * 2] = *x as i16;
            wire.vertices[i * 2 + 1] = *y as i16;
        }
        wire.zone_type = match zone.zone_type {
            ZoneType::Include => 0,
            ZoneType::Exclude => 1,
        };
        wire.vertex_count = zone.vertices.len() as u8;
        wire.sensitivity = zone.sensitivity;
        Ok(wire)
    }

    pub fn to_zone(&self) -> Result<Zone, ConfigError> {
        let id = cstr_field(&self.id);
        let name = cstr_field(&self.name);
        if !(3..=MAX_ZONE_VERTICES as u8).contains(&self.vertex_count) {
            return Err(ConfigError::Invalid(format!(
                "vertex_count {} out of range",
                self.vertex_count
            )));
        }
        let zone_type = match self.zone_type {
            0 => ZoneType::Include,
            1 => ZoneType::Exclude,
            other => return Err(ConfigError::Invalid(format!("unknown zone type {other}"))),
        };
        let vertices = (0..self.vertex_count as usize)
            .map(|i| (self.vertices[i * 2] as i32, self.vertices[i * 2 + 1] as i32))
            .collect();
        Ok(Zone {
            id,
            name,
            zone_type,
            vertices,
            sensitivity: self.sensitivity,
        })
    }

    pub fn is_empty_slot(&self) -> bool {
        self.vertex_count == 0
    }
}

fn cstr_field(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Fixed-layout mirror of the persisted zone store record: `{u32 version,
/// u32 updated_at_unix, zone[16], u8 zone_count, u16 crc16_ccitt}`. The CRC
/// covers every byte preceding the `crc16` field, including the explicit
/// padding byte that keeps the struct's size a multiple of its alignment.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ZoneStoreRecordWire {
    pub version: u32,
    pub updated_at_unix: u32,
    pub zones: [ZoneRecordWire; MAX_ZONES],
    pub zone_count: u8,
    pub _pad: u8,
    pub crc16: u16,
}

impl ZoneStoreRecordWire {
    pub fn checksum_region(&self) -> &[u8] {
        let bytes: &[u8] = bytemuck::bytes_of(self);
        let crc_offset = bytes.len() - std::mem::size_of::<u16>();
        &bytes[..crc_offset]
    }

    pub fn compute_checksum(&self) -> u16 {
        crc16_ccitt(self.checksum_region())
    }

    pub fn from_zone_map(map: &ZoneMap) -> Result<Self, ConfigError> {
        if map.zones.len() > MAX_ZONES {
            return Err(ConfigError::Invalid(format!(
                "zone_count {} exceeds {}",
                map.zones.len(),
                MAX_ZONES
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for z in &map.zones {
            if !seen.insert(z.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate zone id '{}'", z.id)));
            }
        }
        let mut zones = [ZoneRecordWire::EMPTY; MAX_ZONES];
        for (i, z) in map.zones.iter().enumerate() {
            zones[i] = ZoneRecordWire::from_zone(z)?;
        }
        let mut record = ZoneStoreRecordWire {
            version: map.version,
            updated_at_unix: 0,
            zones,
            zone_count: map.zones.len() as u8,
            _pad: 0,
            crc16: 0,
        };
        record.crc16 = record.compute_checksum();
        Ok(record)
    }

    pub fn to_zone_map(&self) -> Result<ZoneMap, ConfigError> {
        if self.crc16 != 0 {
            let computed = self.compute_checksum();
            if computed != self.crc16 {
                return Err(ConfigError::Checksum);
            }
        }
        if self.zone_count as usize > MAX_ZONES {
            return Err(ConfigError::Invalid("zone_count exceeds MAX_ZONES".into()));
        }
        let mut zones = Vec::with_capacity(self.zone_count as usize);
        for wire in self.zones.iter().take(self.zone_count as usize) {
            zones.push(wire.to_zone()?);
        }
        Ok(ZoneMap {
            zones,
            version: self.version,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        bytemuck::try_from_bytes::<Self>(bytes)
            .copied()
            .map_err(|_| ConfigError::Invalid("malformed zone store record bytes".into()))
    }
}

/// `{char device_name[32], char friendly_name[48], u8 default_sensitivity,
/// bool telemetry_enabled, u16 state_throttle_ms}`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DeviceRecordWire {
    pub device_name: [u8; 32],
    pub friendly_name: [u8; 48],
    pub default_sensitivity: u8,
    pub telemetry_enabled: u8,
    pub state_throttle_ms: u16,
}

/// Typed view over [`DeviceRecordWire`] for callers that don't want to
/// handle C-string buffers directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub device_name: String,
    pub friendly_name: String,
    pub default_sensitivity: u8,
    pub telemetry_enabled: bool,
    pub state_throttle_ms: u16,
}

impl DeviceRecordWire {
    pub fn from_settings(s: &DeviceSettings) -> Result<Self, ConfigError> {
        if s.device_name.len() > 32 || s.friendly_name.len() > 48 {
            return Err(ConfigError::Invalid("device/friendly name too long".into()));
        }
        let mut wire = DeviceRecordWire::zeroed();
        wire.device_name[..s.device_name.len()].copy_from_slice(s.device_name.as_bytes());
        wire.friendly_name[..s.friendly_name.len()].copy_from_slice(s.friendly_name.as_bytes());
        wire.default_sensitivity = s.default_sensitivity;
        wire.telemetry_enabled = s.telemetry_enabled as u8;
        wire.state_throttle_ms = s.state_throttle_ms;
        Ok(wire)
    }

    pub fn to_settings(&self) -> DeviceSettings {
        DeviceSettings {
            device_name: cstr_field(&self.device_name),
            friendly_name: cstr_field(&self.friendly_name),
            default_sensitivity: self.default_sensitivity,
            telemetry_enabled: self.telemetry_enabled != 0,
            state_throttle_ms: self.state_throttle_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_zone(id: &str) -> Zone {
        Zone {
            id: id.to_string(),
            name: "square".to_string(),
            zone_type: ZoneType::Include,
            vertices: vec![(0, 0), (2000, 0), (2000, 2000), (0, 2000)],
            sensitivity: 50,
        }
    }

    #[test]
    fn checksum_round_trips() {
        let map = ZoneMap {
            zones: vec![square_zone("a")],
            version: 1,
        };
        let wire = ZoneStoreRecordWire::from_zone_map(&map).unwrap();
        assert_eq!(wire.compute_checksum(), wire.crc16);
        let back = wire.to_zone_map().unwrap();
        assert_eq!(back.zones[0].id, "a");
    }

    #[test]
    fn tampered_checksum_rejected() {
        let map = ZoneMap {
            zones: vec![square_zone("a")],
            version: 1,
        };
        let mut wire = ZoneStoreRecordWire::from_zone_map(&map).unwrap();
        wire.crc16 ^= 0xFFFF;
        assert_eq!(wire.to_zone_map().unwrap_err(), ConfigError::Checksum);
    }

    #[test]
    fn zero_checksum_accepted_as_unset() {
        let map = ZoneMap {
            zones: vec![square_zone("a")],
            version: 1,
        };
        let mut wire = ZoneStoreRecordWire::from_zone_map(&map).unwrap();
        wire.crc16 = 0;
        assert!(wire.to_zone_map().is_ok());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let map = ZoneMap {
            zones: vec![square_zone("a"), square_zone("a")],
            version: 1,
        };
        assert!(ZoneStoreRecordWire::from_zone_map(&map).is_err());
    }
}
