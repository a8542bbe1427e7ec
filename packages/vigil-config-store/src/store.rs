use tracing::{error, info, warn};
use vigil_types::ZoneMap;

use crate::backend::NvsBackend;
use crate::error::ConfigError;
use crate::record::{DeviceRecordWire, DeviceSettings, ZoneStoreRecordWire};

const KEY_ZONES: &str = "zones";
const KEY_ZONES_PREV: &str = "zones_prev";
const KEY_ZONES_NEW: &str = "zones_new";
const KEY_DEVICE: &str = "device";
const KEY_NETWORK: &str = "network";
const KEY_SECURITY: &str = "security";

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigStats {
    pub reads: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub rollbacks: u64,
}

/// Owns NVS-backed persistence for zones, device settings, and the two
/// AES-wrapped secret record kinds. Zones get one-generation rollback via a
/// shadow-key atomic write sequence; every other record uses the same
/// sequence without the rollback slot.
pub struct ConfigStore<B: NvsBackend> {
    backend: B,
    stats: ConfigStats,
}

impl<B: NvsBackend> ConfigStore<B> {
    /// Opens the store, discarding any incomplete shadow write and repairing
    /// the primary zone record from its previous generation if it fails
    /// validation.
    pub fn init(mut backend: B) -> Self {
        backend.erase(KEY_ZONES_NEW);

        if let Some(bytes) = backend.get_blob(KEY_ZONES) {
            let valid = ZoneStoreRecordWire::from_bytes(&bytes)
                .and_then(|r| r.to_zone_map())
                .is_ok();
            if !valid {
                warn!("primary zone record failed validation at init, attempting rollback");
                match backend.get_blob(KEY_ZONES_PREV) {
                    Some(prev) if ZoneStoreRecordWire::from_bytes(&prev).and_then(|r| r.to_zone_map()).is_ok() => {
                        let _ = backend.set_blob(KEY_ZONES, &prev);
                        let _ = backend.commit();
                    }
                    _ => {
                        error!("previous zone generation also invalid or absent; erasing primary");
                        backend.erase(KEY_ZONES);
                    }
                }
            }
        }

        Self {
            backend,
            stats: ConfigStats::default(),
        }
    }

    pub fn stats(&self) -> ConfigStats {
        self.stats
    }

    pub fn get_zones(&mut self) -> Result<ZoneMap, ConfigError> {
        self.stats.reads += 1;
        let bytes = self.backend.get_blob(KEY_ZONES).ok_or(ConfigError::NotFound)?;
        ZoneStoreRecordWire::from_bytes(&bytes)?.to_zone_map()
    }

    /// Applies the atomic write sequence from the source's §4.2 contract:
    /// write shadow, copy primary to previous, overwrite primary, erase
    /// shadow, commit. Any failure before step 4 leaves the primary
    /// untouched.
    ///
    /// `map.version` is treated as the base version the caller edited from
    /// (normally whatever `get_zones` last returned, or `0` with no zones
    /// stored yet). It must match the version actually on flash right now or
    /// the write is rejected with `VersionMismatch`, so two concurrent
    /// editors working from the same snapshot can't silently clobber each
    /// other.
    pub fn set_zones(&mut self, map: &ZoneMap) -> Result<(), ConfigError> {
        let current = self.get_zones().ok();
        let current_version = current.as_ref().map(|c| c.version).unwrap_or(0);
        if map.version != current_version {
            return Err(ConfigError::VersionMismatch {
                expected: current_version,
                found: map.version,
            });
        }
        let next_version = current_version + 1;
        let staged = ZoneMap {
            zones: map.zones.clone(),
            version: next_version,
        };
        let record = ZoneStoreRecordWire::from_zone_map(&staged)?;
        let bytes = record.as_bytes();

        // 1 & 2: write the new/shadow key.
        if self.backend.set_blob(KEY_ZONES_NEW, bytes).is_err() {
            self.stats.write_failures += 1;
            return Err(ConfigError::FlashError);
        }

        // 3: copy primary to previous, if a primary exists.
        if let Some(primary) = self.backend.get_blob(KEY_ZONES) {
            if self.backend.set_blob(KEY_ZONES_PREV, &primary).is_err() {
                self.stats.write_failures += 1;
                return Err(ConfigError::FlashError);
            }
        }

        // 4: promote shadow to primary.
        if self.backend.set_blob(KEY_ZONES, bytes).is_err() {
            self.stats.write_failures += 1;
            return Err(ConfigError::FlashError);
        }

        // 5: erase shadow.
        self.backend.erase(KEY_ZONES_NEW);

        // 6: commit.
        if self.backend.commit().is_err() {
            self.stats.write_failures += 1;
            return Err(ConfigError::FlashError);
        }

        self.stats.writes += 1;
        info!(version = staged.version, "zones committed");
        Ok(())
    }

    /// Restores the previous zone generation, if one exists.
    pub fn rollback_zones(&mut self) -> Result<ZoneMap, ConfigError> {
        let prev = self
            .backend
            .get_blob(KEY_ZONES_PREV)
            .ok_or(ConfigError::RollbackUnavailable)?;
        let record = ZoneStoreRecordWire::from_bytes(&prev)?;
        let map = record.to_zone_map()?;
        if self.backend.set_blob(KEY_ZONES, &prev).is_err() || self.backend.commit().is_err() {
            return Err(ConfigError::FlashError);
        }
        self.stats.rollbacks += 1;
        Ok(map)
    }

    pub fn get_device(&mut self) -> Result<DeviceSettings, ConfigError> {
        self.stats.reads += 1;
        let bytes = self.backend.get_blob(KEY_DEVICE).ok_or(ConfigError::NotFound)?;
        let wire: DeviceRecordWire = *bytemuck::try_from_bytes(&bytes)
            .map_err(|_| ConfigError::Invalid("malformed device record".into()))?;
        Ok(wire.to_settings())
    }

    pub fn set_device(&mut self, settings: &DeviceSettings) -> Result<(), ConfigError> {
        let wire = DeviceRecordWire::from_settings(settings)?;
        self.write_simple(KEY_DEVICE, bytemuck::bytes_of(&wire))
    }

    /// Secret records (network, security): body is AES-128-ECB-encrypted
    /// with the device-derived key before going to flash.
    pub fn set_secret(&mut self, kind: SecretKind, key: &[u8; 16], body: &[u8]) -> Result<(), ConfigError> {
        let cipher = crate::crypto::encrypt_secret(key, body);
        self.write_simple(kind.store_key(), &cipher)
    }

    pub fn get_secret(&mut self, kind: SecretKind, key: &[u8; 16]) -> Result<Vec<u8>, ConfigError> {
        self.stats.reads += 1;
        let blob = self
            .backend
            .get_blob(kind.store_key())
            .ok_or(ConfigError::NotFound)?;
        crate::crypto::decrypt_secret(key, &blob)
    }

    fn write_simple(&mut self, key: &str, bytes: &[u8]) -> Result<(), ConfigError> {
        if self.backend.set_blob(key, bytes).is_err() || self.backend.commit().is_err() {
            self.stats.write_failures += 1;
            return Err(ConfigError::FlashError);
        }
        self.stats.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Network,
    Security,
}

impl SecretKind {
    fn store_key(self) -> &'static str {
        match self {
            SecretKind::Network => KEY_NETWORK,
            SecretKind::Security => KEY_SECURITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use vigil_types::{Zone, ZoneType};

    fn zone_map(version: u32) -> ZoneMap {
        ZoneMap {
            zones: vec![Zone {
                id: "a".into(),
                name: "n".into(),
                zone_type: ZoneType::Include,
                vertices: vec![(0, 0), (100, 0), (100, 100)],
                sensitivity: 10,
            }],
            version,
        }
    }

    #[test]
    fn set_then_get_round_trips_with_incremented_version() {
        let mut store = ConfigStore::init(MemoryBackend::new());
        store.set_zones(&zone_map(0)).unwrap();
        let got = store.get_zones().unwrap();
        assert_eq!(got.version, 1);
        store.set_zones(&zone_map(1)).unwrap();
        let got = store.get_zones().unwrap();
        assert_eq!(got.version, 2);
    }

    #[test]
    fn stale_base_version_is_rejected() {
        let mut store = ConfigStore::init(MemoryBackend::new());
        store.set_zones(&zone_map(0)).unwrap();
        assert_eq!(store.get_zones().unwrap().version, 1);

        // Still claiming base version 0 even though flash is already at 1.
        let err = store.set_zones(&zone_map(0)).unwrap_err();
        assert_eq!(err, ConfigError::VersionMismatch { expected: 1, found: 0 });
        assert_eq!(store.get_zones().unwrap().version, 1);
    }

    #[test]
    fn interrupted_write_leaves_primary_untouched() {
        let mut store = ConfigStore::init(MemoryBackend::new());
        store.set_zones(&zone_map(0)).unwrap();
        assert_eq!(store.get_zones().unwrap().version, 1);

        // Fail the write that promotes shadow to primary (the 2nd write call
        // inside set_zones: shadow write succeeds, primary write fails).
        store.backend.fail_in(1);
        assert!(store.set_zones(&zone_map(1)).is_err());

        // Re-init from scratch: shadow is discarded, primary still v1.
        let backend = std::mem::replace(&mut store.backend, MemoryBackend::new());
        let mut reinitialized = ConfigStore::init(backend);
        assert_eq!(reinitialized.get_zones().unwrap().version, 1);
    }

    #[test]
    fn rollback_restores_previous_generation() {
        let mut store = ConfigStore::init(MemoryBackend::new());
        store.set_zones(&zone_map(0)).unwrap();
        store.set_zones(&zone_map(1)).unwrap();
        assert_eq!(store.get_zones().unwrap().version, 2);
        let restored = store.rollback_zones().unwrap();
        assert_eq!(restored.version, 1);
    }

    #[test]
    fn secret_round_trips_through_encryption() {
        let mut store = ConfigStore::init(MemoryBackend::new());
        let key = crate::crypto::derive_device_key(b"\x01\x02\x03\x04\x05\x06");
        store.set_secret(SecretKind::Network, &key, b"wifi-psk-bytes..").unwrap();
        let body = store.get_secret(SecretKind::Network, &key).unwrap();
        assert_eq!(&body[..16], b"wifi-psk-bytes..");
    }
}
