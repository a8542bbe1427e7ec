use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Stable per-device identity derived from the station MAC address.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub device_id: [u8; 16],
    pub device_secret: [u8; 32],
}

impl DeviceIdentity {
    /// `device_id = SHA-256(mac || "opticworks-rs1")[0..16]`;
    /// `device_secret = SHA-256(device_id)`.
    pub fn derive(mac_address: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(mac_address);
        hasher.update(b"opticworks-rs1");
        let full = hasher.finalize();
        let mut device_id = [0u8; 16];
        device_id.copy_from_slice(&full[..16]);

        let device_secret: [u8; 32] = Sha256::digest(device_id).into();

        Self {
            device_id,
            device_secret,
        }
    }

    pub fn device_id_hex(&self) -> String {
        hex::encode(self.device_id)
    }

    /// `base64(HMAC-SHA256(device_secret, device_id || timestamp_le32))`,
    /// used as the MQTT broker password for this device.
    pub fn mqtt_password(&self, timestamp_unix: u32) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.device_secret).expect("hmac accepts any key length");
        mac.update(&self.device_id);
        mac.update(&timestamp_unix.to_le_bytes());
        let tag = mac.finalize().into_bytes();
        BASE64.encode(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_stable_for_same_mac() {
        let a = DeviceIdentity::derive(b"\x01\x02\x03\x04\x05\x06");
        let b = DeviceIdentity::derive(b"\x01\x02\x03\x04\x05\x06");
        assert_eq!(a.device_id, b.device_id);
        assert_eq!(a.device_secret, b.device_secret);
    }

    #[test]
    fn different_macs_differ() {
        let a = DeviceIdentity::derive(b"\x01\x02\x03\x04\x05\x06");
        let b = DeviceIdentity::derive(b"\xAA\xBB\xCC\xDD\xEE\xFF");
        assert_ne!(a.device_id, b.device_id);
    }

    #[test]
    fn mqtt_password_changes_with_timestamp() {
        let id = DeviceIdentity::derive(b"\x01\x02\x03\x04\x05\x06");
        assert_ne!(id.mqtt_password(1000), id.mqtt_password(2000));
    }
}
