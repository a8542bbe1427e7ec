//! Device identity, firmware signature verification, anti-rollback, and
//! authentication (password + session tokens).

mod auth;
mod error;
mod events;
mod firmware;
mod identity;

pub use auth::{PasswordAuth, SessionStore};
pub use error::SecurityError;
pub use events::SecurityEvent;
pub use firmware::{FirmwareSignatureBlock, FirmwareVerifier, TrustedKey, SIGNATURE_BLOCK_LEN};
pub use identity::DeviceIdentity;

/// Facade bundling the pieces above, mirroring the source's single
/// `security` module state. Most callers only ever touch this type.
pub struct Security {
    pub identity: DeviceIdentity,
    pub verifier: FirmwareVerifier,
    pub password: Option<PasswordAuth>,
    pub sessions: SessionStore,
}

impl Security {
    pub fn new(mac_address: &[u8], session_timeout_ms: u64) -> Self {
        Self {
            identity: DeviceIdentity::derive(mac_address),
            verifier: FirmwareVerifier::new(),
            password: None,
            sessions: SessionStore::new(session_timeout_ms),
        }
    }
}
