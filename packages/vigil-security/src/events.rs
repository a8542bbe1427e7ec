use crate::error::SecurityError;

/// Fired from [`crate::firmware::FirmwareVerifier`] on boot-time verification
/// outcomes, mirroring the source's `security_event_callback_t` event set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    BootFailed(SecurityError),
    RollbackBlocked,
    SessionCreated,
    SessionEvicted,
}
