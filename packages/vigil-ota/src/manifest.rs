use vigil_types::{OtaError, OtaManifest};

/// Validates the strict manifest schema: required fields present, url/hex
/// lengths in bounds. Optional fields already carry serde defaults.
pub fn validate_manifest(manifest: &OtaManifest) -> Result<(), OtaError> {
    if manifest.url.is_empty() || manifest.url.len() > 256 {
        return Err(OtaError::InvalidManifest);
    }
    if manifest.sha256.len() != 64 || !manifest.sha256.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(OtaError::InvalidManifest);
    }
    if let Some(rollout_id) = &manifest.rollout_id {
        if rollout_id.len() > 36 {
            return Err(OtaError::InvalidManifest);
        }
    }
    Ok(())
}

pub fn min_rssi(manifest: &OtaManifest) -> i8 {
    manifest.min_rssi.unwrap_or(-70)
}
