use vigil_types::{OtaError, OtaManifest};

use crate::manifest::min_rssi;

/// Ambient conditions checked before a download begins. Supplied by the
/// caller each trigger since they reflect live device state, not OTA state.
#[derive(Debug, Clone, Copy)]
pub struct PreflightContext {
    pub current_version: u32,
    pub anti_rollback_min: u32,
    pub current_rssi: i8,
    pub free_heap_bytes: u64,
    pub min_free_heap_bytes: u64,
    pub spare_partition_available: bool,
}

/// Runs gates (a)-(e) in order, short-circuiting on the first failure. (a)
/// is skipped when `manifest.force` is set; (b) is never skipped.
pub fn run_preflight(manifest: &OtaManifest, ctx: &PreflightContext) -> Result<(), OtaError> {
    if !manifest.force && manifest.version <= ctx.current_version {
        return Err(OtaError::VersionCheck);
    }
    if manifest.version < ctx.anti_rollback_min {
        return Err(OtaError::VersionCheck);
    }
    if ctx.current_rssi < min_rssi(manifest) {
        return Err(OtaError::RssiTooLow);
    }
    if ctx.free_heap_bytes < ctx.min_free_heap_bytes {
        return Err(OtaError::LowMemory);
    }
    if !ctx.spare_partition_available {
        return Err(OtaError::NoPartition);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(version: u32, force: bool) -> OtaManifest {
        OtaManifest {
            version,
            url: "https://updates.example/fw.bin".to_string(),
            sha256: "a".repeat(64),
            min_rssi: None,
            rollout_id: None,
            force,
        }
    }

    fn ctx() -> PreflightContext {
        PreflightContext {
            current_version: 5,
            anti_rollback_min: 3,
            current_rssi: -50,
            free_heap_bytes: 100_000,
            min_free_heap_bytes: 50_000,
            spare_partition_available: true,
        }
    }

    #[test]
    fn older_version_rejected_without_force() {
        assert_eq!(
            run_preflight(&manifest(5, false), &ctx()),
            Err(OtaError::VersionCheck)
        );
    }

    #[test]
    fn force_skips_the_newer_than_current_gate() {
        let mut c = ctx();
        c.current_version = 10;
        assert!(run_preflight(&manifest(5, true), &c).is_ok());
    }

    #[test]
    fn anti_rollback_never_skipped_even_with_force() {
        let mut c = ctx();
        c.anti_rollback_min = 20;
        assert_eq!(
            run_preflight(&manifest(10, true), &c),
            Err(OtaError::VersionCheck)
        );
    }

    #[test]
    fn low_heap_rejected() {
        let mut c = ctx();
        c.free_heap_bytes = 1000;
        assert_eq!(
            run_preflight(&manifest(6, false), &c),
            Err(OtaError::LowMemory)
        );
    }
}
