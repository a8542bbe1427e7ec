use sha2::{Digest, Sha256};
use tracing::{info, warn};
use vigil_security::FirmwareVerifier;
use vigil_types::{OtaError, OtaManifest, OtaProgress, OtaStatus};

use crate::downloader::Downloader;
use crate::manifest::validate_manifest;
use crate::preflight::{run_preflight, PreflightContext};

const RETRY_BACKOFFS_MS: [u64; 3] = [60_000, 300_000, 1_800_000];
const MAX_RETRIES: u32 = 3;

/// Drives one manifest through download -> verify -> install -> commit,
/// with bounded retries on a fixed backoff schedule. A caller holds one
/// instance per in-flight (or idle) update.
pub struct OtaStateMachine {
    progress: OtaProgress,
    downloader: Option<Box<dyn Downloader>>,
    download_buf: Vec<u8>,
    pending_sha256: Option<String>,
    abort_requested: bool,
    retry_backoff_ms: Option<u64>,
    pub rollbacks: u64,
    pub updates_failed: u64,
}

impl OtaStateMachine {
    pub fn new() -> Self {
        Self {
            progress: OtaProgress::idle(),
            downloader: None,
            download_buf: Vec::new(),
            pending_sha256: None,
            abort_requested: false,
            retry_backoff_ms: None,
            rollbacks: 0,
            updates_failed: 0,
        }
    }

    pub fn progress(&self) -> &OtaProgress {
        &self.progress
    }

    /// Delay the caller should wait before re-triggering, set after a
    /// failure with retries remaining; `None` once retries are exhausted or
    /// after a successful trigger.
    pub fn retry_backoff_ms(&self) -> Option<u64> {
        self.retry_backoff_ms
    }

    /// Validates the manifest and runs preflight gates; on success, arms a
    /// downloader and moves to `Pending`/`Downloading`. Does not perform any
    /// I/O beyond what `downloader` does when polled.
    pub fn trigger(
        &mut self,
        manifest: OtaManifest,
        ctx: &PreflightContext,
        downloader: Box<dyn Downloader>,
    ) -> Result<(), OtaError> {
        if matches!(
            self.progress.status,
            OtaStatus::Downloading | OtaStatus::Verifying | OtaStatus::Installing
        ) {
            return Err(OtaError::Busy);
        }
        if let Err(e) = validate_manifest(&manifest) {
            self.fail(e);
            return Err(e);
        }
        if let Err(e) = run_preflight(&manifest, ctx) {
            self.fail(e);
            return Err(e);
        }

        self.progress = OtaProgress {
            status: OtaStatus::Pending,
            error: None,
            target_version: manifest.version,
            bytes_downloaded: 0,
            total_bytes: downloader.total_bytes(),
            percent: 0,
            retry_count: self.progress.retry_count,
            rollout_id: manifest.rollout_id.clone(),
            error_msg: None,
        };
        self.downloader = Some(downloader);
        self.download_buf.clear();
        self.abort_requested = false;
        self.progress.status = OtaStatus::Downloading;
        self.pending_sha256 = Some(manifest.sha256.clone());
        Ok(())
    }

    pub fn abort(&mut self) {
        self.abort_requested = true;
    }

    /// Pulls one chunk from the downloader. Call repeatedly until status
    /// leaves `Downloading`.
    pub fn poll_download(&mut self) {
        if self.progress.status != OtaStatus::Downloading {
            return;
        }
        if self.abort_requested {
            info!("ota download aborted");
            self.downloader = None;
            self.progress = OtaProgress::idle();
            return;
        }
        let Some(downloader) = self.downloader.as_mut() else {
            return;
        };
        match downloader.fetch_chunk() {
            Ok(Some(chunk)) => {
                self.download_buf.extend_from_slice(&chunk);
                self.progress.bytes_downloaded = self.download_buf.len() as u64;
                if self.progress.total_bytes > 0 {
                    self.progress.percent =
                        ((self.progress.bytes_downloaded * 100) / self.progress.total_bytes) as u8;
                }
            }
            Ok(None) => {
                self.progress.status = OtaStatus::Verifying;
            }
            Err(e) => self.fail(e),
        }
    }

    /// Verifies the downloaded image's sha256 against the manifest and its
    /// embedded signature block against `verifier`.
    pub fn verify_and_install(&mut self, verifier: &mut FirmwareVerifier) {
        if self.progress.status != OtaStatus::Verifying {
            return;
        }
        let Some(expected_hex) = self.pending_sha256.take() else {
            self.fail(OtaError::InvalidManifest);
            return;
        };
        let computed = hex::encode(Sha256::digest(&self.download_buf));
        if computed != expected_hex {
            self.fail(OtaError::HashMismatch);
            return;
        }
        if verifier.verify(&self.download_buf).is_err() {
            self.fail(OtaError::SignatureInvalid);
            return;
        }
        self.progress.status = OtaStatus::Installing;
        // Installing a buffered image onto the spare partition is the
        // caller's hardware-level concern; from here it's a direct success.
        self.progress.status = OtaStatus::Success;
    }

    pub fn downloaded_image(&self) -> &[u8] {
        &self.download_buf
    }

    /// Called from the new image's first boot. Failing to confirm within
    /// the bounded window is the caller's responsibility to detect and
    /// react to by invoking [`Self::rollback`] instead.
    pub fn mark_valid(&mut self) {
        self.progress = OtaProgress::idle();
        self.retry_backoff_ms = None;
    }

    pub fn rollback(&mut self) {
        self.rollbacks += 1;
        self.progress.status = OtaStatus::Rollback;
    }

    fn fail(&mut self, error: OtaError) {
        warn!(?error, "ota update failed");
        self.updates_failed += 1;
        self.progress.status = OtaStatus::Failed;
        self.progress.error = Some(error);
        self.progress.error_msg = Some(error.message().to_string());
        self.downloader = None;
        if self.progress.retry_count < MAX_RETRIES {
            self.retry_backoff_ms = Some(RETRY_BACKOFFS_MS[self.progress.retry_count as usize]);
            self.progress.retry_count += 1;
        } else {
            self.retry_backoff_ms = None;
        }
    }
}

impl Default for OtaStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::MockDownloader;
    use ecdsa::signature::hazmat::PrehashSigner;
    use p256::ecdsa::{Signature, SigningKey};
    use rand::rngs::OsRng;
    use vigil_security::SIGNATURE_BLOCK_LEN;

    fn signed_image(payload: &[u8], signing_key: &SigningKey, fw_version: u32) -> Vec<u8> {
        let hash: [u8; 32] = Sha256::digest(payload).into();
        let signature: Signature = signing_key.sign_prehash(&hash).unwrap();
        let verifying = signing_key.verifying_key();
        let point = verifying.to_encoded_point(false);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&point.as_bytes()[1..]);

        let mut block = vec![0u8; SIGNATURE_BLOCK_LEN];
        block[0..4].copy_from_slice(b"OPFW");
        block[4..8].copy_from_slice(&1u32.to_le_bytes());
        block[8..40].copy_from_slice(&hash);
        block[40..104].copy_from_slice(&signature.to_bytes());
        block[104..168].copy_from_slice(&public_key);
        block[168..172].copy_from_slice(&fw_version.to_le_bytes());
        block[172..176].copy_from_slice(&0u32.to_le_bytes());
        let block_hash: [u8; 32] = Sha256::digest(&block[0..224]).into();
        block[224..256].copy_from_slice(&block_hash);

        let mut image = payload.to_vec();
        image.extend(block);
        image
    }

    fn ctx() -> PreflightContext {
        PreflightContext {
            current_version: 1,
            anti_rollback_min: 0,
            current_rssi: -40,
            free_heap_bytes: 100_000,
            min_free_heap_bytes: 10_000,
            spare_partition_available: true,
        }
    }

    fn manifest(version: u32, sha256: String) -> OtaManifest {
        OtaManifest {
            version,
            url: "https://updates.example/fw.bin".to_string(),
            sha256,
            min_rssi: None,
            rollout_id: None,
            force: false,
        }
    }

    fn run_to_completion(machine: &mut OtaStateMachine, verifier: &mut FirmwareVerifier) {
        while machine.progress().status == OtaStatus::Downloading {
            machine.poll_download();
        }
        machine.verify_and_install(verifier);
    }

    #[test]
    fn full_update_succeeds_with_valid_signature() {
        let signing_key = SigningKey::random(&mut OsRng);
        let payload = b"firmware payload bytes".to_vec();
        let image = signed_image(&payload, &signing_key, 2);
        let sha256 = hex::encode(Sha256::digest(&image));

        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&point.as_bytes()[1..]);
        let mut verifier = FirmwareVerifier::new();
        verifier.add_trusted_key(public_key);

        let mut machine = OtaStateMachine::new();
        machine
            .trigger(
                manifest(2, sha256),
                &ctx(),
                Box::new(MockDownloader::new(image, 8)),
            )
            .unwrap();

        run_to_completion(&mut machine, &mut verifier);
        assert_eq!(machine.progress().status, OtaStatus::Success);
    }

    #[test]
    fn hash_mismatch_fails_and_schedules_retry() {
        let signing_key = SigningKey::random(&mut OsRng);
        let payload = b"firmware payload bytes".to_vec();
        let image = signed_image(&payload, &signing_key, 2);

        let mut verifier = FirmwareVerifier::new();
        let mut machine = OtaStateMachine::new();
        machine
            .trigger(
                manifest(2, "f".repeat(64)),
                &ctx(),
                Box::new(MockDownloader::new(image, 8)),
            )
            .unwrap();

        run_to_completion(&mut machine, &mut verifier);
        assert_eq!(machine.progress().status, OtaStatus::Failed);
        assert_eq!(machine.progress().error, Some(OtaError::HashMismatch));
        assert_eq!(machine.retry_backoff_ms(), Some(60_000));
        assert_eq!(machine.updates_failed, 1);
    }

    #[test]
    fn abort_mid_download_returns_to_idle() {
        let image = vec![0u8; 64];
        let mut machine = OtaStateMachine::new();
        machine
            .trigger(
                manifest(2, "a".repeat(64)),
                &ctx(),
                Box::new(MockDownloader::new(image, 8)),
            )
            .unwrap();
        machine.poll_download();
        machine.abort();
        machine.poll_download();
        assert_eq!(machine.progress().status, OtaStatus::Idle);
    }

    #[test]
    fn preflight_rejection_never_starts_a_download() {
        let mut machine = OtaStateMachine::new();
        let mut c = ctx();
        c.current_version = 10;
        let err = machine
            .trigger(
                manifest(2, "a".repeat(64)),
                &c,
                Box::new(MockDownloader::new(vec![0u8; 8], 8)),
            )
            .unwrap_err();
        assert_eq!(err, OtaError::VersionCheck);
        assert_eq!(machine.progress().status, OtaStatus::Failed);
    }
}
