use ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::SecurityError;
use crate::events::SecurityEvent;

/// Trailing signature block on a firmware image, 256 bytes, byte-exact.
/// The source's prose gives a 32-byte `reserved` field but a 256-byte total
/// block with the trailing hash covering `block[0..224]`; those two claims
/// are only consistent if `reserved` is 48 bytes, so this struct uses 48 —
/// see the project's design notes for this resolution.
pub const SIGNATURE_BLOCK_LEN: usize = 256;
const MAGIC: &[u8; 4] = b"OPFW";

#[derive(Debug, Clone)]
pub struct FirmwareSignatureBlock {
    pub format_version: u32,
    pub sha256_of_image: [u8; 32],
    pub signature: [u8; 64],
    pub public_key: [u8; 64],
    pub fw_version: u32,
    pub build_timestamp: u32,
    pub reserved: [u8; 48],
    pub sha256_of_block: [u8; 32],
}

impl FirmwareSignatureBlock {
    pub fn parse(bytes: &[u8]) -> Result<Self, SecurityError> {
        if bytes.len() != SIGNATURE_BLOCK_LEN {
            return Err(SecurityError::InvalidMagic);
        }
        if &bytes[0..4] != MAGIC {
            return Err(SecurityError::InvalidMagic);
        }
        let format_version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let mut sha256_of_image = [0u8; 32];
        sha256_of_image.copy_from_slice(&bytes[8..40]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[40..104]);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&bytes[104..168]);
        let fw_version = u32::from_le_bytes(bytes[168..172].try_into().unwrap());
        let build_timestamp = u32::from_le_bytes(bytes[172..176].try_into().unwrap());
        let mut reserved = [0u8; 48];
        reserved.copy_from_slice(&bytes[176..224]);
        let mut sha256_of_block = [0u8; 32];
        sha256_of_block.copy_from_slice(&bytes[224..256]);
        Ok(Self {
            format_version,
            sha256_of_image,
            signature,
            public_key,
            fw_version,
            build_timestamp,
            reserved,
            sha256_of_block,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TrustedKey {
    pub public_key: [u8; 64],
    pub revoked: bool,
}

/// ECDSA-P256 firmware signature verification plus the anti-rollback gate.
/// An empty trusted-keys table accepts any key — a deliberately loud
/// development-build behavior, never silent.
pub struct FirmwareVerifier {
    trusted_keys: Vec<TrustedKey>,
    min_version: u32,
    observers: Vec<Box<dyn Fn(SecurityEvent) + Send>>,
}

impl Default for FirmwareVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FirmwareVerifier {
    pub fn new() -> Self {
        Self {
            trusted_keys: Vec::new(),
            min_version: 0,
            observers: Vec::new(),
        }
    }

    pub fn add_trusted_key(&mut self, public_key: [u8; 64]) {
        self.trusted_keys.push(TrustedKey {
            public_key,
            revoked: false,
        });
    }

    pub fn revoke_key(&mut self, public_key: &[u8; 64]) {
        if let Some(k) = self.trusted_keys.iter_mut().find(|k| &k.public_key == public_key) {
            k.revoked = true;
        }
    }

    pub fn min_version(&self) -> u32 {
        self.min_version
    }

    pub fn observe(&mut self, f: impl Fn(SecurityEvent) + Send + 'static) {
        self.observers.push(Box::new(f));
    }

    fn emit(&self, event: SecurityEvent) {
        for obs in &self.observers {
            obs(event.clone());
        }
    }

    /// Runs the full verification sequence from the source's §4.3 contract
    /// against `image`, whose trailing [`SIGNATURE_BLOCK_LEN`] bytes are the
    /// signature block.
    pub fn verify(&mut self, image: &[u8]) -> Result<FirmwareSignatureBlock, SecurityError> {
        if image.len() < SIGNATURE_BLOCK_LEN {
            self.emit(SecurityEvent::BootFailed(SecurityError::InvalidMagic));
            return Err(SecurityError::InvalidMagic);
        }
        let split = image.len() - SIGNATURE_BLOCK_LEN;
        let (payload, block_bytes) = image.split_at(split);
        let block = match FirmwareSignatureBlock::parse(block_bytes) {
            Ok(b) => b,
            Err(e) => {
                self.emit(SecurityEvent::BootFailed(e));
                return Err(e);
            }
        };

        if !self.trusted_keys.is_empty() {
            let trusted = self
                .trusted_keys
                .iter()
                .any(|k| k.public_key == block.public_key && !k.revoked);
            if !trusted {
                self.emit(SecurityEvent::BootFailed(SecurityError::UntrustedKey));
                return Err(SecurityError::UntrustedKey);
            }
        } else {
            warn!("trusted-keys table is empty; accepting any embedded key (development build)");
        }

        let computed_hash: [u8; 32] = Sha256::digest(payload).into();
        if computed_hash != block.sha256_of_image {
            self.emit(SecurityEvent::BootFailed(SecurityError::HashMismatch));
            return Err(SecurityError::HashMismatch);
        }

        let mut uncompressed = [0u8; 65];
        uncompressed[0] = 0x04;
        uncompressed[1..].copy_from_slice(&block.public_key);
        let verify_result = VerifyingKey::from_sec1_bytes(&uncompressed)
            .ok()
            .zip(Signature::from_slice(&block.signature).ok())
            .map(|(key, sig)| key.verify_prehash(&block.sha256_of_image, &sig).is_ok())
            .unwrap_or(false);
        if !verify_result {
            self.emit(SecurityEvent::BootFailed(SecurityError::SignatureInvalid));
            return Err(SecurityError::SignatureInvalid);
        }

        if block.fw_version < self.min_version {
            self.emit(SecurityEvent::RollbackBlocked);
            return Err(SecurityError::AntiRollbackBlocked);
        }

        Ok(block)
    }

    /// Raises the anti-rollback floor. Never allowed to decrease.
    pub fn raise_min_version(&mut self, version: u32) {
        if version > self.min_version {
            self.min_version = version;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecdsa::signature::hazmat::PrehashSigner;
    use p256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    fn build_signed_image(payload: &[u8], signing_key: &SigningKey, fw_version: u32) -> Vec<u8> {
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
        // reserved[48] left zeroed; final hash computed over block[0..224]
        let block_hash: [u8; 32] = Sha256::digest(&block[0..224]).into();
        block[224..256].copy_from_slice(&block_hash);

        let mut image = payload.to_vec();
        image.extend(block);
        image
    }

    #[test]
    fn valid_signature_verifies() {
        let signing_key = SigningKey::random(&mut OsRng);
        let payload = b"firmware bytes go here".to_vec();
        let image = build_signed_image(&payload, &signing_key, 5);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&point.as_bytes()[1..]);

        let mut verifier = FirmwareVerifier::new();
        verifier.add_trusted_key(public_key);
        let block = verifier.verify(&image).unwrap();
        assert_eq!(block.fw_version, 5);
    }

    #[test]
    fn untrusted_key_rejected() {
        let signing_key = SigningKey::random(&mut OsRng);
        let payload = b"firmware bytes go here".to_vec();
        let image = build_signed_image(&payload, &signing_key, 5);

        let mut verifier = FirmwareVerifier::new();
        let other_key = [0u8; 64];
        verifier.add_trusted_key(other_key);
        assert!(matches!(
            verifier.verify(&image),
            Err(SecurityError::UntrustedKey)
        ));
    }

    #[test]
    fn anti_rollback_blocks_old_version() {
        let signing_key = SigningKey::random(&mut OsRng);
        let payload = b"firmware bytes go here".to_vec();
        let image = build_signed_image(&payload, &signing_key, 3);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&point.as_bytes()[1..]);

        let mut verifier = FirmwareVerifier::new();
        verifier.add_trusted_key(public_key);
        verifier.raise_min_version(4);
        assert!(matches!(
            verifier.verify(&image),
            Err(SecurityError::AntiRollbackBlocked)
        ));
    }

    #[test]
    fn tampered_payload_fails_hash_check() {
        let signing_key = SigningKey::random(&mut OsRng);
        let payload = b"firmware bytes go here".to_vec();
        let mut image = build_signed_image(&payload, &signing_key, 5);
        image[0] ^= 0xFF;
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&point.as_bytes()[1..]);

        let mut verifier = FirmwareVerifier::new();
        verifier.add_trusted_key(public_key);
        assert!(matches!(
            verifier.verify(&image),
            Err(SecurityError::HashMismatch)
        ));
    }
}
