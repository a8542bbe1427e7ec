use aes::Aes128;
use ecb::cipher::generic_array::GenericArray;
use ecb::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ConfigError;

const DEVICE_KEY_SALT: &[u8] = b"rs1_config_key_v1";

type HmacSha256 = Hmac<Sha256>;
type EcbEnc = ecb::Encryptor<Aes128>;
type EcbDec = ecb::Decryptor<Aes128>;

/// Derives the 16-byte AES-128 key used to wrap secret records:
/// `HMAC-SHA256(salt="rs1_config_key_v1", mac_address)[0..16]`.
pub fn derive_device_key(mac_address: &[u8]) -> [u8; 16] {
    let mut mac = HmacSha256::new_from_slice(DEVICE_KEY_SALT).expect("hmac accepts any key length");
    mac.update(mac_address);
    let full = mac.finalize().into_bytes();
    let mut key = [0u8; 16];
    key.copy_from_slice(&full[..16]);
    key
}

fn zero_pad_to_block(body: &[u8]) -> Vec<u8> {
    let mut padded = body.to_vec();
    let rem = padded.len() % 16;
    if rem != 0 {
        padded.extend(std::iter::repeat(0u8).take(16 - rem));
    }
    padded
}

/// Encrypts `body` with AES-128-ECB using `key`, zero-padding to a multiple
/// of the 16-byte block size. ECB is deliberate here: records are
/// fixed-layout small structs, not user text, matching the on-disk format
/// this store interoperates with.
pub fn encrypt_secret(key: &[u8; 16], body: &[u8]) -> Vec<u8> {
    let mut buf = zero_pad_to_block(body);
    let mut encryptor = EcbEnc::new_from_slice(key).expect("16-byte key");
    for chunk in buf.chunks_exact_mut(16) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(chunk));
    }
    buf
}

pub fn decrypt_secret(key: &[u8; 16], blob: &[u8]) -> Result<Vec<u8>, ConfigError> {
    if blob.len() % 16 != 0 {
        return Err(ConfigError::Invalid("secret blob length not block-aligned".into()));
    }
    let mut buf = blob.to_vec();
    let mut decryptor = EcbDec::new_from_slice(key).expect("16-byte key");
    for chunk in buf.chunks_exact_mut(16) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(chunk));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trips() {
        let key = derive_device_key(b"\x01\x02\x03\x04\x05\x06");
        let body = b"a fixed-layout secret record..";
        let cipher = encrypt_secret(&key, body);
        let plain = decrypt_secret(&key, &cipher).unwrap();
        assert_eq!(&plain[..body.len()], body);
    }

    #[test]
    fn device_key_is_stable_for_same_mac() {
        let a = derive_device_key(b"\xAA\xBB\xCC\xDD\xEE\xFF");
        let b = derive_device_key(b"\xAA\xBB\xCC\xDD\xEE\xFF");
        assert_eq!(a, b);
    }
}
