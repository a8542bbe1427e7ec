use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    #[error("signature block magic did not match \"OPFW\"")]
    InvalidMagic,
    #[error("embedded public key is not in the trusted-keys table, or is revoked")]
    UntrustedKey,
    #[error("image sha256 does not match the signature block's recorded hash")]
    HashMismatch,
    #[error("ECDSA-P256 signature failed verification")]
    SignatureInvalid,
    #[error("firmware version is below the anti-rollback minimum")]
    AntiRollbackBlocked,
}
