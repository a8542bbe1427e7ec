use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("record not found")]
    NotFound,
    #[error("record failed structural validation: {0}")]
    Invalid(String),
    #[error("checksum mismatch")]
    Checksum,
    #[error("store is full")]
    Full,
    #[error("underlying flash write failed")]
    FlashError,
    #[error("no previous generation available to roll back to")]
    RollbackUnavailable,
    #[error("config store has not been initialized")]
    NotInitialized,
    #[error("zone map version mismatch: expected base {expected}, got {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
