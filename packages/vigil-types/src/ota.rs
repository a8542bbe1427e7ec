use serde::{Deserialize, Serialize};

/// The JSON manifest a caller hands to the OTA state machine. Strict schema:
/// missing required fields is an `InvalidManifest` rejection, not a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtaManifest {
    pub version: u32,
    pub url: String,
    pub sha256: String,
    #[serde(default)]
    pub min_rssi: Option<i8>,
    #[serde(default)]
    pub rollout_id: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtaStatus {
    Idle,
    Pending,
    Downloading,
    Verifying,
    Installing,
    Success,
    Failed,
    Rollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtaError {
    InvalidManifest,
    VersionCheck,
    RssiTooLow,
    DownloadFailed,
    HashMismatch,
    SignatureInvalid,
    FlashWrite,
    NoPartition,
    LowMemory,
    Timeout,
    Busy,
}

impl OtaError {
    pub fn message(self) -> &'static str {
        match self {
            OtaError::InvalidManifest => "manifest failed schema validation",
            OtaError::VersionCheck => "target version is not newer than the installed version",
            OtaError::RssiTooLow => "signal strength below the manifest's minimum RSSI",
            OtaError::DownloadFailed => "firmware image download failed",
            OtaError::HashMismatch => "downloaded image does not match the manifest sha256",
            OtaError::SignatureInvalid => "firmware signature block failed verification",
            OtaError::FlashWrite => "writing the update partition failed",
            OtaError::NoPartition => "no spare update partition is available",
            OtaError::LowMemory => "insufficient free heap to begin the update",
            OtaError::Timeout => "update download exceeded its time budget",
            OtaError::Busy => "an update is already in progress",
        }
    }
}

/// Published progress for the OTA state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtaProgress {
    pub status: OtaStatus,
    pub error: Option<OtaError>,
    pub target_version: u32,
    pub bytes_downloaded: u64,
    pub total_bytes: u64,
    pub percent: u8,
    pub retry_count: u32,
    pub rollout_id: Option<String>,
    pub error_msg: Option<String>,
}

impl OtaProgress {
    pub fn idle() -> Self {
        Self {
            status: OtaStatus::Idle,
            error: None,
            target_version: 0,
            bytes_downloaded: 0,
            total_bytes: 0,
            percent: 0,
            retry_count: 0,
            rollout_id: None,
            error_msg: None,
        }
    }
}
