//! Manifest validation, preflight gates, and the download/verify/install/
//! commit state machine with bounded retries.

mod downloader;
mod manifest;
mod preflight;
mod state_machine;

pub use downloader::{Downloader, MockDownloader};
pub use manifest::{min_rssi, validate_manifest};
pub use preflight::{run_preflight, PreflightContext};
pub use state_machine::OtaStateMachine;
