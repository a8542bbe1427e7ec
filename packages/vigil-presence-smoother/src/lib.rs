//! Four-state debounce filter over raw per-zone occupancy, with a binary
//! fast path for presence-radar-only devices.

mod debounce;
mod smoother;

pub use debounce::{RawTick, SensitivityConfig, ZoneDebounce};
pub use smoother::{Smoother, GLOBAL_ZONE_ID};
