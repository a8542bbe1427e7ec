use thiserror::Error;
use tracing::warn;

pub const MAX_WATCHDOG_SOURCES: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchdogError {
    #[error("no slot available for watchdog source registration")]
    NoSlot,
    #[error("unknown watchdog source '{0}'")]
    UnknownSource(String),
}

/// Multiplexes a single hardware watchdog across up to
/// [`MAX_WATCHDOG_SOURCES`] named feed sources. `check` is expected to be
/// called from the scheduler tick context only.
pub struct Watchdog {
    names: Vec<String>,
    feed_mask: u8,
    expected_mask: u8,
    radar_bit: Option<u8>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            feed_mask: 0,
            expected_mask: 0,
            radar_bit: None,
        }
    }

    pub fn register(&mut self, name: &str) -> Result<u8, WatchdogError> {
        if self.names.len() >= MAX_WATCHDOG_SOURCES {
            return Err(WatchdogError::NoSlot);
        }
        let bit = self.names.len() as u8;
        self.names.push(name.to_string());
        self.expected_mask |= 1 << bit;
        if name == "radar" {
            self.radar_bit = Some(bit);
        }
        Ok(bit)
    }

    fn bit_for(&self, source_id: u8) -> Option<u8> {
        if (source_id as usize) < self.names.len() {
            Some(source_id)
        } else {
            None
        }
    }

    pub fn feed(&mut self, source_id: u8) -> Result<(), WatchdogError> {
        let bit = self
            .bit_for(source_id)
            .ok_or_else(|| WatchdogError::UnknownSource(source_id.to_string()))?;
        self.feed_mask |= 1 << bit;
        Ok(())
    }

    /// Returns true and resets the feed mask iff every expected source fed
    /// since the last check. Callers reset the real hardware watchdog on
    /// `true`.
    pub fn check(&mut self) -> bool {
        let ok = (self.feed_mask & self.expected_mask) == self.expected_mask;
        if ok {
            self.feed_mask = 0;
        }
        ok
    }

    /// Removes the radar source from `expected_mask`, preventing reboot
    /// loops while the radar hardware is disconnected. Idempotent in both
    /// directions.
    pub fn set_radar_disconnected(&mut self, disconnected: bool) {
        let Some(bit) = self.radar_bit else {
            warn!("set_radar_disconnected called with no radar source registered");
            return;
        };
        if disconnected {
            self.expected_mask &= !(1 << bit);
        } else {
            self.expected_mask |= 1 << bit;
        }
    }

    pub fn expected_mask(&self) -> u8 {
        self.expected_mask
    }

    pub fn feed_mask(&self) -> u8 {
        self.feed_mask
    }
}
