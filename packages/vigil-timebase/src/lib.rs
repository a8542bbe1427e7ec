//! Monotonic clock, frame-jitter meter, cooperative scheduler, and
//! multi-source watchdog. Nothing here reads the wall clock implicitly;
//! state changes and logs are keyed to monotonic milliseconds everywhere,
//! per the source's caution against trusting an unsynced RTC.

mod scheduler;
mod watchdog;

pub use scheduler::{Scheduler, SchedulerError, MAX_TASKS};
pub use watchdog::{Watchdog, WatchdogError, MAX_WATCHDOG_SOURCES};

use std::time::Instant;

/// Monotonic clock plus frame-arrival jitter tracking for one radar stream.
///
/// Each radar stream (tracking, presence) owns its own `Timebase` so their
/// jitter statistics don't mix; `monotonic_us`/`uptime_ms` are nonetheless
/// process-wide-equivalent since they derive from `Instant`, which has a
/// fixed, arbitrary epoch per process.
pub struct Timebase {
    epoch: Instant,
    expected_interval_ms: u64,
    last_frame_ms: Option<u64>,
    actual_interval_ms: u64,
    max_jitter_ms: u64,
    missed_frames: u64,
    total_frames: u64,
    wall_synced: bool,
}

impl Timebase {
    pub fn new(expected_interval_ms: u64) -> Self {
        Self {
            epoch: Instant::now(),
            expected_interval_ms,
            last_frame_ms: None,
            actual_interval_ms: expected_interval_ms,
            max_jitter_ms: 0,
            missed_frames: 0,
            total_frames: 0,
            wall_synced: false,
        }
    }

    pub fn monotonic_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    pub fn uptime_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Wall-clock milliseconds since Unix epoch, or 0 if never marked synced.
    /// Callers must not treat 0 as a valid timestamp.
    pub fn wall_clock_ms(&self) -> u64 {
        if !self.wall_synced {
            return 0;
        }
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn mark_wall_synced(&mut self) {
        self.wall_synced = true;
    }

    /// Records a frame arrival at `now_ms`, updating jitter/miss accounting.
    pub fn frame_received(&mut self, now_ms: u64) {
        self.total_frames += 1;
        if let Some(prev) = self.last_frame_ms {
            let interval = now_ms.saturating_sub(prev);
            self.actual_interval_ms = interval;
            let deviation = interval.abs_diff(self.expected_interval_ms);
            if deviation > self.max_jitter_ms {
                self.max_jitter_ms = deviation;
            }
            if self.expected_interval_ms > 0 && interval > 2 * self.expected_interval_ms {
                let ratio = interval / self.expected_interval_ms;
                self.missed_frames += ratio.saturating_sub(1);
            }
        }
        self.last_frame_ms = Some(now_ms);
    }

    /// True iff no frame has arrived for more than twice the expected interval.
    pub fn frame_late(&self, now_ms: u64) -> bool {
        match self.last_frame_ms {
            Some(last) => now_ms.saturating_sub(last) > 2 * self.expected_interval_ms,
            None => false,
        }
    }

    pub fn expected_interval_ms(&self) -> u64 {
        self.expected_interval_ms
    }

    pub fn actual_interval_ms(&self) -> u64 {
        self.actual_interval_ms
    }

    pub fn max_jitter_ms(&self) -> u64 {
        self.max_jitter_ms
    }

    pub fn missed_frames(&self) -> u64 {
        self.missed_frames
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}
