use vigil_types::SmootherFsmState;

#[derive(Debug, Clone, Copy)]
pub struct SensitivityConfig {
    pub sensitivity: u8,
    pub confidence_weighting: bool,
    pub min_hold_ms: u64,
    pub max_hold_ms: u64,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            sensitivity: 50,
            confidence_weighting: true,
            min_hold_ms: 100,
            max_hold_ms: 5000,
        }
    }
}

impl SensitivityConfig {
    pub fn hold_time_ms(&self) -> u64 {
        (100 - self.sensitivity as u64) * 50
    }

    pub fn enter_delay_ms(&self) -> u64 {
        (100 - self.sensitivity as u64) * 5
    }

    /// Applies confidence weighting on top of the base hold time: boosted
    /// 1.5x (capped at `max_hold_ms`) above 80, halved (floored at
    /// `min_hold_ms`) below 30.
    fn effective_hold_ms(&self, avg_confidence: u8) -> (u64, bool) {
        let base = self.hold_time_ms();
        if !self.confidence_weighting {
            return (base, false);
        }
        if avg_confidence > 80 {
            let boosted = ((base as f64 * 1.5) as u64).min(self.max_hold_ms);
            (boosted, true)
        } else if avg_confidence < 30 {
            ((base / 2).max(self.min_hold_ms), false)
        } else {
            (base, false)
        }
    }
}

/// Raw per-tick occupancy input for one zone.
#[derive(Debug, Clone, Copy)]
pub struct RawTick {
    pub raw_occupied: bool,
    pub target_count: u8,
    pub avg_confidence: u8,
    pub timestamp_ms: u64,
}

/// A single zone's four-state debouncer over raw occupancy.
pub struct ZoneDebounce {
    state: SmootherFsmState,
    timer_start_ms: u64,
    active_timeout_ms: u64,
    occupied_since_ms: u64,
    vacant_since_ms: u64,
    pub false_occupancy_prevented: u64,
    pub false_vacancy_prevented: u64,
    pub hold_extensions: u64,
}

impl ZoneDebounce {
    pub fn new() -> Self {
        Self {
            state: SmootherFsmState::Vacant,
            timer_start_ms: 0,
            active_timeout_ms: 0,
            occupied_since_ms: 0,
            vacant_since_ms: 0,
            false_occupancy_prevented: 0,
            false_vacancy_prevented: 0,
            hold_extensions: 0,
        }
    }

    pub fn state(&self) -> SmootherFsmState {
        self.state
    }

    pub fn smoothed_occupied(&self) -> bool {
        matches!(self.state, SmootherFsmState::Occupied | SmootherFsmState::Holding)
    }

    pub fn occupied_since_ms(&self) -> u64 {
        self.occupied_since_ms
    }

    pub fn vacant_since_ms(&self) -> u64 {
        self.vacant_since_ms
    }

    /// Advances the debouncer one tick. Returns `true` if `smoothed_occupied`
    /// flipped on this call, so the caller can invoke its change callback
    /// at most once per tick.
    pub fn tick(&mut self, tick: RawTick, config: &SensitivityConfig) -> bool {
        let was_occupied = self.smoothed_occupied();
        let t = tick.timestamp_ms;

        match self.state {
            SmootherFsmState::Vacant => {
                if tick.raw_occupied {
                    self.state = SmootherFsmState::Entering;
                    self.timer_start_ms = t;
                }
            }
            SmootherFsmState::Entering => {
                if !tick.raw_occupied {
                    self.state = SmootherFsmState::Vacant;
                    self.false_occupancy_prevented += 1;
                } else if t.saturating_sub(self.timer_start_ms) >= config.enter_delay_ms() {
                    self.state = SmootherFsmState::Occupied;
                    self.occupied_since_ms = t;
                    self.vacant_since_ms = 0;
                }
            }
            SmootherFsmState::Occupied => {
                if !tick.raw_occupied {
                    let (hold, extended) = config.effective_hold_ms(tick.avg_confidence);
                    if extended {
                        self.hold_extensions += 1;
                    }
                    self.active_timeout_ms = hold;
                    self.timer_start_ms = t;
                    self.state = SmootherFsmState::Holding;
                }
            }
            SmootherFsmState::Holding => {
                if tick.raw_occupied {
                    self.state = SmootherFsmState::Occupied;
                    self.false_vacancy_prevented += 1;
                } else if t.saturating_sub(self.timer_start_ms) >= self.active_timeout_ms {
                    self.state = SmootherFsmState::Vacant;
                    self.vacant_since_ms = t;
                    self.occupied_since_ms = 0;
                }
            }
        }

        was_occupied != self.smoothed_occupied()
    }
}

impl Default for ZoneDebounce {
    fn default() -> Self {
        Self::new()
    }
}
