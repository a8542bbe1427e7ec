#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Tracks per-radar connection state from frame arrivals. `Disconnected ->
/// Connected` fires on the next successful frame; `Connected ->
/// Disconnected` fires from a periodic (>= 500 ms) check against
/// `disconnect_timeout_ms`.
pub struct DisconnectTracker {
    state: ConnectionState,
    last_frame_ms: Option<u64>,
    disconnect_timeout_ms: u64,
}

impl DisconnectTracker {
    pub fn new(disconnect_timeout_ms: u64) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_frame_ms: None,
            disconnect_timeout_ms,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Call on every successfully parsed frame. Returns `true` if this call
    /// caused a `Disconnected -> Connected` transition.
    pub fn on_frame(&mut self, now_ms: u64) -> bool {
        self.last_frame_ms = Some(now_ms);
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connected;
            true
        } else {
            false
        }
    }

    /// Call periodically (>= 500 ms). Returns `true` if this call caused a
    /// `Connected -> Disconnected` transition.
    pub fn check(&mut self, now_ms: u64) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        let stale = match self.last_frame_ms {
            Some(last) => now_ms.saturating_sub(last) > self.disconnect_timeout_ms,
            None => true,
        };
        if stale {
            self.state = ConnectionState::Disconnected;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connects_on_first_frame() {
        let mut tracker = DisconnectTracker::new(3000);
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert!(tracker.on_frame(0));
        assert_eq!(tracker.state(), ConnectionState::Connected);
    }

    #[test]
    fn disconnects_after_timeout() {
        let mut tracker = DisconnectTracker::new(3000);
        tracker.on_frame(0);
        assert!(!tracker.check(2000));
        assert!(tracker.check(3001));
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn reconnect_fires_once() {
        let mut tracker = DisconnectTracker::new(3000);
        tracker.on_frame(0);
        tracker.check(5000);
        assert!(tracker.on_frame(5001));
        assert!(!tracker.on_frame(5002));
    }
}
