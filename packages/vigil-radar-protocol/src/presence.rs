use tracing::debug;
use vigil_types::{PresenceFrame, PresenceState};

const HEADER: [u8; 4] = [0xF4, 0xF3, 0xF2, 0xF1];
const FOOTER: [u8; 4] = [0xF8, 0xF7, 0xF6, 0xF5];
pub const PRESENCE_FRAME_LEN: usize = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    WaitHeader,
    ReceiveData,
}

/// Sync-recovering parser for the engineering-mode presence-radar frame.
/// The wire layout carries eight gate slots; a ninth is exposed as zero,
/// per the pinned layout (an open question in the source left the exact
/// gate count ambiguous).
pub struct PresenceRadarParser {
    state: ParserState,
    header_match: usize,
    buf: Vec<u8>,
    seq: u32,
    pub frames_parsed: u64,
    pub frames_invalid: u64,
    pub sync_lost: u64,
}

impl Default for PresenceRadarParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRadarParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::WaitHeader,
            header_match: 0,
            buf: Vec::with_capacity(PRESENCE_FRAME_LEN),
            seq: 0,
            frames_parsed: 0,
            frames_invalid: 0,
            sync_lost: 0,
        }
    }

    pub fn reset(&mut self) {
        self.state = ParserState::WaitHeader;
        self.header_match = 0;
        self.buf.clear();
        self.sync_lost += 1;
    }

    pub fn push_byte(&mut self, byte: u8, timestamp_ms: u64) -> Option<PresenceFrame> {
        match self.state {
            ParserState::WaitHeader => {
                if byte == HEADER[self.header_match] {
                    self.header_match += 1;
                    if self.header_match == HEADER.len() {
                        self.buf.clear();
                        self.buf.extend_from_slice(&HEADER);
                        self.state = ParserState::ReceiveData;
                    }
                } else {
                    self.header_match = if byte == HEADER[0] { 1 } else { 0 };
                }
                None
            }
            ParserState::ReceiveData => {
                self.buf.push(byte);
                if self.buf.len() < PRESENCE_FRAME_LEN {
                    return None;
                }
                let frame = self.validate_and_emit(timestamp_ms);
                self.state = ParserState::WaitHeader;
                self.header_match = 0;
                self.buf.clear();
                frame
            }
        }
    }

    fn validate_and_emit(&mut self, timestamp_ms: u64) -> Option<PresenceFrame> {
        let buf = &self.buf;
        let len = u16::from_le_bytes([buf[4], buf[5]]);
        if !(20..=50).contains(&len) {
            debug!(len, "presence frame length out of range");
            self.frames_invalid += 1;
            return None;
        }
        if buf[6] != 0x01 || buf[7] != 0xAA {
            debug!("presence frame data_type/head mismatch");
            self.frames_invalid += 1;
            return None;
        }
        if buf[33] != 0x55 {
            debug!("presence frame tail mismatch");
            self.frames_invalid += 1;
            return None;
        }
        if buf[buf.len() - 4..] != FOOTER {
            debug!("presence frame footer mismatch");
            self.frames_invalid += 1;
            return None;
        }

        let state = PresenceState::from_byte(buf[8]);
        let moving_distance_cm = u16::from_le_bytes([buf[9], buf[10]]);
        let moving_energy = buf[11];
        let stationary_distance_cm = u16::from_le_bytes([buf[12], buf[13]]);
        let stationary_energy = buf[14];
        // detection_distance at buf[15..17] is not separately exposed on
        // PresenceFrame; it duplicates the per-state distance fields above.
        let mut moving_gates = [0u8; 9];
        moving_gates[..8].copy_from_slice(&buf[17..25]);
        let mut stationary_gates = [0u8; 9];
        stationary_gates[..8].copy_from_slice(&buf[25..33]);

        self.frames_parsed += 1;
        self.seq += 1;
        Some(PresenceFrame {
            state,
            moving_distance_cm,
            moving_energy,
            stationary_distance_cm,
            stationary_energy,
            moving_gates,
            stationary_gates,
            seq: self.seq,
            timestamp_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut PresenceRadarParser, bytes: &[u8]) -> Option<PresenceFrame> {
        let mut out = None;
        for &b in bytes {
            if let Some(f) = parser.push_byte(b, 1000) {
                out = Some(f);
            }
        }
        out
    }

    fn both_targets_frame() -> Vec<u8> {
        let mut bytes = vec![0u8; PRESENCE_FRAME_LEN];
        bytes[0..4].copy_from_slice(&HEADER);
        bytes[4..6].copy_from_slice(&33u16.to_le_bytes());
        bytes[6] = 0x01;
        bytes[7] = 0xAA;
        bytes[8] = 0x03; // both
        bytes[9..11].copy_from_slice(&100u16.to_le_bytes());
        bytes[11] = 70;
        bytes[12..14].copy_from_slice(&300u16.to_le_bytes());
        bytes[14] = 50;
        bytes[15..17].copy_from_slice(&100u16.to_le_bytes());
        bytes[17] = 0x46; // first moving gate
        bytes[25] = 0x00; // first stationary gate
        bytes[33] = 0x55;
        bytes[34] = 0x00;
        bytes[35..39].copy_from_slice(&FOOTER);
        bytes
    }

    #[test]
    fn both_targets_frame_parses() {
        let bytes = both_targets_frame();
        let frame = feed(&mut PresenceRadarParser::new(), &bytes).unwrap();
        assert_eq!(frame.state, PresenceState::Both);
        assert_eq!(frame.moving_distance_cm, 100);
        assert_eq!(frame.moving_energy, 70);
        assert_eq!(frame.stationary_distance_cm, 300);
        assert_eq!(frame.stationary_energy, 50);
        assert_eq!(frame.moving_gates[0], 0x46);
        assert_eq!(frame.stationary_gates[0], 0x00);
        assert_eq!(frame.moving_gates[8], 0);
    }

    #[test]
    fn out_of_range_length_rejected() {
        let mut bytes = both_targets_frame();
        bytes[4..6].copy_from_slice(&1000u16.to_le_bytes());
        let mut parser = PresenceRadarParser::new();
        assert!(feed(&mut parser, &bytes).is_none());
        assert_eq!(parser.frames_invalid, 1);
    }
}
