use tracing::debug;
use vigil_types::{Detection, DetectionFrame, MAX_DETECTIONS};

const HEADER: [u8; 4] = [0xAA, 0xFF, 0x03, 0x00];
const FOOTER: [u8; 2] = [0x55, 0xCC];
const TARGET_LEN: usize = 8;

/// Total on-wire frame length. The field-by-field layout (4-byte header,
/// three 8-byte targets, 2-byte checksum, 2-byte footer) and the worked
/// example both sum to 32 bytes; this is treated as authoritative over a
/// conflicting "40 bytes" figure elsewhere in the source prose.
pub const TRACKING_FRAME_LEN: usize = 4 + MAX_DETECTIONS * TARGET_LEN + 2 + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    WaitHeader,
    ReceiveData,
}

/// Sync-recovering byte-stream parser for the tracking-radar UART frame.
pub struct TrackingRadarParser {
    state: ParserState,
    header_match: usize,
    buf: Vec<u8>,
    seq: u32,
    pub frames_parsed: u64,
    pub frames_invalid: u64,
    pub sync_lost: u64,
}

impl Default for TrackingRadarParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingRadarParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::WaitHeader,
            header_match: 0,
            buf: Vec::with_capacity(TRACKING_FRAME_LEN),
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

    /// Feeds one byte; returns a decoded frame when a full, valid frame
    /// completes. Invalid frames are swallowed and counted, not returned.
    pub fn push_byte(&mut self, byte: u8, timestamp_ms: u64) -> Option<DetectionFrame> {
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
                    // Re-anchor: the mismatching byte might itself start a
                    // new header.
                    self.header_match = if byte == HEADER[0] { 1 } else { 0 };
                }
                None
            }
            ParserState::ReceiveData => {
                self.buf.push(byte);
                if self.buf.len() < TRACKING_FRAME_LEN {
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

    fn validate_and_emit(&mut self, timestamp_ms: u64) -> Option<DetectionFrame> {
        let buf = &self.buf;
        if buf[buf.len() - 2..] != FOOTER {
            debug!("tracking frame footer mismatch");
            self.frames_invalid += 1;
            return None;
        }
        let checksum_region = &buf[4..4 + MAX_DETECTIONS * TARGET_LEN];
        let stored_checksum = u16::from_le_bytes([buf[28], buf[29]]);
        let computed: u16 = checksum_region
            .iter()
            .fold(0u32, |acc, &b| acc.wrapping_add(b as u32)) as u16;
        if stored_checksum != 0 && stored_checksum != computed {
            debug!(stored_checksum, computed, "tracking frame checksum mismatch");
            self.frames_invalid += 1;
            return None;
        }

        let mut detections = [Detection::INVALID; MAX_DETECTIONS];
        let mut target_count = 0u8;
        for (i, d) in detections.iter_mut().enumerate() {
            let off = 4 + i * TARGET_LEN;
            let x = i16::from_le_bytes([buf[off], buf[off + 1]]) as i32;
            let y = i16::from_le_bytes([buf[off + 2], buf[off + 3]]) as i32;
            let speed = i16::from_le_bytes([buf[off + 4], buf[off + 5]]) as i32;
            let resolution = u16::from_le_bytes([buf[off + 6], buf[off + 7]]) as u32;
            let is_invalid = (x as u16 == 0x8000) || (x == 0 && y == 0 && speed == 0 && resolution == 0);
            if is_invalid {
                *d = Detection::INVALID;
            } else {
                *d = Detection {
                    valid: true,
                    x_mm: x,
                    y_mm: y,
                    speed_cm_s: speed,
                    resolution_mm: resolution,
                    signal_quality: Detection::quality_from_resolution(resolution),
                };
                target_count += 1;
            }
        }

        self.frames_parsed += 1;
        self.seq += 1;
        Some(DetectionFrame {
            detections,
            target_count,
            seq: self.seq,
            timestamp_ms,
        })
    }
}
