//! Command envelope builders shared by both radar streams:
//! `FD FC FB FA | len_u16_le | cmd_u16_le | data... | 04 03 02 01`.

const ENVELOPE_HEADER: [u8; 4] = [0xFD, 0xFC, 0xFB, 0xFA];
const ENVELOPE_FOOTER: [u8; 4] = [0x04, 0x03, 0x02, 0x01];

fn build_command(cmd: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 2 + 2 + data.len() + 4);
    out.extend_from_slice(&ENVELOPE_HEADER);
    let len = (2 + data.len()) as u16;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&cmd.to_le_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&ENVELOPE_FOOTER);
    out
}

const CMD_ENABLE_CONFIG: u16 = 0x00FF;
const CMD_DISABLE_CONFIG: u16 = 0x00FE;
const CMD_ENABLE_ENGINEERING_MODE: u16 = 0x0062;
const CMD_SET_MAX_GATE: u16 = 0x0060;

pub fn enable_config() -> Vec<u8> {
    build_command(CMD_ENABLE_CONFIG, &[0x01, 0x00])
}

pub fn disable_config() -> Vec<u8> {
    build_command(CMD_DISABLE_CONFIG, &[])
}

pub fn enable_engineering_mode() -> Vec<u8> {
    build_command(CMD_ENABLE_ENGINEERING_MODE, &[0x01, 0x00])
}

pub fn set_max_gate(moving_gate: u8, stationary_gate: u8) -> Vec<u8> {
    build_command(
        CMD_SET_MAX_GATE,
        &[moving_gate, 0x00, 0x00, 0x00, stationary_gate, 0x00, 0x00, 0x00],
    )
}
