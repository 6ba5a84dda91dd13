// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot ROM handshake and download command.
//!
//! After reset neither side knows the other's clock. The host sends a timing
//! template followed by 250 bits of an LFSR sequence seeded with `'P'`, then
//! 258 more templates that clock out the target's reply: the next 250 LFSR
//! bits and its version. Once the reply checks out, the host sends a command
//! code, the image length and the encoded image, then polls for the ROM's
//! checksum verdict.

use crate::encoder::BitStream;
use crate::error::LoadError;
use crate::platform::Transport;
use crate::state::LoadType;

/// Bytes of LFSR continuation in the target's reply.
pub const RX_HANDSHAKE_LEN: usize = 125;
/// Bytes carrying the target's version after the LFSR continuation.
pub const VERSION_LEN: usize = 4;
/// Total reply expected after [`TX_HANDSHAKE`].
pub const HANDSHAKE_RESPONSE_LEN: usize = RX_HANDSHAKE_LEN + VERSION_LEN;

/// Sent by the ROM when the downloaded image checksums correctly.
pub const CHECKSUM_OK: u8 = 0xFE;
/// Timing template sent to clock out the checksum verdict.
pub const CHECKSUM_POLL: u8 = 0xF9;

/// Tick between checksum polls, in milliseconds.
pub const CALIBRATE_DELAY_MS: u32 = 10;
/// Time the ROM takes to checksum the image once it has been received.
pub const RX_CHECKSUM_TIMEOUT_MS: u32 = 250;

/// Number of encoded units in the image length field.
pub const LENGTH_FIELD_SIZE: usize = 11;

#[rustfmt::skip]
pub const TX_HANDSHAKE: [u8; 198] = [
    // Timing template ('1', '0') and the first two LFSR bits.
    0x49,
    // Remaining 248 LFSR bits.
    0xAA, 0x52, 0xA5, 0xAA, 0x25, 0xAA, 0xD2, 0xCA, 0x52, 0x25, 0xD2, 0xD2, 0xD2, 0xAA, 0x49, 0x92,
    0xC9, 0x2A, 0xA5, 0x25, 0x4A, 0x49, 0x49, 0x2A, 0x25, 0x49, 0xA5, 0x4A, 0xAA, 0x2A, 0xA9, 0xCA,
    0xAA, 0x55, 0x52, 0xAA, 0xA9, 0x29, 0x92, 0x92, 0x29, 0x25, 0x2A, 0xAA, 0x92, 0x92, 0x55, 0xCA,
    0x4A, 0xCA, 0xCA, 0x92, 0xCA, 0x92, 0x95, 0x55, 0xA9, 0x92, 0x2A, 0xD2, 0x52, 0x92, 0x52, 0xCA,
    0xD2, 0xCA, 0x2A, 0xFF,
    // 250 templates for the reply, two per byte.
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
    // 8 templates for the version.
    0x29, 0x29, 0x29, 0x29,
];

/// LFSR continuation the target must send back, two bits per byte
/// (bit 0 first, then bit 5).
#[rustfmt::skip]
pub const RX_HANDSHAKE: [u8; RX_HANDSHAKE_LEN] = [
    0xEE, 0xCE, 0xCE, 0xCF, 0xEF, 0xCF, 0xEE, 0xEF, 0xCF, 0xCF, 0xEF, 0xEF, 0xCF, 0xCE, 0xEF, 0xCF,
    0xEE, 0xEE, 0xCE, 0xEE, 0xEF, 0xCF, 0xCE, 0xEE, 0xCE, 0xCF, 0xEE, 0xEE, 0xEF, 0xCF, 0xEE, 0xCE,
    0xEE, 0xCE, 0xEE, 0xCF, 0xEF, 0xEE, 0xEF, 0xCE, 0xEE, 0xEE, 0xCF, 0xEE, 0xCF, 0xEE, 0xEE, 0xCF,
    0xEF, 0xCE, 0xCF, 0xEE, 0xEF, 0xEE, 0xEE, 0xEE, 0xEE, 0xEF, 0xEE, 0xCF, 0xCF, 0xEF, 0xEE, 0xCE,
    0xEF, 0xEF, 0xEF, 0xEF, 0xCE, 0xEF, 0xEE, 0xEF, 0xCF, 0xEF, 0xCF, 0xCF, 0xCE, 0xCE, 0xCE, 0xCF,
    0xCF, 0xEF, 0xCE, 0xEE, 0xCF, 0xEE, 0xEF, 0xCE, 0xCE, 0xCE, 0xEF, 0xEF, 0xCF, 0xCF, 0xEE, 0xEE,
    0xEE, 0xCE, 0xCF, 0xCE, 0xCE, 0xCF, 0xCE, 0xEE, 0xEF, 0xEE, 0xEF, 0xEF, 0xCF, 0xEF, 0xCE, 0xCE,
    0xEF, 0xCE, 0xEE, 0xCE, 0xEF, 0xCE, 0xCE, 0xEE, 0xCF, 0xCF, 0xCE, 0xCF, 0xCF,
];

// Command codes: the load type as an encoded 32-bit long.
const SHUTDOWN_CMD: [u8; 11] = [0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0xF2];
const LOAD_RUN_CMD: [u8; 11] = [0xC9, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0xF2];
const PROGRAM_SHUTDOWN_CMD: [u8; 11] =
    [0xCA, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0xF2];
const PROGRAM_RUN_CMD: [u8; 11] = [0x25, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0x92, 0xFE];

/// Send the timing template and handshake.
pub fn initiate_handshake(io: &mut impl Transport) {
    io.transmit(&TX_HANDSHAKE);
}

/// Check the target's reply and extract its version.
pub fn verify_handshake_response(response: &[u8]) -> Result<u8, LoadError> {
    if response.len() != HANDSHAKE_RESPONSE_LEN {
        return Err(LoadError::HandshakeFailed);
    }
    let (lfsr, version_bits) = response.split_at(RX_HANDSHAKE_LEN);
    if lfsr != &RX_HANDSHAKE[..] {
        return Err(LoadError::HandshakeFailed);
    }
    let version = version_bits.iter().fold(0u8, |version, &b| {
        ((version >> 2) & 0x3F) | ((b & 0x01) << 6) | ((b & 0x20) << 2)
    });
    Ok(version)
}

pub fn command_code(load_type: LoadType) -> &'static [u8; 11] {
    match load_type {
        LoadType::Shutdown => &SHUTDOWN_CMD,
        LoadType::Run => &LOAD_RUN_CMD,
        LoadType::Program => &PROGRAM_SHUTDOWN_CMD,
        LoadType::ProgramAndRun => &PROGRAM_RUN_CMD,
    }
}

/// Encode the image length in longs, three bits per unit, LSB first.
/// The last unit carries the top two bits and the end marker.
pub fn length_field(image_len: usize) -> [u8; LENGTH_FIELD_SIZE] {
    let mut longs = (image_len / 4) as u32;
    let mut field = [0u8; LENGTH_FIELD_SIZE];
    for (i, unit) in field.iter_mut().enumerate() {
        let end_marker = if i == LENGTH_FIELD_SIZE - 1 { 0x60 } else { 0x00 };
        let bits = (longs & 1) | ((longs & 2) << 2) | ((longs & 4) << 4);
        *unit = 0x92 | end_marker | bits as u8;
        longs >>= 3;
    }
    field
}

/// Send the command, and unless shutting down, the length and encoded image.
///
/// Returns the number of encoded image bytes sent.
pub fn transmit_command(io: &mut impl Transport, load_type: LoadType, image: &[u8]) -> usize {
    io.transmit(command_code(load_type));
    if load_type == LoadType::Shutdown {
        return 0;
    }
    io.transmit(&length_field(image.len()));

    let mut chunk = [0u8; 64];
    let mut filled = 0;
    let mut sent = 0;
    for byte in BitStream::new(image) {
        chunk[filled] = byte;
        filled += 1;
        if filled == chunk.len() {
            io.transmit(&chunk);
            sent += filled;
            filled = 0;
        }
    }
    if filled > 0 {
        io.transmit(&chunk[..filled]);
        sent += filled;
    }
    sent
}

/// Checksum polls to allow: time to transmit `encoded_len` bytes at `baud`
/// (10 bits per byte) plus the ROM's checksum time, in whole poll ticks.
pub fn retry_budget(encoded_len: usize, baud: u32) -> u32 {
    let transmit_ms = encoded_len as u64 * 10 * 1000 / baud.max(1) as u64;
    ((transmit_ms + RX_CHECKSUM_TIMEOUT_MS as u64) / CALIBRATE_DELAY_MS as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_field_zero_ends_with_marker() {
        let field = length_field(0);
        assert!(field[..10].iter().all(|&b| b == 0x92));
        assert_eq!(field[10], 0xF2);
    }

    #[test]
    fn test_length_field_low_bits() {
        // 7 longs -> first unit carries %111
        let field = length_field(28);
        assert_eq!(field[0], 0x92 | 0x01 | 0x08 | 0x40);
        assert_eq!(field[1], 0x92);
    }

    #[test]
    fn test_retry_budget_truncates() {
        // 1000 bytes at 115200: 86.8 ms -> 86 ms, + 250 -> 336 -> 33 ticks
        assert_eq!(retry_budget(1000, 115_200), 33);
        assert_eq!(retry_budget(0, 115_200), 25);
    }
}
