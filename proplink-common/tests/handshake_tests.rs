// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the boot ROM handshake tables and download command.

mod common;

use common::{handshake_reply, Event, MockPlatform};
use proplink_common::encoder::encoded_len;
use proplink_common::handshake::{
    command_code, length_field, retry_budget, transmit_command, verify_handshake_response,
    HANDSHAKE_RESPONSE_LEN, RX_HANDSHAKE, TX_HANDSHAKE,
};
use proplink_common::{LoadError, LoadType};

/// Lowest bits of successive LFSR iterations seeded with `'P'`.
fn lfsr_bits(count: usize) -> Vec<u8> {
    let mut lfsr = b'P';
    (0..count)
        .map(|_| {
            let bit = lfsr & 1;
            let feedback = ((lfsr >> 7) ^ (lfsr >> 5) ^ (lfsr >> 4) ^ (lfsr >> 1)) & 1;
            lfsr = (lfsr << 1) | feedback;
            bit
        })
        .collect()
}

fn rom_decode(byte: u8) -> Vec<u8> {
    let mut frame = vec![0u8];
    frame.extend((0..8).map(|i| (byte >> i) & 1));
    frame.push(1);
    let mut bits = Vec::new();
    let mut run = 0;
    for level in frame {
        if level == 0 {
            run += 1;
        } else if run > 0 {
            bits.push(if run == 1 { 1 } else { 0 });
            run = 0;
        }
    }
    bits
}

// =============================================================================
// Handshake tables
// =============================================================================

#[test]
fn test_tx_handshake_carries_template_and_first_250_lfsr_bits() {
    let bits: Vec<u8> = TX_HANDSHAKE[..69].iter().flat_map(|&b| rom_decode(b)).collect();
    assert_eq!(&bits[..2], &[1, 0]);
    assert_eq!(&bits[2..], &lfsr_bits(250)[..]);
}

#[test]
fn test_tx_handshake_ends_with_reply_templates() {
    assert_eq!(TX_HANDSHAKE.len(), 198);
    assert!(TX_HANDSHAKE[69..].iter().all(|&b| b == 0x29));
    assert_eq!(TX_HANDSHAKE.len() - 69, HANDSHAKE_RESPONSE_LEN);
}

#[test]
fn test_rx_handshake_continues_lfsr() {
    let expected = lfsr_bits(500);
    let bits: Vec<u8> = RX_HANDSHAKE
        .iter()
        .flat_map(|&b| [b & 1, (b >> 5) & 1])
        .collect();
    assert_eq!(&bits[..], &expected[250..]);
}

// =============================================================================
// verify_handshake_response
// =============================================================================

#[test]
fn test_valid_reply_yields_version() {
    assert_eq!(verify_handshake_response(&handshake_reply()), Ok(1));
}

#[test]
fn test_version_bits_are_packed_lsb_first() {
    let mut reply = RX_HANDSHAKE.to_vec();
    // bits 1,1 | 0,0 | 0,0 | 0,1 -> 0b1000_0011
    reply.extend_from_slice(&[0xEF, 0xCE, 0xCE, 0xEE]);
    assert_eq!(verify_handshake_response(&reply), Ok(0x83));
}

#[test]
fn test_any_corrupted_lfsr_byte_fails() {
    for i in [0, 1, 62, 124] {
        let mut reply = handshake_reply();
        reply[i] ^= 0x01;
        assert_eq!(
            verify_handshake_response(&reply),
            Err(LoadError::HandshakeFailed),
            "byte {i}"
        );
    }
}

#[test]
fn test_short_reply_fails() {
    let reply = handshake_reply();
    assert_eq!(
        verify_handshake_response(&reply[..HANDSHAKE_RESPONSE_LEN - 1]),
        Err(LoadError::HandshakeFailed)
    );
}

// =============================================================================
// Download command
// =============================================================================

#[test]
fn test_command_codes_encode_load_type() {
    for load_type in [
        LoadType::Shutdown,
        LoadType::Run,
        LoadType::Program,
        LoadType::ProgramAndRun,
    ] {
        let bits: Vec<u8> = command_code(load_type)
            .iter()
            .flat_map(|&b| rom_decode(b))
            .collect();
        assert_eq!(bits.len(), 32, "{load_type:?}");
        let value = bits
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &bit)| acc | ((bit as u32) << i));
        assert_eq!(value, load_type.bits() as u32);
    }
}

#[test]
fn test_length_field_decodes_to_long_count() {
    let image_len = 0x1234 * 4;
    let bits: Vec<u8> = length_field(image_len)
        .iter()
        .flat_map(|&b| rom_decode(b))
        .collect();
    assert_eq!(bits.len(), 32);
    let value = bits
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &bit)| acc | ((bit as u32) << i));
    assert_eq!(value, 0x1234);
}

#[test]
fn test_transmit_command_sends_code_length_and_image() {
    let image = [0xA5u8; 100];
    let mut io = MockPlatform::new();
    let sent = transmit_command(&mut io, LoadType::Run, &image);

    assert_eq!(sent, encoded_len(&image));
    let wire = io.transmitted();
    assert_eq!(&wire[..11], command_code(LoadType::Run));
    assert_eq!(&wire[11..22], &length_field(image.len()));
    assert_eq!(wire.len(), 22 + sent);
    // image goes out in chunks of at most 64 bytes
    assert!(io.events[2..]
        .iter()
        .all(|e| matches!(e, Event::Transmit(b) if b.len() <= 64)));
}

#[test]
fn test_shutdown_sends_only_the_command() {
    let mut io = MockPlatform::new();
    assert_eq!(transmit_command(&mut io, LoadType::Shutdown, &[1, 2, 3, 4]), 0);
    assert_eq!(io.transmitted(), command_code(LoadType::Shutdown).to_vec());
}

#[test]
fn test_retry_budget_covers_transmit_time() {
    // 11520 bytes at 115200 baud: exactly 1000 ms, + 250 ms -> 125 polls
    assert_eq!(retry_budget(11_520, 115_200), 125);
    // 1 byte: under a millisecond, so only the checksum window counts
    assert_eq!(retry_budget(1, 115_200), 25);
    // 1200 bytes at 9600: 1250 ms + 250 -> 150 polls
    assert_eq!(retry_budget(1200, 9600), 150);
}
