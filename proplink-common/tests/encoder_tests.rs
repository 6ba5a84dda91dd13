// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the download stream encoding, checked against a model of how the
//! boot ROM reads serial frames.

use proplink_common::encoder::{encode, encoded_len, lookup, BitStream, MAX_BITS_PER_BYTE};

/// Decode one serial byte the way the boot ROM does: start bit, eight data
/// bits LSB first, stop bit; each low pulse of one bit time is a `1`, of two
/// bit times a `0`.
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
            assert!(run <= 2, "byte 0x{byte:02x} has a low pulse of {run} bit times");
            bits.push(if run == 1 { 1 } else { 0 });
            run = 0;
        }
    }
    bits
}

fn image_bits(image: &[u8]) -> Vec<u8> {
    image
        .iter()
        .flat_map(|&b| (0..8).map(move |i| (b >> i) & 1))
        .collect()
}

// =============================================================================
// Table tests
// =============================================================================

#[test]
fn test_every_entry_decodes_to_its_value() {
    for width in 1..=MAX_BITS_PER_BYTE {
        for value in 0..(1u8 << width) {
            let enc = lookup(value, width).expect("value fits in width");
            assert!(enc.consumed >= 1 && enc.consumed <= width);

            let bits = rom_decode(enc.byte);
            assert_eq!(bits.len(), enc.consumed as usize, "byte 0x{:02x}", enc.byte);
            let decoded = bits
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (bit << i));
            let mask = (1u8 << enc.consumed) - 1;
            assert_eq!(decoded, value & mask, "value {value} width {width}");
        }
    }
}

#[test]
fn test_lookup_rejects_values_wider_than_width() {
    assert_eq!(lookup(2, 1), None);
    assert_eq!(lookup(4, 2), None);
    assert_eq!(lookup(8, 3), None);
    assert_eq!(lookup(16, 4), None);
    assert_eq!(lookup(0, 0), None);
    assert_eq!(lookup(0, 6), None);
}

#[test]
fn test_three_ones_use_f5() {
    let enc = encode(0b111, 3);
    assert_eq!(enc.byte, 0xF5);
    assert_eq!(enc.consumed, 3);
}

#[test]
fn test_five_ones_pack_into_one_byte() {
    let enc = encode(0b11111, 5);
    assert_eq!(enc.byte, 0x55);
    assert_eq!(enc.consumed, 5);
}

// =============================================================================
// Stream tests
// =============================================================================

#[test]
fn test_stream_reproduces_image_bits() {
    let image: Vec<u8> = (0..257u32).map(|i| (i * 37 + 11) as u8).collect();
    let decoded: Vec<u8> = BitStream::new(&image).flat_map(rom_decode).collect();
    assert_eq!(decoded, image_bits(&image));
}

#[test]
fn test_stream_of_zeros_is_three_bits_per_byte() {
    let image = [0u8; 12];
    // 96 zero bits at three per byte
    assert_eq!(encoded_len(&image), 32);
    assert!(BitStream::new(&image).all(|b| b == 0x92));
}

#[test]
fn test_stream_of_ones() {
    let encoded: Vec<u8> = BitStream::new(&[0xFF, 0xFF]).collect();
    assert_eq!(encoded, vec![0x55, 0x55, 0x55, 0xFF]);
}

#[test]
fn test_empty_image_encodes_to_nothing() {
    assert_eq!(encoded_len(&[]), 0);
}
