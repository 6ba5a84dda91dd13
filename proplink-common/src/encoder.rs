// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Propeller download stream encoding.
//!
//! The boot ROM reads each serial byte as a train of low pulses: a one-bit-time
//! pulse is a `1`, a two-bit-time pulse is a `0`. Depending on its value, one
//! serial byte can carry between one and five image bits. The table below maps
//! the next (up to five) image bits to the densest byte that carries them.

/// Maximum number of image bits one encoded byte can carry.
pub const MAX_BITS_PER_BYTE: u8 = 5;

/// One table entry: the byte to send and how many image bits it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoding {
    pub byte: u8,
    pub consumed: u8,
}

const fn e(byte: u8, consumed: u8) -> Encoding {
    Encoding { byte, consumed }
}

const NONE: Encoding = e(0, 0);

/// Indexed by `[value][width - 1]`, value taken LSB-first from the stream.
/// Zero entries are values that do not fit in `width` bits.
#[rustfmt::skip]
const PDS_TABLE: [[Encoding; 5]; 32] = [
    //  1-bit          2-bit          3-bit          4-bit          5-bit
    [e(0xFE, 1),  e(0xF2, 2),  e(0x92, 3),  e(0x92, 3),  e(0x92, 3)], // %00000
    [e(0xFF, 1),  e(0xF9, 2),  e(0xC9, 3),  e(0xC9, 3),  e(0xC9, 3)], // %00001
    [NONE,        e(0xFA, 2),  e(0xCA, 3),  e(0xCA, 3),  e(0xCA, 3)], // %00010
    [NONE,        e(0xFD, 2),  e(0xE5, 3),  e(0x25, 4),  e(0x25, 4)], // %00011
    [NONE,        NONE,        e(0xD2, 3),  e(0xD2, 3),  e(0xD2, 3)], // %00100
    [NONE,        NONE,        e(0xE9, 3),  e(0x29, 4),  e(0x29, 4)], // %00101
    [NONE,        NONE,        e(0xEA, 3),  e(0x2A, 4),  e(0x2A, 4)], // %00110
    [NONE,        NONE,        e(0xF5, 3),  e(0x95, 4),  e(0x95, 4)], // %00111
    [NONE,        NONE,        NONE,        e(0x92, 3),  e(0x92, 3)], // %01000
    [NONE,        NONE,        NONE,        e(0x49, 4),  e(0x49, 4)], // %01001
    [NONE,        NONE,        NONE,        e(0x4A, 4),  e(0x4A, 4)], // %01010
    [NONE,        NONE,        NONE,        e(0xA5, 4),  e(0xA5, 4)], // %01011
    [NONE,        NONE,        NONE,        e(0x52, 4),  e(0x52, 4)], // %01100
    [NONE,        NONE,        NONE,        e(0xA9, 4),  e(0xA9, 4)], // %01101
    [NONE,        NONE,        NONE,        e(0xAA, 4),  e(0xAA, 4)], // %01110
    [NONE,        NONE,        NONE,        e(0xD5, 4),  e(0xD5, 4)], // %01111
    [NONE,        NONE,        NONE,        NONE,        e(0x92, 3)], // %10000
    [NONE,        NONE,        NONE,        NONE,        e(0xC9, 3)], // %10001
    [NONE,        NONE,        NONE,        NONE,        e(0xCA, 3)], // %10010
    [NONE,        NONE,        NONE,        NONE,        e(0x25, 4)], // %10011
    [NONE,        NONE,        NONE,        NONE,        e(0xD2, 3)], // %10100
    [NONE,        NONE,        NONE,        NONE,        e(0x29, 4)], // %10101
    [NONE,        NONE,        NONE,        NONE,        e(0x2A, 4)], // %10110
    [NONE,        NONE,        NONE,        NONE,        e(0x95, 4)], // %10111
    [NONE,        NONE,        NONE,        NONE,        e(0x92, 3)], // %11000
    [NONE,        NONE,        NONE,        NONE,        e(0x49, 4)], // %11001
    [NONE,        NONE,        NONE,        NONE,        e(0x4A, 4)], // %11010
    [NONE,        NONE,        NONE,        NONE,        e(0xA5, 4)], // %11011
    [NONE,        NONE,        NONE,        NONE,        e(0x52, 4)], // %11100
    [NONE,        NONE,        NONE,        NONE,        e(0xA9, 4)], // %11101
    [NONE,        NONE,        NONE,        NONE,        e(0xAA, 4)], // %11110
    [NONE,        NONE,        NONE,        NONE,        e(0x55, 5)], // %11111
];

/// Look up the table entry for `value` read as a `width`-bit group.
///
/// Returns `None` when `width` is outside `1..=5` or `value` does not fit in
/// `width` bits.
pub fn lookup(value: u8, width: u8) -> Option<Encoding> {
    if width == 0 || width > MAX_BITS_PER_BYTE || value as usize >= PDS_TABLE.len() {
        return None;
    }
    let entry = PDS_TABLE[value as usize][width as usize - 1];
    if entry.consumed == 0 {
        None
    } else {
        Some(entry)
    }
}

/// Encode the low `width` bits of `value`.
///
/// Bits above `width` are masked off, so every call lands on a defined entry.
pub fn encode(value: u8, width: u8) -> Encoding {
    let width = width.clamp(1, MAX_BITS_PER_BYTE);
    let mask = (1u8 << width) - 1;
    PDS_TABLE[(value & mask) as usize][width as usize - 1]
}

/// Iterator producing the encoded download stream for an image.
///
/// Image bits are consumed LSB-first, byte by byte.
pub struct BitStream<'a> {
    image: &'a [u8],
    next_bit: usize,
}

impl<'a> BitStream<'a> {
    pub fn new(image: &'a [u8]) -> Self {
        Self { image, next_bit: 0 }
    }

    fn bit_count(&self) -> usize {
        self.image.len() * 8
    }

    /// Read `width` bits starting at the current position.
    fn peek(&self, width: u8) -> u8 {
        let index = self.next_bit / 8;
        let shift = self.next_bit % 8;
        let lo = self.image[index] as u16;
        let hi = self.image.get(index + 1).copied().unwrap_or(0) as u16;
        let window = (lo | (hi << 8)) >> shift;
        (window as u8) & ((1u8 << width) - 1)
    }
}

impl Iterator for BitStream<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let remaining = self.bit_count().checked_sub(self.next_bit)?;
        if remaining == 0 {
            return None;
        }
        let width = remaining.min(MAX_BITS_PER_BYTE as usize) as u8;
        let encoding = encode(self.peek(width), width);
        self.next_bit += encoding.consumed as usize;
        Some(encoding.byte)
    }
}

/// Number of bytes the encoded form of `image` occupies on the wire.
pub fn encoded_len(image: &[u8]) -> usize {
    BitStream::new(image).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_narrow_value_is_defined() {
        for width in 1..=MAX_BITS_PER_BYTE {
            for value in 0..(1u8 << width) {
                assert!(lookup(value, width).is_some(), "{value:#x}/{width}");
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
    fn test_encode_masks_high_bits() {
        assert_eq!(encode(0xFF, 1), e(0xFF, 1));
        assert_eq!(encode(0xFE, 1), e(0xFE, 1));
    }

    #[test]
    fn test_peek_reads_across_byte_boundary() {
        let image = [0b1100_0000, 0b0000_0111];
        let mut stream = BitStream::new(&image);
        stream.next_bit = 6;
        assert_eq!(stream.peek(5), 0b11111);
    }

    #[test]
    fn test_all_ones_byte_pair() {
        // 16 one-bits: three five-bit groups and a single trailing bit.
        let out: heapless::Vec<u8, 8> = BitStream::new(&[0xFF, 0xFF]).collect();
        assert_eq!(&out[..], &[0x55, 0x55, 0x55, 0xFF]);
    }
}
