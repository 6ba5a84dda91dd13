// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bootstrap image generation.
//!
//! The second-stage loader is a small Propeller program downloaded through the
//! boot ROM. Before download, its template gets host-chosen timing constants and
//! the expected packet count written into an init area near its end, and the
//! Spin header checksum is recomputed.

use core::fmt;

use heapless::Vec;

/// Target system clock assumed when computing the loader's timing constants.
pub const CLOCK_SPEED: f64 = 80_000_000.0;

/// Seconds the loader waits for a packet before giving up.
pub const FAILSAFE_TIMEOUT_SECS: f64 = 2.0;

/// Worst-case start bit detection error of the loader's receive loop, in cycles.
pub const MAX_RX_SENSE_ERROR: f64 = 23.0;

/// Size of the second-stage loader's packet buffer.
pub const MAX_PACKET_SIZE: usize = 1024;

/// Distance of the init area from the end of the loader template.
pub const INIT_AREA_OFFSET_FROM_END: usize = 10 * 4 + 8;

/// Largest image the boot ROM path will carry.
pub const IMAGE_CAPACITY: usize = 2048;

/// Size of Propeller hub RAM, the largest image the target can hold.
pub const MAX_TARGET_IMAGE_SIZE: usize = 32 * 1024;

/// Stack frame the boot ROM places above the image before launching it.
pub const INIT_CALL_FRAME: [u8; 8] = [0xFF, 0xFF, 0xF9, 0xFF, 0xFF, 0xFF, 0xF9, 0xFF];

const SPIN_HEADER_LEN: usize = 16;
const CHECKSUM_OFFSET: usize = 5;

// Offsets of the patched longs within the init area.
const INITIAL_BIT_TIME: usize = 4;
const FINAL_BIT_TIME: usize = 8;
const START_BIT_WAIT: usize = 12;
const FAILSAFE_TIMEOUT: usize = 16;
const END_OF_PACKET_TIMEOUT: usize = 20;
const EXPECTED_PACKET_ID: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageError {
    /// Template is too short to hold a Spin header and the init area.
    TemplateTooShort,
    /// Template does not fit in the bootstrap buffer.
    TemplateTooLarge,
    /// Template length is not a whole number of longs.
    Misaligned,
    /// A baud rate of zero cannot be turned into a bit time.
    ZeroBaud,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::TemplateTooShort => f.write_str("loader template too short"),
            ImageError::TemplateTooLarge => f.write_str("loader template too large"),
            ImageError::Misaligned => f.write_str("loader template not long-aligned"),
            ImageError::ZeroBaud => f.write_str("zero baud rate"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ImageError {}

/// A patched second-stage loader, ready for the boot ROM.
#[derive(Debug, Clone)]
pub struct BootstrapImage {
    pub data: Vec<u8, IMAGE_CAPACITY>,
    /// Packets the loader expects for the application image; also the id of
    /// its startup acknowledgement.
    pub packet_count: i32,
}

/// `floor(x + 0.5)` for the positive quantities patched into the loader.
fn round(x: f64) -> i32 {
    (x + 0.5) as i32
}

/// Write a little-endian long.
pub fn set_long(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read a little-endian long.
pub fn get_long(buf: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

/// Number of second-stage packets needed for an image of `image_size` bytes.
pub fn packet_count(image_size: usize) -> i32 {
    image_size.div_ceil(MAX_PACKET_SIZE) as i32
}

/// Sum of the initial call frame, the starting value of the packet checksum.
pub fn call_frame_checksum() -> i32 {
    INIT_CALL_FRAME.iter().map(|&b| b as i32).sum()
}

/// Sum of `image` plus the call frame, as the boot ROM computes it.
pub fn rom_checksum(image: &[u8]) -> u8 {
    image
        .iter()
        .chain(INIT_CALL_FRAME.iter())
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Set the Spin header checksum byte so that [`rom_checksum`] is zero.
pub fn update_checksum(image: &mut [u8]) {
    image[CHECKSUM_OFFSET] = 0;
    image[CHECKSUM_OFFSET] = rom_checksum(image).wrapping_neg();
}

/// Patch `template` for an application of `image_size` bytes.
///
/// `final_baud` is the rate the loader switches to once running, i.e. the
/// second-stage rate.
pub fn generate_bootstrap_image(
    template: &[u8],
    image_size: usize,
    initial_baud: u32,
    final_baud: u32,
) -> Result<BootstrapImage, ImageError> {
    if template.len() < SPIN_HEADER_LEN + INIT_AREA_OFFSET_FROM_END {
        return Err(ImageError::TemplateTooShort);
    }
    if template.len() % 4 != 0 {
        return Err(ImageError::Misaligned);
    }
    if initial_baud == 0 || final_baud == 0 {
        return Err(ImageError::ZeroBaud);
    }
    let mut data: Vec<u8, IMAGE_CAPACITY> =
        Vec::from_slice(template).map_err(|_| ImageError::TemplateTooLarge)?;

    let initial = initial_baud as f64;
    let fin = final_baud as f64;
    let packets = packet_count(image_size);
    let init = data.len() - INIT_AREA_OFFSET_FROM_END;

    set_long(&mut data, init + INITIAL_BIT_TIME, round(CLOCK_SPEED / initial) as u32);
    set_long(&mut data, init + FINAL_BIT_TIME, round(CLOCK_SPEED / fin) as u32);
    set_long(
        &mut data,
        init + START_BIT_WAIT,
        round(1.5 * CLOCK_SPEED / fin - MAX_RX_SENSE_ERROR) as u32,
    );
    set_long(
        &mut data,
        init + FAILSAFE_TIMEOUT,
        round(FAILSAFE_TIMEOUT_SECS * CLOCK_SPEED / (3.0 * 4.0)) as u32,
    );
    set_long(
        &mut data,
        init + END_OF_PACKET_TIMEOUT,
        round((2.0 * CLOCK_SPEED / fin) * (10.0 / 12.0)) as u32,
    );
    set_long(&mut data, init + EXPECTED_PACKET_ID, packets as u32);

    update_checksum(&mut data);

    Ok(BootstrapImage {
        data,
        packet_count: packets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round(694.444), 694);
        assert_eq!(round(86.5), 87);
        assert_eq!(round(86.49), 86);
    }

    #[test]
    fn test_call_frame_checksum() {
        assert_eq!(call_frame_checksum(), 0x7EC);
    }

    #[test]
    fn test_long_roundtrip_is_little_endian() {
        let mut buf = [0u8; 6];
        set_long(&mut buf, 1, 0x1234_5678);
        assert_eq!(buf, [0, 0x78, 0x56, 0x34, 0x12, 0]);
        assert_eq!(get_long(&buf, 1), 0x1234_5678);
    }
}
