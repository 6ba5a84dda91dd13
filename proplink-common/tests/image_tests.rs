// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for second-stage loader image patching.

use proplink_common::image::{
    generate_bootstrap_image, get_long, packet_count, rom_checksum, IMAGE_CAPACITY,
    INIT_AREA_OFFSET_FROM_END,
};
use proplink_common::ImageError;

fn template(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7) as u8).collect()
}

/// Offset of the init area in a template of `len` bytes.
fn init(len: usize) -> usize {
    len - INIT_AREA_OFFSET_FROM_END
}

// =============================================================================
// packet_count
// =============================================================================

#[test]
fn test_packet_count_rounds_up() {
    assert_eq!(packet_count(1), 1);
    assert_eq!(packet_count(1024), 1);
    assert_eq!(packet_count(1025), 2);
    assert_eq!(packet_count(4096), 4);
    assert_eq!(packet_count(32 * 1024), 32);
}

// =============================================================================
// generate_bootstrap_image
// =============================================================================

#[test]
fn test_patched_fields_at_default_rates() {
    let tpl = template(128);
    let img = generate_bootstrap_image(&tpl, 4096, 115_200, 921_600).unwrap();
    let data = &img.data;
    let base = init(tpl.len());

    assert_eq!(img.packet_count, 4);
    assert_eq!(get_long(data, base + 4), 694);
    assert_eq!(get_long(data, base + 8), 87);
    assert_eq!(get_long(data, base + 12), 107);
    assert_eq!(get_long(data, base + 16), 13_333_333);
    assert_eq!(get_long(data, base + 20), 145);
    assert_eq!(get_long(data, base + 36), 4);
}

#[test]
fn test_final_rate_drives_timing_fields() {
    let tpl = template(64);
    let img = generate_bootstrap_image(&tpl, 100, 115_200, 115_200).unwrap();
    let base = init(tpl.len());
    assert_eq!(get_long(&img.data, base + 8), 694);
    assert_eq!(get_long(&img.data, base + 12), 1019);
    assert_eq!(get_long(&img.data, base + 20), 1157);
}

#[test]
fn test_checksum_balances_image_and_call_frame() {
    let tpl = template(256);
    let img = generate_bootstrap_image(&tpl, 2000, 115_200, 921_600).unwrap();
    assert_eq!(rom_checksum(&img.data), 0);
}

#[test]
fn test_patching_is_idempotent() {
    let tpl = template(128);
    let first = generate_bootstrap_image(&tpl, 3000, 57_600, 460_800).unwrap();
    let second = generate_bootstrap_image(&first.data, 3000, 57_600, 460_800).unwrap();
    assert_eq!(first.data, second.data);
}

#[test]
fn test_bytes_outside_patched_fields_are_untouched() {
    let tpl = template(128);
    let img = generate_bootstrap_image(&tpl, 1, 115_200, 921_600).unwrap();
    let base = init(tpl.len());
    for (i, (&patched, &orig)) in img.data.iter().zip(tpl.iter()).enumerate() {
        let in_field = [4, 8, 12, 16, 20, 36]
            .iter()
            .any(|&f| (base + f..base + f + 4).contains(&i));
        if i != 5 && !in_field {
            assert_eq!(patched, orig, "byte {i}");
        }
    }
}

#[test]
fn test_rejects_bad_templates() {
    assert_eq!(
        generate_bootstrap_image(&template(60), 1, 115_200, 115_200).unwrap_err(),
        ImageError::TemplateTooShort
    );
    assert_eq!(
        generate_bootstrap_image(&template(66), 1, 115_200, 115_200).unwrap_err(),
        ImageError::Misaligned
    );
    assert_eq!(
        generate_bootstrap_image(&template(IMAGE_CAPACITY + 4), 1, 115_200, 115_200)
            .unwrap_err(),
        ImageError::TemplateTooLarge
    );
    assert_eq!(
        generate_bootstrap_image(&template(64), 1, 0, 115_200).unwrap_err(),
        ImageError::ZeroBaud
    );
}
