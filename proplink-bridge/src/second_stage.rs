// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Second-stage loader binaries, embedded at build time from
//! `PROPLINK_LOADER_DIR`.

use proplink_common::SecondStage;

macro_rules! blob {
    ($name:literal) => {
        include_bytes!(concat!(env!("OUT_DIR"), "/", $name))
    };
}

pub static SECOND_STAGE: SecondStage<'static> = SecondStage {
    loader: blob!("ip_loader.bin"),
    verify_ram: blob!("verify_ram.bin"),
    program_verify_eeprom: blob!("program_verify_eeprom.bin"),
    ready_to_launch: blob!("ready_to_launch.bin"),
    launch_now: blob!("launch_now.bin"),
};

pub fn is_complete() -> bool {
    !SECOND_STAGE.loader.is_empty()
}
