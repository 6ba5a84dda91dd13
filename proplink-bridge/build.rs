// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use std::env;
use std::fs;
use std::path::PathBuf;

const LOADER_BLOBS: [&str; 5] = [
    "ip_loader.bin",
    "verify_ram.bin",
    "program_verify_eeprom.bin",
    "ready_to_launch.bin",
    "launch_now.bin",
];

const MEMORY_X: &str = "\
MEMORY {
    BOOT2 : ORIGIN = 0x10000000, LENGTH = 0x100
    FLASH : ORIGIN = 0x10000100, LENGTH = 2048K - 0x100
    RAM   : ORIGIN = 0x20000000, LENGTH = 256K
}

SECTIONS {
    .boot2 ORIGIN(BOOT2) :
    {
        KEEP(*(.boot2));
    } > BOOT2
} INSERT BEFORE .text;
";

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    fs::write(out_dir.join("memory.x"), MEMORY_X).expect("Failed to write memory.x");
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg=-Tlink.x");
    println!("cargo:rustc-link-arg=-Tdefmt.x");

    // Second-stage loader binaries. Without them the bridge still builds, but
    // full loads fail until it is rebuilt with the blobs in place.
    let loader_dir = env::var_os("PROPLINK_LOADER_DIR").map(PathBuf::from);
    for name in LOADER_BLOBS {
        let dest = out_dir.join(name);
        match &loader_dir {
            Some(dir) => {
                let src = dir.join(name);
                fs::copy(&src, &dest)
                    .unwrap_or_else(|e| panic!("Failed to copy {}: {e}", src.display()));
                println!("cargo:rerun-if-changed={}", src.display());
            }
            None => fs::write(&dest, b"").expect("Failed to write placeholder blob"),
        }
    }
    if loader_dir.is_none() {
        println!("cargo:warning=PROPLINK_LOADER_DIR not set, full loads will be rejected");
    }

    println!("cargo:rerun-if-env-changed=PROPLINK_LOADER_DIR");
    println!("cargo:rerun-if-changed=build.rs");
}
