// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Propeller image upload tool for the proplink bridge (USB CDC) or a Prop
//! Plug style serial adapter.
//!
//! Usage:
//!   proplink-upload --port /dev/ttyACM0 status
//!   proplink-upload --port /dev/ttyACM0 load blink.binary --command program-and-run
//!   proplink-upload --port /dev/ttyUSB0 --plug --loader-dir loader load blink.binary
//!   proplink-upload --port /dev/ttyACM0 abort

mod cli;
mod commands;
mod plug;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
