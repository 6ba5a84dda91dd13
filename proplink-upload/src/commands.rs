// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for load operations.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use proplink_common::protocol::{Request, Response, MAX_ROM_IMAGE_SIZE};
use proplink_common::{LoadArgs, LoadState, MAX_DATA_BLOCK_SIZE, MAX_TARGET_IMAGE_SIZE};

use crate::transport::{expect_ok, Transport};

const CHUNK_SIZE: usize = MAX_DATA_BLOCK_SIZE;

/// A load session, run by the bridge or locally over a Prop Plug.
///
/// Each call returns once the request's outcome is known.
pub trait Session {
    fn begin(&mut self, image_size: usize, args: &LoadArgs) -> Result<()>;
    fn data(&mut self, chunk: &[u8]) -> Result<()>;
    fn end(&mut self, command: &str) -> Result<()>;
    fn rom_load(&mut self, image: &[u8], args: &LoadArgs) -> Result<()>;
}

/// Get and display bridge status.
pub fn status(transport: &mut Transport) -> Result<()> {
    let response = transport.send_recv(&Request::GetStatus)?;

    match response {
        Response::Status {
            state,
            target_version,
            packet_id,
        } => {
            println!("Bridge Status:");
            println!("  State:          {}", state);
            match target_version {
                Some(v) => println!("  Target version: {}", v),
                None => println!("  Target version: unknown"),
            }
            if state != LoadState::Idle {
                println!("  Packet id:      {}", packet_id);
            }
        }
        Response::Outcome { status, message } => {
            println!("Unexpected outcome response: {} {}", status, message);
        }
    }

    Ok(())
}

fn read_image(file: &Path) -> Result<Vec<u8>> {
    let image = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if image.is_empty() {
        bail!("{} is empty", file.display());
    }
    Ok(image)
}

/// Zero-pad `image` to a whole number of longs.
fn pad_to_long(image: &mut Vec<u8>) {
    let len = image.len().next_multiple_of(4);
    image.resize(len, 0);
}

fn print_args(args: &LoadArgs) {
    if let Some(baud) = args.initial_baud {
        println!("Initial baud: {}", baud);
    }
    if let Some(baud) = args.second_stage_baud {
        println!("Fast baud:    {}", baud);
    }
    if let Some(pin) = args.reset_pin {
        println!("Reset pin:    {}", pin);
    }
}

/// Load an image through the second-stage loader.
pub fn load(session: &mut impl Session, file: &Path, command: &str, args: &LoadArgs) -> Result<()> {
    let image = read_image(file)?;
    if image.len() > MAX_TARGET_IMAGE_SIZE {
        bail!(
            "{} is {} bytes, the target holds at most {}",
            file.display(),
            image.len(),
            MAX_TARGET_IMAGE_SIZE
        );
    }

    println!("Image:   {} ({} bytes)", file.display(), image.len());
    println!("Command: {}", command);
    print_args(args);
    println!();

    print!("Resetting target and starting loader... ");
    std::io::stdout().flush()?;
    session.begin(image.len(), args)?;
    println!("OK");

    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut offset = 0usize;
    for chunk in image.chunks(CHUNK_SIZE) {
        if let Err(e) = session.data(chunk) {
            pb.abandon();
            return Err(e.context(format!("Data at offset {}", offset)));
        }
        offset += chunk.len();
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Upload complete");
    println!();

    print!("Verifying and launching ({})... ", command);
    std::io::stdout().flush()?;
    session.end(command)?;
    println!("OK");

    println!();
    println!("Image loaded successfully!");
    Ok(())
}

/// Load a small image through the boot ROM alone.
pub fn rom_load(session: &mut impl Session, file: &Path, args: &LoadArgs) -> Result<()> {
    let mut image = read_image(file)?;
    pad_to_long(&mut image);
    if image.len() > MAX_ROM_IMAGE_SIZE {
        bail!(
            "{} is {} bytes, ROM loads take at most {}",
            file.display(),
            image.len(),
            MAX_ROM_IMAGE_SIZE
        );
    }

    println!("Image: {} ({} bytes)", file.display(), image.len());
    print_args(args);
    println!();

    print!("Loading through the boot ROM... ");
    std::io::stdout().flush()?;
    session.rom_load(&image, args)?;
    println!("OK");
    Ok(())
}

/// Abort the bridge's current session.
pub fn abort(transport: &mut Transport) -> Result<()> {
    print!("Aborting session... ");
    std::io::stdout().flush()?;

    // A request still in flight is answered first with its own outcome.
    let mut response = transport.send_recv(&Request::Abort)?;
    if !response.is_ok() {
        response = transport.receive()?;
    }
    expect_ok("Abort", response)?;
    println!("OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_to_long() {
        let mut image = vec![1, 2, 3, 4, 5];
        pad_to_long(&mut image);
        assert_eq!(image, vec![1, 2, 3, 4, 5, 0, 0, 0]);

        let mut aligned = vec![9; 8];
        pad_to_long(&mut aligned);
        assert_eq!(aligned.len(), 8);
    }
}
