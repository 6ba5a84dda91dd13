// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Direct loading through a Prop Plug style USB-serial adapter.
//!
//! The load engine runs on the host: the serial port is the transport, DTR
//! drives the target's reset line, and timers are deadlines checked between
//! short reads.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use rand::rngs::ThreadRng;
use serialport::SerialPort;

use proplink_common::platform::{PinLevel, ResetLine, Responder, Timer, Transport};
use proplink_common::{LoadArgs, LoadError, Loader, SecondStage};

use crate::commands::Session;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Second-stage loader binaries read from disk.
#[derive(Default)]
pub struct LoaderBlobs {
    loader: Vec<u8>,
    verify_ram: Vec<u8>,
    program_verify_eeprom: Vec<u8>,
    ready_to_launch: Vec<u8>,
    launch_now: Vec<u8>,
}

impl LoaderBlobs {
    pub fn read(dir: &Path) -> Result<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
        };
        Ok(Self {
            loader: read("ip_loader.bin")?,
            verify_ram: read("verify_ram.bin")?,
            program_verify_eeprom: read("program_verify_eeprom.bin")?,
            ready_to_launch: read("ready_to_launch.bin")?,
            launch_now: read("launch_now.bin")?,
        })
    }

    pub fn stage(&self) -> SecondStage<'_> {
        SecondStage {
            loader: &self.loader,
            verify_ram: &self.verify_ram,
            program_verify_eeprom: &self.program_verify_eeprom,
            ready_to_launch: &self.ready_to_launch,
            launch_now: &self.launch_now,
        }
    }
}

/// Host platform over a serial port.
struct SerialPlatform {
    port: Box<dyn SerialPort>,
    deadline: Option<Instant>,
    hook_installed: bool,
    outcome: Option<Result<(), LoadError>>,
    /// First I/O failure since the last check; the engine's effects cannot
    /// fail, so it is reported from the event loop.
    io_error: Option<io::Error>,
}

impl SerialPlatform {
    fn record(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            self.io_error.get_or_insert(e);
        }
    }

    fn timer_expired(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Read what is available, waiting at most one poll interval.
    fn poll_receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(count) if self.hook_installed => Ok(count),
            Ok(_) => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl Transport for SerialPlatform {
    fn transmit(&mut self, bytes: &[u8]) {
        // Flush waits for the bytes to leave, keeping timers honest.
        let result = self.port.write_all(bytes).and_then(|_| self.port.flush());
        self.record(result);
    }

    fn set_baud_rate(&mut self, baud: u32) {
        let result = self.port.set_baud_rate(baud).map_err(io::Error::from);
        self.record(result);
    }

    fn install_receive_hook(&mut self) {
        self.hook_installed = true;
    }

    fn clear_receive_hook(&mut self) {
        self.hook_installed = false;
    }
}

impl Timer for SerialPlatform {
    fn arm(&mut self, ms: u32) {
        self.deadline = Some(Instant::now() + Duration::from_millis(ms as u64));
    }

    fn disarm(&mut self) {
        self.deadline = None;
    }
}

impl ResetLine for SerialPlatform {
    // DTR is the only reset line a Prop Plug has.
    fn configure_as_output(&mut self, _pin: u8) {}

    fn set_level(&mut self, _pin: u8, level: PinLevel) {
        // Asserted DTR pulls RESn low.
        let result = self
            .port
            .write_data_terminal_ready(level == PinLevel::Low)
            .map_err(io::Error::from);
        self.record(result);
    }
}

impl Responder for SerialPlatform {
    fn respond(&mut self, result: Result<(), LoadError>) {
        self.outcome = Some(result);
    }
}

/// A load session run locally over a Prop Plug.
pub struct PlugSession<'a> {
    platform: SerialPlatform,
    loader: Loader<'a, ThreadRng>,
}

impl<'a> PlugSession<'a> {
    pub fn open(port_name: &str, stage: SecondStage<'a>) -> Result<Self> {
        let port = serialport::new(port_name, 115200)
            .timeout(POLL_INTERVAL)
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self {
            platform: SerialPlatform {
                port,
                deadline: None,
                hook_installed: false,
                outcome: None,
                io_error: None,
            },
            loader: Loader::new(stage, rand::thread_rng()),
        })
    }

    /// Drive the engine until the outstanding request has an outcome.
    fn wait_outcome(&mut self) -> Result<()> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(outcome) = self.platform.outcome.take() {
                return outcome.map_err(anyhow::Error::from);
            }
            if let Some(e) = self.platform.io_error.take() {
                self.loader.abort(&mut self.platform);
                return Err(e).context("Serial I/O failed");
            }
            if self.loader.is_idle() {
                bail!("Session ended without an outcome");
            }

            if self.platform.timer_expired() {
                self.loader.on_timer(&mut self.platform);
                continue;
            }
            let count = self
                .platform
                .poll_receive(&mut buf)
                .context("Serial read error")?;
            if count > 0 {
                self.loader.on_receive(&mut self.platform, &buf[..count]);
            }
        }
    }
}

impl Session for PlugSession<'_> {
    fn begin(&mut self, image_size: usize, args: &LoadArgs) -> Result<()> {
        self.loader.begin_load(&mut self.platform, image_size, args)?;
        self.wait_outcome()
    }

    fn data(&mut self, chunk: &[u8]) -> Result<()> {
        self.loader.feed_data(&mut self.platform, chunk)?;
        self.wait_outcome()
    }

    fn end(&mut self, command: &str) -> Result<()> {
        self.loader.end_load(&mut self.platform, command)?;
        self.wait_outcome()
    }

    fn rom_load(&mut self, image: &[u8], args: &LoadArgs) -> Result<()> {
        self.loader.begin_rom_load(&mut self.platform, image, args)?;
        self.wait_outcome()
    }
}

impl Drop for PlugSession<'_> {
    fn drop(&mut self) {
        // Leave the target out of reset whatever happened.
        if !self.loader.is_idle() {
            self.loader.abort(&mut self.platform);
        }
        let _ = self.platform.port.write_data_terminal_ready(false);
    }
}
