// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bridge communication.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

use proplink_common::protocol::{Request, Response};
use proplink_common::{LoadArgs, STATUS_OK};

use crate::commands::Session;

/// Default timeout for serial operations in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
/// Reset, handshake, bootstrap download and second-stage startup.
pub const BEGIN_TIMEOUT_MS: u64 = 10_000;
/// Verify RAM, program and verify EEPROM, launch.
pub const END_TIMEOUT_MS: u64 = 20_000;

const TX_BUF_SIZE: usize = 4096;

/// USB CDC transport for communicating with the bridge.
pub struct Transport {
    port: Box<dyn SerialPort>,
    rx_buf: Vec<u8>,
}

impl Transport {
    /// Create a new transport connection to the specified serial port.
    pub fn new(port_name: &str) -> Result<Self> {
        Self::with_timeout(port_name, DEFAULT_TIMEOUT_MS)
    }

    /// Create a new transport connection with a custom timeout.
    pub fn with_timeout(port_name: &str, timeout_ms: u64) -> Result<Self> {
        let port = serialport::new(port_name, 115200)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self {
            port,
            rx_buf: Vec::with_capacity(256),
        })
    }

    /// Send a request to the bridge.
    pub fn send(&mut self, req: &Request) -> Result<()> {
        let mut buf = [0u8; TX_BUF_SIZE];
        let encoded = postcard::to_slice_cobs(req, &mut buf)
            .map_err(|e| anyhow::anyhow!("Failed to serialize request: {}", e))?;
        self.port
            .write_all(encoded)
            .map_err(|e| anyhow::anyhow!("Failed to write to serial port: {}", e))?;
        self.port.flush()?;
        Ok(())
    }

    /// Receive a response from the bridge.
    pub fn receive(&mut self) -> Result<Response> {
        self.rx_buf.clear();
        let mut byte = [0u8; 1];

        // Read until we get delimiter (0x00)
        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    self.rx_buf.push(byte[0]);
                    if byte[0] == 0 {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    bail!("Timeout waiting for response");
                }
                Err(e) => bail!("Serial read error: {}", e),
            }
        }

        postcard::from_bytes_cobs(&mut self.rx_buf).map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize response: {} (raw {} bytes: {:02x?})",
                e,
                self.rx_buf.len(),
                &self.rx_buf[..self.rx_buf.len().min(32)]
            )
        })
    }

    fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.port.timeout();
        let _ = self.port.set_timeout(Duration::from_millis(10));
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.port.set_timeout(old_timeout);
    }

    /// Send a request and wait for the response.
    pub fn send_recv(&mut self, req: &Request) -> Result<Response> {
        self.drain_rx();
        self.send(req)?;
        self.receive()
    }

    /// Send a request and wait for the response with a custom timeout.
    pub fn send_recv_timeout(&mut self, req: &Request, timeout_ms: u64) -> Result<Response> {
        let old_timeout = self.port.timeout();
        self.port
            .set_timeout(Duration::from_millis(timeout_ms))
            .map_err(|e| anyhow::anyhow!("Failed to set timeout: {}", e))?;

        let result = self.send_recv(req);

        let _ = self.port.set_timeout(old_timeout);
        result
    }

    fn request(&mut self, what: &str, req: &Request, timeout_ms: u64) -> Result<()> {
        let response = self.send_recv_timeout(req, timeout_ms)?;
        expect_ok(what, response)
    }
}

/// Turn an outcome frame into a result.
pub fn expect_ok(what: &str, response: Response) -> Result<()> {
    match response {
        Response::Outcome {
            status: STATUS_OK, ..
        } => Ok(()),
        Response::Outcome { status, message } => bail!("{} failed ({}): {}", what, status, message),
        other => bail!("Unexpected response to {}: {:?}", what, other),
    }
}

impl Session for Transport {
    fn begin(&mut self, image_size: usize, args: &LoadArgs) -> Result<()> {
        let req = Request::Begin {
            image_size: image_size as u32,
            args: *args,
        };
        self.request("Begin", &req, BEGIN_TIMEOUT_MS)
    }

    fn data(&mut self, chunk: &[u8]) -> Result<()> {
        let req = Request::Data {
            data: chunk.to_vec(),
        };
        self.request("Data", &req, DEFAULT_TIMEOUT_MS)
    }

    fn end(&mut self, command: &str) -> Result<()> {
        let req = Request::End {
            command: command.to_string(),
        };
        self.request("End", &req, END_TIMEOUT_MS)
    }

    fn rom_load(&mut self, image: &[u8], args: &LoadArgs) -> Result<()> {
        let req = Request::RomLoad {
            args: *args,
            image: image.to_vec(),
        };
        self.request("RomLoad", &req, BEGIN_TIMEOUT_MS)
    }
}
