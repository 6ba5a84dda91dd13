// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB CDC transport with COBS-framed postcard serialization.

use proplink_common::protocol::{Request, Response};
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

// Largest frame is a ROM load request carrying a full image.
const RX_BUF_SIZE: usize = 4096;
const TX_BUF_SIZE: usize = 256;

pub struct UsbTransport {
    serial: SerialPort<'static, UsbBus>,
    usb_dev: UsbDevice<'static, UsbBus>,
    rx_buf: [u8; RX_BUF_SIZE],
    rx_pos: usize,
    overflowed: bool,
}

impl UsbTransport {
    pub fn new(usb_bus: &'static UsbBusAllocator<UsbBus>) -> Self {
        let serial = SerialPort::new(usb_bus);
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x2E8A, 0x000A))
            .strings(&[StringDescriptors::default()
                .manufacturer("ADNT")
                .product("Proplink Bridge")
                .serial_number("0001")])
            .unwrap()
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        Self {
            serial,
            usb_dev,
            rx_buf: [0u8; RX_BUF_SIZE],
            rx_pos: 0,
            overflowed: false,
        }
    }

    /// Poll USB device. Must be called frequently.
    pub fn poll(&mut self) -> bool {
        self.usb_dev.poll(&mut [&mut self.serial])
    }

    /// Try to receive a complete COBS-framed request.
    ///
    /// Stops at the first complete frame; bytes after the delimiter stay
    /// buffered in the serial class until the next call.
    pub fn try_receive(&mut self) -> Option<Request> {
        let mut tmp = [0u8; 1];
        loop {
            match self.serial.read(&mut tmp) {
                Ok(1) => {}
                _ => return None,
            }
            let byte = tmp[0];
            if byte == 0x00 {
                let len = core::mem::replace(&mut self.rx_pos, 0);
                if core::mem::replace(&mut self.overflowed, false) {
                    defmt::warn!("dropped oversized frame");
                    continue;
                }
                if len == 0 {
                    continue;
                }
                match postcard::from_bytes_cobs::<Request>(&mut self.rx_buf[..len]) {
                    Ok(req) => return Some(req),
                    Err(_) => defmt::warn!("undecodable frame ({} bytes)", len),
                }
            } else if self.rx_pos < RX_BUF_SIZE {
                self.rx_buf[self.rx_pos] = byte;
                self.rx_pos += 1;
            } else {
                self.overflowed = true;
            }
        }
    }

    /// Send a response as a COBS-framed postcard message.
    pub fn send(&mut self, resp: &Response) {
        let mut buf = [0u8; TX_BUF_SIZE];
        if let Ok(encoded) = postcard::to_slice_cobs(resp, &mut buf) {
            let mut offset = 0;
            while offset < encoded.len() {
                match self.serial.write(&encoded[offset..]) {
                    Ok(n) => offset += n,
                    Err(UsbError::WouldBlock) => {
                        self.poll();
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
