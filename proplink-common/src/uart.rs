// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Full-duplex pumping for UARTs with shallow hardware FIFOs.
//!
//! The boot ROM starts answering the handshake while the templates that
//! clock its reply are still going out, so a blocking write lets the receive
//! FIFO overrun. [`RxQueue::transmit`] empties the receiver between every
//! burst it writes.

use heapless::Deque;

/// Non-blocking access to a UART's FIFOs.
pub trait RawUart {
    /// Queue as many of `bytes` as the transmitter accepts right now.
    fn write_some(&mut self, bytes: &[u8]) -> usize;
    /// Move whatever the receiver holds into `buf`, returning the count.
    /// Bytes received before a line error must still be returned.
    fn read_some(&mut self, buf: &mut [u8]) -> usize;
    /// True while the transmitter is still shifting bytes out.
    fn is_busy(&mut self) -> bool;
}

/// Software receive buffer filled while transmitting.
pub struct RxQueue<const N: usize> {
    bytes: Deque<u8, N>,
    dropped: usize,
}

impl<const N: usize> Default for RxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxQueue<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
            dropped: 0,
        }
    }

    /// Empty the receive FIFO into the queue.
    pub fn drain(&mut self, uart: &mut impl RawUart) {
        let mut buf = [0u8; 32];
        loop {
            let count = uart.read_some(&mut buf);
            if count == 0 {
                return;
            }
            for &byte in &buf[..count] {
                if self.bytes.push_back(byte).is_err() {
                    self.dropped += 1;
                }
            }
        }
    }

    /// Write all of `bytes`, draining the receiver while the FIFO is full.
    pub fn transmit(&mut self, uart: &mut impl RawUart, bytes: &[u8]) {
        let mut rest = bytes;
        while !rest.is_empty() {
            let written = uart.write_some(rest);
            rest = &rest[written..];
            self.drain(uart);
        }
    }

    /// Wait until the transmitter is idle, still draining.
    pub fn flush(&mut self, uart: &mut impl RawUart) {
        while uart.is_busy() {
            self.drain(uart);
        }
        self.drain(uart);
    }

    /// Hand queued bytes to the caller, oldest first.
    pub fn pop_into(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        while count < buf.len() {
            match self.bytes.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes lost to a full queue since the last call.
    pub fn take_dropped(&mut self) -> usize {
        core::mem::take(&mut self.dropped)
    }
}
