// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Load engine platform backed by UART0, the reset GPIO and the system timer.
//!
//! Everything is polled from the main loop: [`Target::poll_receive`] and
//! [`Target::timer_expired`] tell the loop when to resume the loader, and
//! outcomes wait in a queue until the loop forwards them to the host.
//! Transmits drain UART0's receive FIFO as they go, since the target answers
//! the handshake before it has all been sent.

use embedded_hal::digital::OutputPin;
use heapless::Deque;
use proplink_common::platform::{self, PinLevel, ResetLine, Responder, Transport};
use proplink_common::uart::{RawUart, RxQueue};
use proplink_common::LoadError;
use rand_core::{impls, RngCore};
use rp2040_hal as hal;
use rp2040_hal::fugit::HertzU32;

use crate::peripherals::{self, ResetPin, Rosc, TargetUart, RESET_PIN};

const OUTCOME_QUEUE_LEN: usize = 4;
const RX_QUEUE_LEN: usize = 512;

/// UART0 behind the non-blocking FIFO interface.
pub struct Uart0(TargetUart);

impl RawUart for Uart0 {
    fn write_some(&mut self, bytes: &[u8]) -> usize {
        match self.0.write_raw(bytes) {
            Ok(rest) => bytes.len() - rest.len(),
            Err(_) => 0,
        }
    }

    fn read_some(&mut self, buf: &mut [u8]) -> usize {
        match self.0.read_raw(buf) {
            Ok(count) => count,
            Err(nb::Error::WouldBlock) => 0,
            // `discarded` is the good prefix of `buf`, read before the error.
            Err(nb::Error::Other(e)) => {
                defmt::warn!("UART0 line error after {} bytes", e.discarded.len());
                e.discarded.len()
            }
        }
    }

    fn is_busy(&mut self) -> bool {
        self.0.uart_is_busy()
    }
}

pub struct Target {
    /// `None` only if re-enabling at a new rate failed.
    uart: Option<Uart0>,
    rx: RxQueue<RX_QUEUE_LEN>,
    peripheral_freq: HertzU32,
    reset: ResetPin,
    timer: hal::Timer,
    deadline_us: Option<u64>,
    hook_installed: bool,
    outcomes: Deque<Result<(), LoadError>, OUTCOME_QUEUE_LEN>,
}

impl Target {
    pub fn new(
        uart: TargetUart,
        peripheral_freq: HertzU32,
        reset: ResetPin,
        timer: hal::Timer,
    ) -> Self {
        Self {
            uart: Some(Uart0(uart)),
            rx: RxQueue::new(),
            peripheral_freq,
            reset,
            timer,
            deadline_us: None,
            hook_installed: false,
            outcomes: Deque::new(),
        }
    }

    fn now_us(&self) -> u64 {
        self.timer.get_counter().ticks()
    }

    /// Hand over whatever has been received. Bytes arriving while no receive
    /// hook is installed are drained and dropped.
    pub fn poll_receive(&mut self, buf: &mut [u8]) -> usize {
        if let Some(uart) = self.uart.as_mut() {
            self.rx.drain(uart);
        }
        let dropped = self.rx.take_dropped();
        if dropped > 0 {
            defmt::warn!("receive queue full, dropped {} bytes", dropped);
        }
        let count = self.rx.pop_into(buf);
        if self.hook_installed {
            count
        } else {
            0
        }
    }

    /// True once per arming, when the deadline has passed.
    pub fn timer_expired(&mut self) -> bool {
        match self.deadline_us {
            Some(deadline) if self.now_us() >= deadline => {
                self.deadline_us = None;
                true
            }
            _ => false,
        }
    }

    pub fn next_outcome(&mut self) -> Option<Result<(), LoadError>> {
        self.outcomes.pop_front()
    }
}

impl Transport for Target {
    fn transmit(&mut self, bytes: &[u8]) {
        if let Some(uart) = self.uart.as_mut() {
            self.rx.transmit(uart, bytes);
        }
    }

    fn set_baud_rate(&mut self, baud: u32) {
        let Some(mut uart) = self.uart.take() else {
            return;
        };
        // Let the FIFO drain at the old rate.
        self.rx.flush(&mut uart);
        match uart
            .0
            .disable()
            .enable(peripherals::uart_config(baud), self.peripheral_freq)
        {
            Ok(uart) => self.uart = Some(Uart0(uart)),
            Err(_) => defmt::error!("UART0 rejected {} baud", baud),
        }
    }

    fn install_receive_hook(&mut self) {
        self.hook_installed = true;
    }

    fn clear_receive_hook(&mut self) {
        self.hook_installed = false;
    }
}

impl platform::Timer for Target {
    fn arm(&mut self, ms: u32) {
        self.deadline_us = Some(self.now_us() + ms as u64 * 1000);
    }

    fn disarm(&mut self) {
        self.deadline_us = None;
    }
}

impl ResetLine for Target {
    fn configure_as_output(&mut self, pin: u8) {
        // The pin is configured once at init.
        if pin != RESET_PIN {
            defmt::warn!("reset pin {} requested, GPIO{} is wired", pin, RESET_PIN);
        }
    }

    fn set_level(&mut self, _pin: u8, level: PinLevel) {
        match level {
            PinLevel::Low => self.reset.set_low().ok(),
            PinLevel::High => self.reset.set_high().ok(),
        };
    }
}

impl Responder for Target {
    fn respond(&mut self, result: Result<(), LoadError>) {
        if let Err(dropped) = self.outcomes.push_back(result) {
            defmt::warn!("outcome queue full, dropping {}", dropped);
        }
    }
}

/// Packet tags drawn from ring oscillator jitter.
pub struct RoscRng {
    rosc: Rosc,
}

impl RoscRng {
    pub fn new(rosc: Rosc) -> Self {
        Self { rosc }
    }
}

impl RngCore for RoscRng {
    fn next_u32(&mut self) -> u32 {
        (0..32).fold(0u32, |acc, _| (acc << 1) | self.rosc.get_random_bit() as u32)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
