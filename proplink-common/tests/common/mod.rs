// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Recording platform and fixtures shared by the loader tests.

#![allow(dead_code)]

use proplink_common::fast::packet_header;
use proplink_common::handshake::RX_HANDSHAKE;
use proplink_common::{
    LoadArgs, LoadError, LoadState, Loader, PinLevel, ResetLine, Responder, SecondStage, Timer,
    Transport,
};
use rand::rngs::mock::StepRng;

pub const FIRST_TAG: u64 = 0x1000;

pub static LOADER: [u8; 96] = [0u8; 96];
pub static VERIFY_RAM: [u8; 8] = [0x11; 8];
pub static PROGRAM_VERIFY_EEPROM: [u8; 8] = [0x22; 8];
pub static READY_TO_LAUNCH: [u8; 8] = [0x33; 8];
pub static LAUNCH_NOW: [u8; 8] = [0x44; 8];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Transmit(Vec<u8>),
    Baud(u32),
    HookInstalled,
    HookCleared,
    Arm(u32),
    Disarm,
    Configure(u8),
    Level(u8, PinLevel),
    Respond(Result<(), LoadError>),
}

#[derive(Default)]
pub struct MockPlatform {
    pub events: Vec<Event>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn responses(&self) -> Vec<Result<(), LoadError>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Respond(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    /// All transmitted bytes, concatenated.
    pub fn transmitted(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Transmit(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn last_arm(&self) -> Option<u32> {
        self.events.iter().rev().find_map(|e| match e {
            Event::Arm(ms) => Some(*ms),
            _ => None,
        })
    }
}

impl Transport for MockPlatform {
    fn transmit(&mut self, bytes: &[u8]) {
        self.events.push(Event::Transmit(bytes.to_vec()));
    }

    fn set_baud_rate(&mut self, baud: u32) {
        self.events.push(Event::Baud(baud));
    }

    fn install_receive_hook(&mut self) {
        self.events.push(Event::HookInstalled);
    }

    fn clear_receive_hook(&mut self) {
        self.events.push(Event::HookCleared);
    }
}

impl Timer for MockPlatform {
    fn arm(&mut self, ms: u32) {
        self.events.push(Event::Arm(ms));
    }

    fn disarm(&mut self) {
        self.events.push(Event::Disarm);
    }
}

impl ResetLine for MockPlatform {
    fn configure_as_output(&mut self, pin: u8) {
        self.events.push(Event::Configure(pin));
    }

    fn set_level(&mut self, pin: u8, level: PinLevel) {
        self.events.push(Event::Level(pin, level));
    }
}

impl Responder for MockPlatform {
    fn respond(&mut self, result: Result<(), LoadError>) {
        self.events.push(Event::Respond(result));
    }
}

pub fn stage() -> SecondStage<'static> {
    SecondStage {
        loader: &LOADER,
        verify_ram: &VERIFY_RAM,
        program_verify_eeprom: &PROGRAM_VERIFY_EEPROM,
        ready_to_launch: &READY_TO_LAUNCH,
        launch_now: &LAUNCH_NOW,
    }
}

pub fn new_loader() -> Loader<'static, StepRng> {
    Loader::new(stage(), StepRng::new(FIRST_TAG, 1))
}

/// Valid handshake reply from a version 1 chip.
pub fn handshake_reply() -> Vec<u8> {
    let mut reply = RX_HANDSHAKE.to_vec();
    reply.extend_from_slice(&[0xCF, 0xCE, 0xCE, 0xCE]);
    reply
}

pub fn ack(id: i32, tag: i32) -> [u8; 8] {
    packet_header(id, tag)
}

/// Begin a load and step through the reset pulse up to the handshake reply.
pub fn run_to_rx_handshake(
    loader: &mut Loader<'static, StepRng>,
    io: &mut MockPlatform,
    image_size: usize,
) {
    loader
        .begin_load(io, image_size, &LoadArgs::default())
        .unwrap();
    for _ in 0..3 {
        loader.on_timer(io);
    }
    assert_eq!(loader.state(), LoadState::RxHandshake);
}

/// Begin a load and complete the bootstrap, leaving the loader in `Data`.
pub fn run_to_data(loader: &mut Loader<'static, StepRng>, io: &mut MockPlatform, image_size: usize) {
    run_to_rx_handshake(loader, io, image_size);
    loader.on_receive(io, &handshake_reply());
    assert_eq!(loader.state(), LoadState::VerifyChecksum);
    loader.on_receive(io, &[0xFE]);
    assert_eq!(loader.state(), LoadState::StartAck);
    let packets = loader.expected_id();
    loader.on_receive(io, &ack(packets, 0));
    assert_eq!(loader.state(), LoadState::Data);
}
