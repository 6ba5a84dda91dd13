// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Load session state machine.
//!
//! Sequences the target reset, the boot ROM handshake and download, and the
//! second-stage packet exchange. The loader owns the only session; callers
//! drive it through the session control methods and the platform resumes it
//! with [`Loader::on_receive`] and [`Loader::on_timer`]. Each state has its
//! own transition method returning the next state; effects go out through the
//! [`Platform`] in the order they are issued.

use heapless::Vec;
use rand_core::RngCore;

use crate::error::LoadError;
use crate::fast::{AckWait, PacketSequencer, SecondStage, ACK_LEN, STARTUP_TIMEOUT_MS};
use crate::handshake::{
    self, CALIBRATE_DELAY_MS, CHECKSUM_OK, CHECKSUM_POLL, HANDSHAKE_RESPONSE_LEN,
};
use crate::image::{self, IMAGE_CAPACITY, MAX_PACKET_SIZE, MAX_TARGET_IMAGE_SIZE};
use crate::options::{LoadArgs, LoadOptions};
use crate::platform::{PinLevel, Platform};
use crate::state::{LoadState, LoadType};
use crate::window::RxWindow;

/// Reset line held high before the reset pulse.
pub const RESET_DELAY_1_MS: u32 = 10;
/// Length of the reset pulse.
pub const RESET_DELAY_2_MS: u32 = 10;
/// Time the boot ROM needs after reset before it listens.
pub const RESET_DELAY_3_MS: u32 = 100;
pub const RX_HANDSHAKE_TIMEOUT_MS: u32 = 2000;

pub struct Loader<'s, R> {
    stage: SecondStage<'s>,
    rng: R,
    state: LoadState,
    state_after_bootstrap: LoadState,
    options: LoadOptions,
    load_type: LoadType,
    /// Image sent through the boot ROM: the patched second-stage loader, or
    /// the caller's image for ROM-only loads.
    image: Vec<u8, IMAGE_CAPACITY>,
    version: Option<u8>,
    retries_remaining: u32,
    retry_delay_ms: u32,
    rx: RxWindow,
    packets: PacketSequencer,
}

impl<'s, R: RngCore> Loader<'s, R> {
    pub fn new(stage: SecondStage<'s>, rng: R) -> Self {
        Self {
            stage,
            rng,
            state: LoadState::Idle,
            state_after_bootstrap: LoadState::StartAck,
            options: LoadOptions::default(),
            load_type: LoadType::Run,
            image: Vec::new(),
            version: None,
            retries_remaining: 0,
            retry_delay_ms: CALIBRATE_DELAY_MS,
            rx: RxWindow::new(),
            packets: PacketSequencer::new(),
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == LoadState::Idle
    }

    pub fn state_after_bootstrap(&self) -> LoadState {
        self.state_after_bootstrap
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn load_type(&self) -> LoadType {
        self.load_type
    }

    /// Version reported by the target during the last handshake.
    pub fn target_version(&self) -> Option<u8> {
        self.version
    }

    pub fn bootstrap_image(&self) -> &[u8] {
        &self.image
    }

    pub fn retries_remaining(&self) -> u32 {
        self.retries_remaining
    }

    pub fn packet_id(&self) -> i32 {
        self.packets.packet_id()
    }

    pub fn expected_id(&self) -> i32 {
        self.packets.expected_id()
    }

    pub fn packet_tag(&self) -> i32 {
        self.packets.packet_tag()
    }

    pub fn checksum(&self) -> i32 {
        self.packets.checksum()
    }

    pub fn bytes_received(&self) -> usize {
        self.rx.received()
    }

    pub fn bytes_remaining(&self) -> usize {
        self.rx.remaining()
    }

    // --- Session control ---

    /// Start a full load of an `image_size`-byte application. The request
    /// completes when the second-stage loader reports in.
    pub fn begin_load<P: Platform>(
        &mut self,
        io: &mut P,
        image_size: usize,
        args: &LoadArgs,
    ) -> Result<(), LoadError> {
        if self.state != LoadState::Idle {
            return Err(LoadError::Busy);
        }
        if image_size == 0 || image_size > MAX_TARGET_IMAGE_SIZE {
            return Err(LoadError::InvalidArgs);
        }
        let options = args.resolve()?;
        let bootstrap = image::generate_bootstrap_image(
            self.stage.loader,
            image_size,
            options.initial_baud,
            options.second_stage_baud,
        )?;

        self.options = options;
        self.packets.start(bootstrap.packet_count);
        self.image = bootstrap.data;
        self.load_type = LoadType::Run;
        self.state_after_bootstrap = LoadState::StartAck;
        self.start_loading(io);
        Ok(())
    }

    /// Load `image` into target RAM through the boot ROM alone and run it.
    /// The request completes when the ROM accepts the checksum.
    pub fn begin_rom_load<P: Platform>(
        &mut self,
        io: &mut P,
        image: &[u8],
        args: &LoadArgs,
    ) -> Result<(), LoadError> {
        if self.state != LoadState::Idle {
            return Err(LoadError::Busy);
        }
        if image.is_empty() || image.len() % 4 != 0 {
            return Err(LoadError::InvalidArgs);
        }
        let options = args.resolve()?;
        let image = Vec::from_slice(image).map_err(|_| LoadError::InvalidArgs)?;

        self.options = options;
        self.packets = PacketSequencer::new();
        self.image = image;
        self.load_type = LoadType::Run;
        self.state_after_bootstrap = LoadState::Idle;
        self.start_loading(io);
        Ok(())
    }

    /// Send one chunk of the application image.
    pub fn feed_data<P: Platform>(&mut self, io: &mut P, chunk: &[u8]) -> Result<(), LoadError> {
        if self.state != LoadState::Data {
            return Err(self.reject(io, LoadError::NotReady));
        }
        if chunk.is_empty() {
            return Err(self.reject(io, LoadError::NoData));
        }
        if chunk.len() > MAX_PACKET_SIZE {
            return Err(self.reject(io, LoadError::ChunkTooLarge { len: chunk.len() }));
        }
        self.packets.update_checksum(chunk);
        let wait = self.packets.send_data(io, &mut self.rng, chunk);
        let next = self.await_ack(io, wait);
        self.transition(next);
        Ok(())
    }

    /// Finish the upload and ask the target to `command` the image.
    pub fn end_load<P: Platform>(&mut self, io: &mut P, command: &str) -> Result<(), LoadError> {
        if self.state != LoadState::Data {
            return Err(self.reject(io, LoadError::NotReady));
        }
        if self.packets.packet_id() != 0 {
            return Err(self.reject(io, LoadError::MoreDataExpected));
        }
        let load_type = match LoadType::from_command(command) {
            Ok(load_type) => load_type,
            Err(e) => return Err(self.reject(io, e)),
        };
        self.load_type = load_type;
        let wait = self.packets.send_verify_ram(io, &mut self.rng, &self.stage);
        let next = self.await_ack(io, wait);
        self.transition(next);
        Ok(())
    }

    /// Drop the session. A request still waiting for its outcome is told so.
    pub fn abort<P: Platform>(&mut self, io: &mut P) {
        if self.state.has_request_in_flight() {
            io.respond(Err(LoadError::Aborted));
        }
        self.reset(io);
    }

    // --- Event entry points ---

    /// The armed timer expired.
    pub fn on_timer<P: Platform>(&mut self, io: &mut P) {
        let next = match self.state {
            LoadState::Idle | LoadState::Data => return,
            LoadState::Reset1 => self.reset1_elapsed(io),
            LoadState::Reset2 => self.reset2_elapsed(io),
            LoadState::TxHandshake => self.tx_handshake_elapsed(io),
            LoadState::RxHandshake => self.fail(io, LoadError::HandshakeTimeout),
            LoadState::VerifyChecksum => self.checksum_poll_elapsed(io),
            LoadState::StartAck => self.fail(io, LoadError::StartupTimeout),
            LoadState::DataAck => self.fail(io, LoadError::DataTimeout),
            LoadState::VerifyRamAck => self.fail(io, LoadError::VerifyRamTimeout),
            LoadState::ProgramVerifyEepromAck => self.fail(io, LoadError::EepromTimeout),
            LoadState::ReadyToLaunchAck => self.fail(io, LoadError::LaunchTimeout),
        };
        self.transition(next);
    }

    /// Bytes arrived from the target.
    pub fn on_receive<P: Platform>(&mut self, io: &mut P, bytes: &[u8]) {
        let mut rest = bytes;
        while !rest.is_empty() {
            let (next, consumed) = match self.state {
                LoadState::RxHandshake => self.receive_handshake(io, rest),
                LoadState::VerifyChecksum => self.receive_checksum(io, rest),
                state if state.awaits_ack() => self.receive_ack(io, rest),
                // Noise during reset or between packets.
                _ => return,
            };
            self.transition(next);
            if consumed == 0 {
                return;
            }
            rest = &rest[consumed..];
        }
    }

    // --- Transitions ---

    fn start_loading<P: Platform>(&mut self, io: &mut P) {
        let pin = self.options.reset_pin;
        io.set_baud_rate(self.options.initial_baud);
        io.install_receive_hook();
        io.configure_as_output(pin);
        io.set_level(pin, PinLevel::High);
        self.version = None;
        self.retries_remaining = 0;
        self.rx.close();
        self.arm(io, RESET_DELAY_1_MS);
        self.transition(LoadState::Reset1);
    }

    fn reset1_elapsed<P: Platform>(&mut self, io: &mut P) -> LoadState {
        io.set_level(self.options.reset_pin, PinLevel::Low);
        self.arm(io, RESET_DELAY_2_MS);
        LoadState::Reset2
    }

    fn reset2_elapsed<P: Platform>(&mut self, io: &mut P) -> LoadState {
        io.set_level(self.options.reset_pin, PinLevel::High);
        self.arm(io, RESET_DELAY_3_MS);
        LoadState::TxHandshake
    }

    fn tx_handshake_elapsed<P: Platform>(&mut self, io: &mut P) -> LoadState {
        handshake::initiate_handshake(io);
        self.rx.open(HANDSHAKE_RESPONSE_LEN);
        self.arm(io, RX_HANDSHAKE_TIMEOUT_MS);
        LoadState::RxHandshake
    }

    fn receive_handshake<P: Platform>(&mut self, io: &mut P, bytes: &[u8]) -> (LoadState, usize) {
        let taken = self.rx.fill(bytes);
        if !self.rx.is_complete() {
            return (LoadState::RxHandshake, taken);
        }
        // The ROM only speaks again when polled, so the rest of this
        // delivery is line noise.
        let next = match handshake::verify_handshake_response(self.rx.bytes()) {
            Ok(version) => {
                self.version = Some(version);
                self.send_image(io)
            }
            Err(e) => self.fail(io, e),
        };
        (next, bytes.len())
    }

    fn send_image<P: Platform>(&mut self, io: &mut P) -> LoadState {
        io.disarm();
        self.rx.close();
        let encoded = handshake::transmit_command(io, self.load_type, &self.image);
        self.retries_remaining = handshake::retry_budget(encoded, self.options.initial_baud);
        self.retry_delay_ms = CALIBRATE_DELAY_MS;
        self.arm(io, self.retry_delay_ms);
        LoadState::VerifyChecksum
    }

    fn checksum_poll_elapsed<P: Platform>(&mut self, io: &mut P) -> LoadState {
        if self.retries_remaining == 0 {
            return self.fail(io, LoadError::ChecksumTimeout);
        }
        io.transmit(&[CHECKSUM_POLL]);
        self.retries_remaining -= 1;
        self.arm(io, self.retry_delay_ms);
        LoadState::VerifyChecksum
    }

    fn receive_checksum<P: Platform>(&mut self, io: &mut P, bytes: &[u8]) -> (LoadState, usize) {
        let received = bytes[0];
        if received != CHECKSUM_OK {
            return (self.fail(io, LoadError::ChecksumError { received }), 1);
        }
        if self.state_after_bootstrap == LoadState::Idle {
            return (self.finish(io), 1);
        }
        self.rx.open(ACK_LEN);
        self.arm(io, STARTUP_TIMEOUT_MS);
        (self.state_after_bootstrap, 1)
    }

    fn receive_ack<P: Platform>(&mut self, io: &mut P, bytes: &[u8]) -> (LoadState, usize) {
        let state = self.state;
        let taken = self.rx.fill(bytes);
        if !self.rx.is_complete() {
            return (state, taken);
        }
        io.disarm();
        if let Err(e) = self.packets.check_ack(self.rx.bytes(), state) {
            return (self.fail(io, e), taken);
        }
        self.packets.accept();
        self.rx.close();

        let next = match state {
            LoadState::StartAck => {
                io.set_baud_rate(self.options.second_stage_baud);
                io.respond(Ok(()));
                LoadState::Data
            }
            LoadState::DataAck => {
                io.respond(Ok(()));
                LoadState::Data
            }
            LoadState::VerifyRamAck if self.load_type.includes_program() => {
                let wait = self
                    .packets
                    .send_program_verify_eeprom(io, &mut self.rng, &self.stage);
                self.await_ack(io, wait)
            }
            LoadState::VerifyRamAck | LoadState::ProgramVerifyEepromAck => {
                let wait = self
                    .packets
                    .send_ready_to_launch(io, &mut self.rng, &self.stage);
                self.await_ack(io, wait)
            }
            LoadState::ReadyToLaunchAck => {
                self.packets.send_launch_now(io, &mut self.rng, &self.stage);
                self.finish(io)
            }
            other => other,
        };
        (next, taken)
    }

    // --- Helpers ---

    fn await_ack<P: Platform>(&mut self, io: &mut P, wait: AckWait) -> LoadState {
        self.rx.open(ACK_LEN);
        self.arm(io, wait.timeout_ms);
        wait.state
    }

    fn arm<P: Platform>(&mut self, io: &mut P, ms: u32) {
        io.disarm();
        io.arm(ms);
    }

    fn transition(&mut self, next: LoadState) {
        if next != self.state {
            log_debug!("load state {} -> {}", self.state, next);
        }
        self.state = next;
    }

    /// Successful end of the session.
    fn finish<P: Platform>(&mut self, io: &mut P) -> LoadState {
        io.disarm();
        io.set_baud_rate(self.options.final_baud);
        io.clear_receive_hook();
        self.rx.close();
        io.respond(Ok(()));
        LoadState::Idle
    }

    /// Protocol failure: report it and drop the session.
    fn fail<P: Platform>(&mut self, io: &mut P, err: LoadError) -> LoadState {
        log_warn!("load failed in {}: {}", self.state, err);
        io.respond(Err(err));
        self.reset(io);
        LoadState::Idle
    }

    /// Caller sequencing error: drop the session and hand the error back.
    fn reject<P: Platform>(&mut self, io: &mut P, err: LoadError) -> LoadError {
        self.abort(io);
        err
    }

    fn reset<P: Platform>(&mut self, io: &mut P) {
        io.disarm();
        io.clear_receive_hook();
        self.rx.close();
        self.retries_remaining = 0;
        self.state = LoadState::Idle;
    }
}
