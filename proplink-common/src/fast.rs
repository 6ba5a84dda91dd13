// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Packet protocol spoken by the second-stage loader.
//!
//! Every packet is an 8-byte header (packet id, then a random tag, both
//! little-endian) followed by its payload. The loader answers with an 8-byte
//! acknowledgement echoing the tag and carrying the id it expects next.
//! Application data packets count down to id 0; the command packets that
//! follow use ids derived from the running checksum.

use rand_core::RngCore;

use crate::error::LoadError;
use crate::image::{call_frame_checksum, get_long};
use crate::platform::Transport;
use crate::state::LoadState;

/// Ack timeout for data, verify-RAM and ready-to-launch packets.
pub const PACKET_TIMEOUT_MS: u32 = 2000;
/// Ack timeout for the second-stage loader's startup acknowledgement.
pub const STARTUP_TIMEOUT_MS: u32 = 2000;
/// Ack timeout for EEPROM programming and verification.
pub const FLASH_TIMEOUT_MS: u32 = 8000;

pub const HEADER_LEN: usize = 8;
pub const ACK_LEN: usize = 8;

/// Second-stage loader binaries: the template downloaded through the boot ROM
/// and the command payloads it executes afterwards.
#[derive(Debug, Clone, Copy)]
pub struct SecondStage<'a> {
    pub loader: &'a [u8],
    pub verify_ram: &'a [u8],
    pub program_verify_eeprom: &'a [u8],
    pub ready_to_launch: &'a [u8],
    pub launch_now: &'a [u8],
}

/// What to wait for after a packet has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckWait {
    pub state: LoadState,
    pub timeout_ms: u32,
}

/// Packet numbering, tagging and checksum state.
#[derive(Debug, Clone, Default)]
pub struct PacketSequencer {
    packet_id: i32,
    expected_id: i32,
    packet_tag: i32,
    checksum: i32,
}

pub fn packet_header(id: i32, tag: i32) -> [u8; HEADER_LEN] {
    let mut hdr = [0u8; HEADER_LEN];
    hdr[..4].copy_from_slice(&id.to_le_bytes());
    hdr[4..].copy_from_slice(&tag.to_le_bytes());
    hdr
}

impl PacketSequencer {
    pub const fn new() -> Self {
        Self {
            packet_id: 0,
            expected_id: 0,
            packet_tag: 0,
            checksum: 0,
        }
    }

    /// Prepare for a second-stage loader expecting `packet_count` packets.
    /// Its startup ack carries that count as id and a zero tag.
    pub fn start(&mut self, packet_count: i32) {
        self.packet_id = 0;
        self.expected_id = packet_count;
        self.packet_tag = 0;
        self.checksum = call_frame_checksum();
    }

    pub fn packet_id(&self) -> i32 {
        self.packet_id
    }

    pub fn expected_id(&self) -> i32 {
        self.expected_id
    }

    pub fn packet_tag(&self) -> i32 {
        self.packet_tag
    }

    pub fn checksum(&self) -> i32 {
        self.checksum
    }

    /// Add every byte of an application payload to the running checksum.
    pub fn update_checksum(&mut self, payload: &[u8]) {
        for &b in payload {
            self.checksum = self.checksum.wrapping_add(b as i32);
        }
    }

    fn transmit(&mut self, io: &mut impl Transport, rng: &mut impl RngCore, payload: &[u8]) {
        self.packet_tag = rng.next_u32() as i32;
        io.transmit(&packet_header(self.packet_id, self.packet_tag));
        io.transmit(payload);
    }

    pub fn send_data(
        &mut self,
        io: &mut impl Transport,
        rng: &mut impl RngCore,
        payload: &[u8],
    ) -> AckWait {
        self.transmit(io, rng, payload);
        self.expected_id = self.packet_id.wrapping_sub(1);
        AckWait {
            state: LoadState::DataAck,
            timeout_ms: PACKET_TIMEOUT_MS,
        }
    }

    pub fn send_verify_ram(
        &mut self,
        io: &mut impl Transport,
        rng: &mut impl RngCore,
        stage: &SecondStage<'_>,
    ) -> AckWait {
        self.transmit(io, rng, stage.verify_ram);
        self.expected_id = self.checksum.wrapping_neg();
        AckWait {
            state: LoadState::VerifyRamAck,
            timeout_ms: PACKET_TIMEOUT_MS,
        }
    }

    pub fn send_program_verify_eeprom(
        &mut self,
        io: &mut impl Transport,
        rng: &mut impl RngCore,
        stage: &SecondStage<'_>,
    ) -> AckWait {
        self.transmit(io, rng, stage.program_verify_eeprom);
        self.expected_id = self.checksum.wrapping_neg().wrapping_mul(2);
        AckWait {
            state: LoadState::ProgramVerifyEepromAck,
            timeout_ms: FLASH_TIMEOUT_MS,
        }
    }

    pub fn send_ready_to_launch(
        &mut self,
        io: &mut impl Transport,
        rng: &mut impl RngCore,
        stage: &SecondStage<'_>,
    ) -> AckWait {
        self.transmit(io, rng, stage.ready_to_launch);
        self.expected_id = self.packet_id.wrapping_sub(1);
        AckWait {
            state: LoadState::ReadyToLaunchAck,
            timeout_ms: PACKET_TIMEOUT_MS,
        }
    }

    /// Fire and forget: the launched application does not answer.
    pub fn send_launch_now(
        &mut self,
        io: &mut impl Transport,
        rng: &mut impl RngCore,
        stage: &SecondStage<'_>,
    ) {
        self.transmit(io, rng, stage.launch_now);
    }

    /// Validate an ack received in `state`: tag first, then id.
    pub fn check_ack(&self, ack: &[u8], state: LoadState) -> Result<(), LoadError> {
        if ack.len() < ACK_LEN {
            return Err(LoadError::WrongId {
                expected: self.expected_id,
                received: 0,
                state,
            });
        }
        let id = get_long(ack, 0);
        let tag = get_long(ack, 4);
        if tag != self.packet_tag {
            return Err(LoadError::WrongTag {
                expected: self.packet_tag,
                received: tag,
                state,
            });
        }
        if id != self.expected_id {
            return Err(LoadError::WrongId {
                expected: self.expected_id,
                received: id,
                state,
            });
        }
        Ok(())
    }

    /// Record an accepted ack: the next packet goes out with the id it named.
    pub fn accept(&mut self) {
        self.packet_id = self.expected_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        assert_eq!(
            packet_header(3, -2),
            [0x03, 0x00, 0x00, 0x00, 0xFE, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_start_seeds_checksum_with_call_frame() {
        let mut seq = PacketSequencer::new();
        seq.start(4);
        assert_eq!(seq.checksum(), 0x7EC);
        assert_eq!(seq.expected_id(), 4);
        assert_eq!(seq.packet_tag(), 0);
    }

    #[test]
    fn test_check_ack_reports_tag_before_id() {
        let mut seq = PacketSequencer::new();
        seq.start(2);
        let ack = packet_header(9, 7);
        assert_eq!(
            seq.check_ack(&ack, LoadState::StartAck),
            Err(LoadError::WrongTag {
                expected: 0,
                received: 7,
                state: LoadState::StartAck,
            })
        );
    }
}
