// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Load session states and requested load types.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Phase of the single load session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadState {
    Idle,
    Reset1,
    Reset2,
    TxHandshake,
    RxHandshake,
    VerifyChecksum,
    StartAck,
    Data,
    DataAck,
    VerifyRamAck,
    ProgramVerifyEepromAck,
    ReadyToLaunchAck,
}

impl LoadState {
    pub fn name(self) -> &'static str {
        match self {
            LoadState::Idle => "Idle",
            LoadState::Reset1 => "Reset1",
            LoadState::Reset2 => "Reset2",
            LoadState::TxHandshake => "TxHandshake",
            LoadState::RxHandshake => "RxHandshake",
            LoadState::VerifyChecksum => "VerifyChecksum",
            LoadState::StartAck => "StartAck",
            LoadState::Data => "Data",
            LoadState::DataAck => "DataAck",
            LoadState::VerifyRamAck => "VerifyRAMAck",
            LoadState::ProgramVerifyEepromAck => "ProgramVerifyEEPROMAck",
            LoadState::ReadyToLaunchAck => "ReadyToLaunchAck",
        }
    }

    /// States that wait for an 8-byte acknowledgement packet.
    pub fn awaits_ack(self) -> bool {
        matches!(
            self,
            LoadState::StartAck
                | LoadState::DataAck
                | LoadState::VerifyRamAck
                | LoadState::ProgramVerifyEepromAck
                | LoadState::ReadyToLaunchAck
        )
    }

    /// True while a caller request is waiting for its asynchronous outcome.
    pub fn has_request_in_flight(self) -> bool {
        !matches!(self, LoadState::Idle | LoadState::Data)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal action requested from the target. `Run` and `Program` are bits;
/// `ProgramAndRun` is both.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LoadType {
    Shutdown = 0,
    Run = 1 << 0,
    Program = 1 << 1,
    ProgramAndRun = (1 << 0) | (1 << 1),
}

impl LoadType {
    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn includes_program(self) -> bool {
        self.bits() & LoadType::Program.bits() != 0
    }

    /// Parse the command given when an upload ends.
    pub fn from_command(command: &str) -> Result<Self, LoadError> {
        match command {
            "run" => Ok(LoadType::Run),
            "program" => Ok(LoadType::Program),
            "program-and-run" => Ok(LoadType::ProgramAndRun),
            _ => Err(LoadError::UnknownCommand),
        }
    }
}
