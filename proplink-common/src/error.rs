// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error taxonomy for load sessions.

use core::fmt;

use crate::image::ImageError;
use crate::state::LoadState;

/// Status code reported for a successful request.
pub const STATUS_OK: u16 = 200;
/// Status code reported for every failed request.
pub const STATUS_BAD_REQUEST: u16 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// A session is already active.
    Busy,
    /// Missing or malformed load parameter.
    InvalidArgs,
    /// The second-stage loader template could not be patched.
    LoaderImage(ImageError),
    HandshakeFailed,
    HandshakeTimeout,
    /// The boot ROM answered the checksum poll with something other than 0xFE.
    ChecksumError { received: u8 },
    ChecksumTimeout,
    StartupTimeout,
    DataTimeout,
    VerifyRamTimeout,
    EepromTimeout,
    LaunchTimeout,
    WrongTag {
        expected: i32,
        received: i32,
        state: LoadState,
    },
    WrongId {
        expected: i32,
        received: i32,
        state: LoadState,
    },
    /// Data or end request arrived out of sequence.
    NotReady,
    /// Empty data chunk.
    NoData,
    /// Data chunk larger than the second-stage packet buffer.
    ChunkTooLarge { len: usize },
    MoreDataExpected,
    UnknownCommand,
    /// The session was aborted while this request was in flight.
    Aborted,
}

impl LoadError {
    /// HTTP-style status code reported to the session owner.
    pub fn status(&self) -> u16 {
        STATUS_BAD_REQUEST
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Busy => f.write_str("Transfer already in progress"),
            LoadError::InvalidArgs => f.write_str("Invalid load parameters"),
            LoadError::LoaderImage(e) => write!(f, "Generate loader image failed: {e}"),
            LoadError::HandshakeFailed => f.write_str("RX handshake failed"),
            LoadError::HandshakeTimeout => f.write_str("RX handshake timeout"),
            LoadError::ChecksumError { received } => {
                write!(f, "Checksum error (got 0x{received:02x})")
            }
            LoadError::ChecksumTimeout => f.write_str("Checksum timeout"),
            LoadError::StartupTimeout => f.write_str("Second-stage loader startup timeout"),
            LoadError::DataTimeout => f.write_str("Second-stage loader data timeout"),
            LoadError::VerifyRamTimeout => f.write_str("Second-stage verify RAM timeout"),
            LoadError::EepromTimeout => {
                f.write_str("Second-stage program and verify EEPROM timeout")
            }
            LoadError::LaunchTimeout => f.write_str("Second-stage ready to launch timeout"),
            LoadError::WrongTag {
                expected,
                received,
                state,
            } => write!(
                f,
                "Wrong packet tag: expected {expected}, got {received}, state {state}"
            ),
            LoadError::WrongId {
                expected,
                received,
                state,
            } => write!(
                f,
                "Wrong packet id: expected {expected}, got {received}, state {state}"
            ),
            LoadError::NotReady => f.write_str("Not ready for a data transfer"),
            LoadError::NoData => f.write_str("No data to load"),
            LoadError::ChunkTooLarge { len } => write!(f, "Data chunk too large ({len} bytes)"),
            LoadError::MoreDataExpected => f.write_str("More data expected"),
            LoadError::UnknownCommand => f.write_str("Unknown command"),
            LoadError::Aborted => f.write_str("Load aborted"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LoadError {}

impl From<ImageError> for LoadError {
    fn from(e: ImageError) -> Self {
        LoadError::LoaderImage(e)
    }
}
