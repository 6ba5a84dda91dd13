// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Request/response protocol between the host tool and the bridge.
//!
//! Messages are postcard-serialized and COBS-framed on the USB CDC link.
//! Payload-carrying variants use `heapless` buffers on the bridge and `alloc`
//! buffers on the host; both serialize identically.

#[cfg(feature = "std")]
extern crate alloc;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, STATUS_OK};
use crate::image::{IMAGE_CAPACITY, MAX_PACKET_SIZE};
use crate::options::LoadArgs;
use crate::state::LoadState;

/// Largest application chunk carried by one [`Request::Data`].
pub const MAX_DATA_BLOCK_SIZE: usize = MAX_PACKET_SIZE;
/// Largest image carried by [`Request::RomLoad`].
pub const MAX_ROM_IMAGE_SIZE: usize = IMAGE_CAPACITY;
pub const MAX_COMMAND_LEN: usize = 16;
pub const MAX_MESSAGE_LEN: usize = 96;

#[derive(Serialize, Deserialize, Debug)]
#[allow(clippy::large_enum_variant)] // no_std, no allocator for Box
pub enum Request {
    GetStatus,
    /// Start loading an application of `image_size` bytes.
    Begin { image_size: u32, args: LoadArgs },
    #[cfg(not(feature = "std"))]
    Data {
        data: heapless::Vec<u8, MAX_DATA_BLOCK_SIZE>,
    },
    #[cfg(feature = "std")]
    Data { data: alloc::vec::Vec<u8> },
    #[cfg(not(feature = "std"))]
    End {
        command: heapless::String<MAX_COMMAND_LEN>,
    },
    #[cfg(feature = "std")]
    End { command: alloc::string::String },
    #[cfg(not(feature = "std"))]
    RomLoad {
        args: LoadArgs,
        image: heapless::Vec<u8, MAX_ROM_IMAGE_SIZE>,
    },
    #[cfg(feature = "std")]
    RomLoad {
        args: LoadArgs,
        image: alloc::vec::Vec<u8>,
    },
    Abort,
}

#[derive(Serialize, Deserialize, Debug)]
pub enum Response {
    /// Outcome of a session request: 200 on success, 400 with a message
    /// otherwise.
    #[cfg(not(feature = "std"))]
    Outcome {
        status: u16,
        message: heapless::String<MAX_MESSAGE_LEN>,
    },
    #[cfg(feature = "std")]
    Outcome {
        status: u16,
        message: alloc::string::String,
    },
    Status {
        state: LoadState,
        target_version: Option<u8>,
        packet_id: i32,
    },
}

impl Response {
    #[cfg(not(feature = "std"))]
    pub fn outcome(result: Result<(), LoadError>) -> Self {
        use core::fmt::Write;

        let mut message = heapless::String::new();
        let status = match result {
            Ok(()) => STATUS_OK,
            Err(e) => {
                // Overlong messages are cut short.
                let _ = write!(message, "{e}");
                e.status()
            }
        };
        Response::Outcome { status, message }
    }

    #[cfg(feature = "std")]
    pub fn outcome(result: Result<(), LoadError>) -> Self {
        use alloc::string::{String, ToString};

        match result {
            Ok(()) => Response::Outcome {
                status: STATUS_OK,
                message: String::new(),
            },
            Err(e) => Response::Outcome {
                status: e.status(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            Response::Outcome { status, .. } => *status == STATUS_OK,
            Response::Status { .. } => true,
        }
    }
}
