// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Load session configuration.

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

pub const DEFAULT_INITIAL_BAUD: u32 = 115_200;
pub const DEFAULT_SECOND_STAGE_BAUD: u32 = 921_600;
pub const DEFAULT_RESET_PIN: u8 = 12;

/// Options as supplied by the caller; `None` falls back to the default.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadArgs {
    pub initial_baud: Option<u32>,
    /// Defaults to the initial baud rate.
    pub final_baud: Option<u32>,
    pub second_stage_baud: Option<u32>,
    pub reset_pin: Option<u8>,
}

/// Resolved session configuration, fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadOptions {
    pub initial_baud: u32,
    pub final_baud: u32,
    pub second_stage_baud: u32,
    pub reset_pin: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            initial_baud: DEFAULT_INITIAL_BAUD,
            final_baud: DEFAULT_INITIAL_BAUD,
            second_stage_baud: DEFAULT_SECOND_STAGE_BAUD,
            reset_pin: DEFAULT_RESET_PIN,
        }
    }
}

impl LoadArgs {
    pub fn resolve(&self) -> Result<LoadOptions, LoadError> {
        let initial_baud = self.initial_baud.unwrap_or(DEFAULT_INITIAL_BAUD);
        let options = LoadOptions {
            initial_baud,
            final_baud: self.final_baud.unwrap_or(initial_baud),
            second_stage_baud: self.second_stage_baud.unwrap_or(DEFAULT_SECOND_STAGE_BAUD),
            reset_pin: self.reset_pin.unwrap_or(DEFAULT_RESET_PIN),
        };
        if options.initial_baud == 0 || options.final_baud == 0 || options.second_stage_baud == 0
        {
            return Err(LoadError::InvalidArgs);
        }
        Ok(options)
    }
}
