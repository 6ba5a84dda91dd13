// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Propeller serial loader engine shared by proplink-bridge and proplink-upload.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools
//! - `embedded` feature: Enables embedded-hal board helpers
//! - `defmt` feature: Traces state transitions and failures over defmt

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate alloc;

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);
    }};
}

pub mod encoder;
pub mod error;
pub mod fast;
pub mod handshake;
pub mod image;
pub mod loader;
pub mod options;
pub mod platform;
pub mod protocol;
pub mod state;
pub mod uart;
pub mod window;

// Re-export commonly used types
pub use error::{LoadError, STATUS_BAD_REQUEST, STATUS_OK};
pub use fast::SecondStage;
pub use image::{ImageError, MAX_PACKET_SIZE, MAX_TARGET_IMAGE_SIZE};
pub use loader::Loader;
pub use options::{LoadArgs, LoadOptions};
pub use platform::{PinLevel, Platform, ResetLine, Responder, Timer, Transport};
pub use protocol::{Request, Response, MAX_DATA_BLOCK_SIZE};
pub use state::{LoadState, LoadType};

#[cfg(feature = "embedded")]
use embedded_hal::delay::DelayNs;
#[cfg(feature = "embedded")]
use embedded_hal::digital::OutputPin;

/// Blink an LED a specified number of times.
#[cfg(feature = "embedded")]
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}
