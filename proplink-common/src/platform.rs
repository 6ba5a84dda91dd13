// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Collaborator interfaces the load engine drives.
//!
//! The engine never blocks. It issues effects through these traits and is
//! resumed by the platform calling [`Loader::on_receive`] and
//! [`Loader::on_timer`] from a single execution context.
//!
//! [`Loader::on_receive`]: crate::loader::Loader::on_receive
//! [`Loader::on_timer`]: crate::loader::Loader::on_timer

use crate::error::LoadError;

/// Serial link to the target.
pub trait Transport {
    fn transmit(&mut self, bytes: &[u8]);
    fn set_baud_rate(&mut self, baud: u32);
    /// Route received bytes to the loader until the hook is cleared.
    fn install_receive_hook(&mut self);
    fn clear_receive_hook(&mut self);
}

/// One-shot timer. Expiry is delivered through `Loader::on_timer`.
pub trait Timer {
    fn arm(&mut self, ms: u32);
    fn disarm(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinLevel {
    Low,
    High,
}

/// GPIO driving the target's active-low reset input.
pub trait ResetLine {
    fn configure_as_output(&mut self, pin: u8);
    fn set_level(&mut self, pin: u8, level: PinLevel);
}

/// Channel back to whoever issued the current request.
pub trait Responder {
    fn respond(&mut self, result: Result<(), LoadError>);
}

/// Everything the loader needs from its host.
pub trait Platform: Transport + Timer + ResetLine + Responder {}

impl<T: Transport + Timer + ResetLine + Responder> Platform for T {}
