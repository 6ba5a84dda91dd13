// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Receive window for the datum the loader is currently waiting on.

use crate::handshake::HANDSHAKE_RESPONSE_LEN;

/// Largest datum ever awaited: the handshake response.
pub const WINDOW_CAPACITY: usize = HANDSHAKE_RESPONSE_LEN;

/// Fixed buffer reused across phases. `received + remaining` always equals
/// the length passed to [`RxWindow::open`].
#[derive(Debug, Clone)]
pub struct RxWindow {
    buf: [u8; WINDOW_CAPACITY],
    received: usize,
    remaining: usize,
}

impl Default for RxWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RxWindow {
    pub const fn new() -> Self {
        Self {
            buf: [0u8; WINDOW_CAPACITY],
            received: 0,
            remaining: 0,
        }
    }

    /// Start waiting for `len` bytes, clamped to the buffer capacity.
    pub fn open(&mut self, len: usize) {
        debug_assert!(len <= WINDOW_CAPACITY);
        self.received = 0;
        self.remaining = len.min(WINDOW_CAPACITY);
    }

    pub fn close(&mut self) {
        self.received = 0;
        self.remaining = 0;
    }

    /// Copy as many of `bytes` as the window still wants; returns how many
    /// were taken.
    pub fn fill(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.remaining);
        self.buf[self.received..self.received + count].copy_from_slice(&bytes[..count]);
        self.received += count;
        self.remaining -= count;
        count
    }

    /// True once the awaited datum has fully arrived.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0 && self.received > 0
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.received]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_stops_at_declared_length() {
        let mut window = RxWindow::new();
        window.open(8);
        assert_eq!(window.fill(&[1, 2, 3]), 3);
        assert!(!window.is_complete());
        assert_eq!(window.fill(&[4, 5, 6, 7, 8, 9, 10]), 5);
        assert!(window.is_complete());
        assert_eq!(window.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(window.fill(&[11]), 0);
    }

    #[test]
    fn test_received_plus_remaining_is_constant() {
        let mut window = RxWindow::new();
        window.open(WINDOW_CAPACITY);
        for chunk in [&[0u8; 7][..], &[0u8; 100][..], &[0u8; 50][..]] {
            window.fill(chunk);
            assert_eq!(window.received() + window.remaining(), WINDOW_CAPACITY);
        }
    }

    #[test]
    fn test_closed_window_takes_nothing() {
        let mut window = RxWindow::new();
        assert_eq!(window.fill(&[1, 2]), 0);
        assert!(!window.is_complete());
    }
}
