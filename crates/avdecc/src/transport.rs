// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host-facing collaborators
//!
//! - [`MacChannel`]: byte-oriented frame transmit path
//! - [`StreamDataPlane`]: read-only view of the local stream sinks
//! - [`Outbox`]: the engine's single transmit scratch buffer

use crate::codec::{Frame, Pdu, FRAME_SIZE};
use crate::error::Result;
use crate::types::MacAddr;

/// Ethernet frame transmit path
///
/// Implementations should enqueue and return; the engine never waits on
/// the MAC. Errors are logged by the engine and otherwise ignored.
pub trait MacChannel {
    /// Hand one complete Ethernet frame to the MAC
    fn transmit(&mut self, frame: &[u8]) -> Result<()>;
}

/// Discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChannel;

impl MacChannel for NullChannel {
    fn transmit(&mut self, _frame: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Records every transmitted frame
#[derive(Debug, Clone, Default)]
pub struct CaptureChannel {
    frames: Vec<Vec<u8>>,
}

impl CaptureChannel {
    /// Empty capture
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw frames in transmit order
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Decoded frames in transmit order (undecodable frames skipped)
    pub fn decoded(&self) -> Vec<Frame> {
        self.frames
            .iter()
            .filter_map(|f| Frame::decode(f).ok())
            .collect()
    }

    /// Remove and return everything captured so far
    pub fn take(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.frames)
    }

    /// Forget captured frames
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl MacChannel for CaptureChannel {
    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

/// Local stream data plane, as seen by the listener engine
///
/// The engine never tracks whether a sink is running; it asks.
pub trait StreamDataPlane {
    /// True when the sink `listener_unique_id` is enabled (streaming)
    fn sink_enabled(&self, listener_unique_id: u16) -> bool;
}

/// Data plane with every sink disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDataPlane;

impl StreamDataPlane for NullDataPlane {
    fn sink_enabled(&self, _listener_unique_id: u16) -> bool {
        false
    }
}

/// Settable per-sink enable flags
#[derive(Debug, Clone, Default)]
pub struct SinkTable {
    enabled: Vec<bool>,
}

impl SinkTable {
    /// `sinks` sinks, all disabled
    pub fn new(sinks: usize) -> Self {
        Self {
            enabled: vec![false; sinks],
        }
    }

    /// Set one sink's state; out-of-range ids are ignored
    pub fn set_enabled(&mut self, listener_unique_id: u16, enabled: bool) {
        if let Some(flag) = self.enabled.get_mut(usize::from(listener_unique_id)) {
            *flag = enabled;
        }
    }
}

impl StreamDataPlane for SinkTable {
    fn sink_enabled(&self, listener_unique_id: u16) -> bool {
        self.enabled
            .get(usize::from(listener_unique_id))
            .copied()
            .unwrap_or(false)
    }
}

/// Single-owner transmit scratch buffer
///
/// Each send fills the buffer, hands it to the channel and returns; the
/// buffer is free again before the next handler runs.
#[derive(Debug, Clone)]
pub struct Outbox {
    buf: [u8; FRAME_SIZE],
    src: MacAddr,
    sent: u64,
}

impl Outbox {
    /// Outbox stamping frames with source address `src`
    pub const fn new(src: MacAddr) -> Self {
        Self {
            buf: [0u8; FRAME_SIZE],
            src,
            sent: 0,
        }
    }

    /// Encode `pdu` as a multicast frame and transmit it
    ///
    /// Returns false if encoding or transmit failed (already logged).
    pub fn send<M: MacChannel + ?Sized>(&mut self, mac: &mut M, pdu: Pdu) -> bool {
        let frame = Frame::multicast(self.src, pdu);
        let len = match frame.encode(&mut self.buf) {
            Ok(len) => len,
            Err(e) => {
                log::warn!("[outbox] encode failed: {}", e);
                return false;
            }
        };
        match mac.transmit(&self.buf[..len]) {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(e) => {
                log::warn!("[outbox] transmit failed: {}", e);
                false
            }
        }
    }

    /// Frames successfully handed to the MAC
    pub const fn sent(&self) -> u64 {
        self.sent
    }
}
