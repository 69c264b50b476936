// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the 1722.1 engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for codec and host-surface operations.
///
/// Protocol failures are never reported through this type. They travel on
/// the wire as SCM status codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Output buffer too small for the encoded frame
    #[error("Buffer too small")]
    BufferTooSmall,

    /// Input ended before a complete header or body
    #[error("Truncated frame: need {needed} bytes, got {got}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes available
        got: usize,
    },

    /// EtherType is not 1722 (0x22F0)
    #[error("Not a 1722 frame (EtherType 0x{0:04x})")]
    WrongEtherType(u16),

    /// `cd` flag clear: stream data, not control
    #[error("Not a control-data PDU")]
    NotControlData,

    /// Subtype outside SDP/SEC/SCM
    #[error("Unknown 1722.1 subtype 0x{0:02x}")]
    UnknownSubtype(u8),

    /// Message type not defined for the subtype
    #[error("Unknown message type {value} for subtype 0x{subtype:02x}")]
    UnknownMessageType {
        /// Subtype of the PDU
        subtype: u8,
        /// Raw 4-bit message type
        value: u8,
    },

    /// Invalid argument to an API call
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// MAC channel failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
