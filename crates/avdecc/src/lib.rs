// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # avdecc - IEEE 1722.1 control plane for AVB endpoints
//!
//! Discovery and stream connection management for an audio entity on a
//! local Ethernet segment. The engine advertises the local entity, tracks
//! remote entities, and negotiates stream connections between talkers and
//! listeners.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------+
//! |  Host event loop (process_packet/periodic)
//! +-----------------------------------------+
//!           v                    ^ Event
//! +-----------------------------------------+
//! |  Engine (dispatch, Outbox, TimerService)|
//! +-----------------------------------------+
//!      v              v              v
//! +----------+  +------------+  +--------------+
//! |   SDP    |  | SCM-Talker |  | SCM-Listener |
//! | EntityDb |  |            |  | InflightTable|
//! +----------+  +------------+  +--------------+
//!           v                    ^
//! +-----------------------------------------+
//! |  Frame codec (Ethernet + 1722.1 PDUs)   |
//! +-----------------------------------------+
//!           v                    ^
//! +-----------------------------------------+
//! |  MacChannel (host supplied)             |
//! +-----------------------------------------+
//! ```
//!
//! ## Scheduling
//!
//! Single-threaded and cooperative. The host owns the [`Engine`] and calls
//! [`Engine::process_packet`] for every received frame and
//! [`Engine::periodic`] on a short interval, draining it until it returns
//! `None`. Nothing inside the engine blocks.
//!
//! ## Example
//!
//! ```
//! use avdecc::{CaptureChannel, Engine, EngineConfig, MacAddr, ManualClock, NullDataPlane};
//!
//! let clock = ManualClock::new();
//! let mac = MacAddr::new([0x02, 0, 0, 0, 0, 0x01]);
//! let mut engine = Engine::new(EngineConfig::default(), mac, 0x42, clock.clone(), NullDataPlane)
//!     .unwrap();
//! let mut wire = CaptureChannel::new();
//!
//! engine.sdp_announce();
//! while engine.periodic(&mut wire).is_some() {}
//! assert_eq!(wire.frames().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Ethernet and 1722.1 PDU encode/decode
pub mod codec;

/// Construction-time configuration
pub mod config;

/// Engine: dispatch and the public API
pub mod engine;

/// Bounded table of remote entities
pub mod entity_db;

/// Error types
pub mod error;

/// Upward status events
pub mod event;

/// Outstanding listener-issued commands
pub mod inflight;

/// SCM listener state machine
pub mod listener;

/// SDP advertise/discovery state machines
pub mod sdp;

/// SCM talker state machine
pub mod talker;

/// Clock and countdown timers
pub mod timer;

/// MAC channel and data plane collaborators
pub mod transport;

/// Identifiers, addresses and protocol enumerations
pub mod types;

pub use crate::codec::{Frame, Pdu, ScmPdu, SdpPdu};
pub use crate::config::{ConfigError, EngineConfig};
pub use crate::engine::{Dispatch, Engine};
pub use crate::error::{Error, Result};
pub use crate::event::Event;
pub use crate::listener::{ListenerState, ListenerStream};
pub use crate::sdp::{AdvertiseState, DiscoveryState};
pub use crate::talker::{ListenerPair, TalkerState, TalkerStream};
pub use crate::timer::{Clock, ManualClock, SystemClock, TimerId, TimerService};
pub use crate::transport::{
    CaptureChannel, MacChannel, NullChannel, NullDataPlane, SinkTable, StreamDataPlane,
};
pub use crate::types::{Guid, MacAddr, ScmMessageType, SdpMessageType, StatusCode, Subtype};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
