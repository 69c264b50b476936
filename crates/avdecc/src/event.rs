// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Upward status events
//!
//! At most one event leaves [`crate::Engine::periodic`] per call. Data-plane
//! requests (`Connect*`/`Disconnect*`) must eventually be answered with the
//! matching `*_connection_complete` call.

use serde::Serialize;

use crate::types::{Guid, MacAddr, ScmMessageType};

/// High-level status surfaced to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A new remote entity appeared
    EntityAdded {
        /// Remote entity
        guid: Guid,
    },
    /// A remote entity departed or timed out
    EntityRemoved {
        /// Remote entity
        guid: Guid,
    },
    /// Start sending talker stream `talker_unique_id`
    ConnectTalker {
        /// Local stream source
        talker_unique_id: u16,
        /// Listener being added
        listener_guid: Guid,
        /// Listener sink index
        listener_unique_id: u16,
        /// Stream id
        stream_id: u64,
        /// Stream destination
        dest_mac: MacAddr,
    },
    /// Stop sending to a listener
    DisconnectTalker {
        /// Local stream source
        talker_unique_id: u16,
        /// Listener being removed
        listener_guid: Guid,
        /// Listener sink index
        listener_unique_id: u16,
    },
    /// Start receiving on sink `listener_unique_id`
    ConnectListener {
        /// Local stream sink
        listener_unique_id: u16,
        /// Remote talker
        talker_guid: Guid,
        /// Talker source index
        talker_unique_id: u16,
        /// Stream id
        stream_id: u64,
        /// Stream destination
        dest_mac: MacAddr,
    },
    /// Stop receiving on sink `listener_unique_id`
    DisconnectListener {
        /// Local stream sink
        listener_unique_id: u16,
        /// Remote talker
        talker_guid: Guid,
        /// Talker source index
        talker_unique_id: u16,
    },
    /// A TX command went unanswered after one retry
    ListenerTimeout {
        /// Sequence id of the command
        sequence_id: u16,
        /// Local stream sink
        listener_unique_id: u16,
        /// CONNECT_TX_COMMAND or DISCONNECT_TX_COMMAND
        command: ScmMessageType,
    },
}
