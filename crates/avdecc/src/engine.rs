// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine: packet dispatch and the periodic entry point
//!
//! The host owns one [`Engine`] and drives it from a single loop:
//!
//! ```text
//! loop {
//!     if let Some(frame) = recv() { engine.process_packet(&frame); }
//!     while let Some(event) = engine.periodic(&mut mac) { handle(event); }
//! }
//! ```
//!
//! Nothing inside the engine blocks or locks.

use crate::codec::{Frame, Pdu};
use crate::config::{ConfigError, EngineConfig};
use crate::entity_db::EntityDatabase;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::listener::{ListenerEngine, ListenerState, ListenerStream};
use crate::sdp::{AdvertiseState, DiscoveryState, SdpEngine};
use crate::talker::{TalkerEngine, TalkerState, TalkerStream};
use crate::timer::{Clock, TimerService};
use crate::transport::{MacChannel, Outbox, StreamDataPlane};
use crate::types::{Guid, MacAddr, StatusCode};

/// What [`Engine::process_packet`] did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not an AVDECC control frame, or malformed
    NotOurs,
    /// Decoded but not acted on (not addressed to us, machine busy, SEC)
    Ignored,
    /// Handed to a state machine
    Accepted,
}

/// AVDECC control-plane engine for one endpoint
pub struct Engine<C: Clock, D: StreamDataPlane> {
    config: EngineConfig,
    guid: Guid,
    mac: MacAddr,
    timers: TimerService<C>,
    outbox: Outbox,
    sdp: SdpEngine,
    talker: TalkerEngine,
    listener: ListenerEngine,
    data_plane: D,
}

impl<C: Clock, D: StreamDataPlane> Engine<C, D> {
    /// Build an engine for the endpoint at `mac`
    ///
    /// The entity GUID is derived from `mac` and `serial`. Discovery starts
    /// immediately; advertising waits for [`Engine::sdp_announce`].
    pub fn new(
        config: EngineConfig,
        mac: MacAddr,
        serial: u16,
        clock: C,
        data_plane: D,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let guid = Guid::from_mac(mac, serial);
        let mut timers = TimerService::new(clock);
        let mut sdp = SdpEngine::new(guid, &config);
        sdp.init(&mut timers);

        log::info!(
            "[engine] {} on {} ({} talkers, {} listeners)",
            guid,
            mac,
            config.max_talkers,
            config.max_listeners
        );

        Ok(Self {
            talker: TalkerEngine::new(guid, mac, &config),
            listener: ListenerEngine::new(guid, &config),
            outbox: Outbox::new(mac),
            config,
            guid,
            mac,
            timers,
            sdp,
            data_plane,
        })
    }

    /// Handle one received Ethernet frame
    ///
    /// Never transmits and never surfaces an event; the effects show up on
    /// the following [`Engine::periodic`] calls.
    pub fn process_packet(&mut self, frame: &[u8]) -> Dispatch {
        let frame = match Frame::decode(frame) {
            Ok(frame) => frame,
            Err(Error::WrongEtherType(_)) => return Dispatch::NotOurs,
            Err(e) => {
                log::debug!("[dispatch] dropped frame: {}", e);
                return Dispatch::NotOurs;
            }
        };

        match frame.pdu {
            Pdu::Sdp(pdu) => {
                self.sdp.handle(&pdu);
                Dispatch::Accepted
            }
            Pdu::Scm(pdu) => {
                let accepted = if pdu.message_type.is_talker_bound() {
                    self.talker.handle(&pdu)
                } else if pdu.message_type.is_listener_bound() {
                    self.listener.handle(&pdu)
                } else {
                    false
                };
                if accepted {
                    Dispatch::Accepted
                } else {
                    Dispatch::Ignored
                }
            }
            Pdu::Sec(pdu) => {
                log::debug!("[dispatch] SEC message {} ignored", pdu.message_type);
                Dispatch::Ignored
            }
        }
    }

    /// Advance every state machine; returns at most one event
    ///
    /// Call repeatedly until it returns `None` to drain queued events.
    pub fn periodic<M: MacChannel + ?Sized>(&mut self, mac: &mut M) -> Option<Event> {
        if let Some(event) = self
            .sdp
            .advertise_periodic(&mut self.timers, &mut self.outbox, mac)
        {
            return Some(event);
        }
        if let Some(event) = self
            .sdp
            .discovery_periodic(&mut self.timers, &mut self.outbox, mac)
        {
            return Some(event);
        }
        let now = self.timers.now_ms();
        if let Some(event) = self
            .listener
            .periodic(now, &self.data_plane, &mut self.outbox, mac)
        {
            return Some(event);
        }
        self.talker.periodic(&mut self.outbox, mac)
    }

    /// Start advertising this entity
    pub fn sdp_announce(&mut self) {
        self.sdp.announce();
    }

    /// Stop advertising and announce departure
    pub fn sdp_depart(&mut self) {
        self.sdp.depart(&mut self.timers);
    }

    /// Send ENTITY_DISCOVER for `guid`; false if a discover is pending
    pub fn sdp_discover(&mut self, guid: Guid) -> bool {
        self.sdp.discover(guid)
    }

    /// Send ENTITY_DISCOVER for every entity
    pub fn sdp_discover_all(&mut self) -> bool {
        self.sdp.discover(Guid::ZERO)
    }

    /// Answer an outstanding `ConnectTalker`/`DisconnectTalker` request
    pub fn scm_talker_connection_complete<M: MacChannel + ?Sized>(
        &mut self,
        status: StatusCode,
        mac: &mut M,
    ) -> bool {
        self.talker
            .connection_complete(status, &mut self.outbox, mac)
    }

    /// Answer an outstanding `ConnectListener`/`DisconnectListener` request
    pub fn scm_listener_connection_complete(&mut self, status: StatusCode) -> bool {
        self.listener.connection_complete(status)
    }

    /// Set the destination MAC of a talker stream
    pub fn talker_set_mac_address(&mut self, talker_unique_id: u16, mac: MacAddr) -> Result<()> {
        self.talker.set_mac_address(talker_unique_id, mac)
    }

    /// Local entity GUID
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Local MAC address
    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    /// Configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 2-second discovery tick counter
    pub fn tick(&self) -> u32 {
        self.sdp.tick()
    }

    /// Known remote entities
    pub fn entities(&self) -> &EntityDatabase {
        self.sdp.entities()
    }

    /// Talker stream `talker_unique_id`
    pub fn talker_stream(&self, talker_unique_id: u16) -> Option<&TalkerStream> {
        self.talker.stream(talker_unique_id)
    }

    /// Listener stream `listener_unique_id`
    pub fn listener_stream(&self, listener_unique_id: u16) -> Option<ListenerStream> {
        self.listener.stream(listener_unique_id, &self.data_plane)
    }

    /// Outstanding listener TX commands
    pub fn inflight_len(&self) -> usize {
        self.listener.inflight().len()
    }

    /// Frames handed to the MAC so far
    pub fn frames_sent(&self) -> u64 {
        self.outbox.sent()
    }

    /// SDP advertise state
    pub fn advertise_state(&self) -> AdvertiseState {
        self.sdp.advertise_state()
    }

    /// SDP discovery state
    pub fn discovery_state(&self) -> DiscoveryState {
        self.sdp.discovery_state()
    }

    /// SCM talker state
    pub fn talker_state(&self) -> TalkerState {
        self.talker.state()
    }

    /// SCM listener state
    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    /// Clock driving the timers
    pub fn clock(&self) -> &C {
        self.timers.clock()
    }

    /// Data plane
    pub fn data_plane(&self) -> &D {
        &self.data_plane
    }

    /// Data plane, mutably
    pub fn data_plane_mut(&mut self) -> &mut D {
        &mut self.data_plane
    }
}
