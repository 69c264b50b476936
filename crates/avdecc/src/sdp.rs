// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDP advertise and discovery state machines
//!
//! ## Advertise
//!
//! ```text
//! IDLE -announce-> ADVERTISE_1 -> ADVERTISE_2 -> WAITING -readvertise-> ADVERTISE_1
//! IDLE/WAITING -depart-> DEPARTING_1 -> DEPARTING_2 -> IDLE
//! ```
//!
//! Every announcement is a pair of identical ENTITY_AVAILABLE frames 3 cs
//! apart; departure is the same with ENTITY_DEPARTING.
//!
//! ## Discovery
//!
//! ```text
//! WAITING -discover-> DISCOVER -> WAITING
//! WAITING -AVAILABLE/DEPARTING rx-> ADDED/REMOVED -periodic-> WAITING
//! ```
//!
//! The discovery timer drives the 2-second tick used for entity deadlines.

use std::collections::VecDeque;

use crate::codec::{Pdu, SdpPdu};
use crate::config::EngineConfig;
use crate::entity_db::{AddOutcome, EntityDatabase};
use crate::event::Event;
use crate::timer::{Clock, TimerId, TimerService};
use crate::transport::{MacChannel, Outbox};
use crate::types::{Guid, SdpMessageType};

/// Advertise timer unit: 1 centisecond
pub const ADVERTISE_UNIT_MS: u64 = 10;

/// Gap between the two frames of a pair, in advertise units
pub const PAIR_GAP_TICKS: u32 = 3;

/// Length of one discovery tick (and one valid_time unit)
pub const TICK_MS: u64 = 2000;

/// Advertise machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseState {
    /// Not advertising
    Idle,
    /// Send first ENTITY_AVAILABLE
    Advertise1,
    /// Waiting to send the second ENTITY_AVAILABLE
    Advertise2,
    /// Waiting for the re-advertise timer
    Waiting,
    /// Send first ENTITY_DEPARTING
    Departing1,
    /// Waiting to send the second ENTITY_DEPARTING
    Departing2,
}

/// Discovery machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// Not initialised
    Idle,
    /// Counting ticks, sweeping the entity table
    Waiting,
    /// Send ENTITY_DISCOVER
    Discover,
    /// Surface `EntityAdded` on the next periodic call
    Added(Guid),
    /// Surface `EntityRemoved` on the next periodic call
    Removed(Guid),
}

/// Discovery protocol engine
#[derive(Debug, Clone)]
pub struct SdpEngine {
    guid: Guid,
    advertise: AdvertiseState,
    discovery: DiscoveryState,
    depart_pending: bool,
    tick: u32,
    discover_guid: Guid,
    valid_time: u8,
    announcement: SdpPdu,
    entities: EntityDatabase,
    backlog: VecDeque<Event>,
    backlog_cap: usize,
}

impl SdpEngine {
    /// Engine for local entity `guid`, advertising as described by `config`
    pub fn new(guid: Guid, config: &EngineConfig) -> Self {
        let announcement = SdpPdu {
            message_type: SdpMessageType::EntityAvailable,
            valid_time: config.adp_valid_time,
            entity_guid: guid,
            vendor_id: config.vendor_id,
            model_id: config.model_id,
            entity_capabilities: config.entity_capabilities,
            talker_stream_sources: config.max_talkers,
            talker_capabilities: config.advertised_talker_capabilities(),
            listener_stream_sinks: config.max_listeners,
            listener_capabilities: config.advertised_listener_capabilities(),
            controller_capabilities: config.controller_capabilities,
            boot_id: config.boot_id,
        };

        Self {
            guid,
            advertise: AdvertiseState::Idle,
            discovery: DiscoveryState::Idle,
            depart_pending: false,
            tick: 0,
            discover_guid: Guid::ZERO,
            valid_time: config.adp_valid_time,
            announcement,
            entities: EntityDatabase::new(config.max_entities),
            backlog: VecDeque::with_capacity(config.max_entities * 2),
            backlog_cap: config.max_entities * 2,
        }
    }

    /// Set up the SDP timers and start the discovery tick
    pub fn init<C: Clock>(&mut self, timers: &mut TimerService<C>) {
        timers.init(TimerId::SdpAdvertise, ADVERTISE_UNIT_MS);
        timers.init(TimerId::SdpReadvertise, TICK_MS);
        timers.init(TimerId::SdpDiscovery, TICK_MS);

        self.discovery = DiscoveryState::Waiting;
        timers.start(TimerId::SdpDiscovery, 1);
    }

    /// Start advertising (from IDLE only)
    pub fn announce(&mut self) {
        match self.advertise {
            AdvertiseState::Idle => {
                log::debug!("[sdp] announce {}", self.guid);
                self.advertise = AdvertiseState::Advertise1;
            }
            AdvertiseState::Advertise2 if self.depart_pending => {
                self.depart_pending = false;
            }
            state => log::debug!("[sdp] announce ignored in {:?}", state),
        }
    }

    /// Stop advertising and send the departing pair
    ///
    /// A depart during an announcement pair takes effect once the pair is
    /// complete.
    pub fn depart<C: Clock>(&mut self, timers: &mut TimerService<C>) {
        match self.advertise {
            AdvertiseState::Idle | AdvertiseState::Waiting | AdvertiseState::Advertise1 => {
                log::debug!("[sdp] depart {}", self.guid);
                timers.stop(TimerId::SdpReadvertise);
                self.advertise = AdvertiseState::Departing1;
            }
            AdvertiseState::Advertise2 => self.depart_pending = true,
            AdvertiseState::Departing1 | AdvertiseState::Departing2 => {}
        }
    }

    /// Request an ENTITY_DISCOVER for `guid` (zero = all). WAITING only.
    pub fn discover(&mut self, guid: Guid) -> bool {
        if self.discovery != DiscoveryState::Waiting {
            log::debug!("[sdp] discover ignored in {:?}", self.discovery);
            return false;
        }
        self.discover_guid = guid;
        self.discovery = DiscoveryState::Discover;
        true
    }

    /// Handle a received SDP PDU
    pub fn handle(&mut self, pdu: &SdpPdu) {
        match pdu.message_type {
            SdpMessageType::EntityDiscover => {
                if pdu.entity_guid != self.guid && !pdu.entity_guid.is_zero() {
                    return;
                }
                if self.advertise == AdvertiseState::Waiting {
                    log::debug!("[sdp] discover for {} answered", pdu.entity_guid);
                    self.advertise = AdvertiseState::Advertise1;
                }
            }
            SdpMessageType::EntityAvailable => {
                if pdu.entity_guid == self.guid {
                    return;
                }
                // every announcement is reported, refreshes included
                if self.entities.add(pdu.entity_guid, pdu.valid_time, self.tick) != AddOutcome::Dropped {
                    self.raise(Event::EntityAdded {
                        guid: pdu.entity_guid,
                    });
                }
            }
            SdpMessageType::EntityDeparting => {
                if pdu.entity_guid == self.guid {
                    return;
                }
                if !self.entities.remove(pdu.entity_guid) {
                    log::debug!("[sdp] {} departed without being known", pdu.entity_guid);
                }
                self.raise(Event::EntityRemoved {
                    guid: pdu.entity_guid,
                });
            }
        }
    }

    fn raise(&mut self, event: Event) {
        match (self.discovery, event) {
            (DiscoveryState::Waiting, Event::EntityAdded { guid }) => {
                self.discovery = DiscoveryState::Added(guid);
            }
            (DiscoveryState::Waiting, Event::EntityRemoved { guid }) => {
                self.discovery = DiscoveryState::Removed(guid);
            }
            _ => self.enqueue(event),
        }
    }

    fn enqueue(&mut self, event: Event) {
        if self.backlog.len() >= self.backlog_cap {
            log::warn!("[sdp] event backlog full, dropping {:?}", event);
            return;
        }
        self.backlog.push_back(event);
    }

    /// Advance the advertise machine
    pub fn advertise_periodic<C: Clock, M: MacChannel + ?Sized>(
        &mut self,
        timers: &mut TimerService<C>,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> Option<Event> {
        match self.advertise {
            AdvertiseState::Idle => {}
            AdvertiseState::Advertise1 => {
                outbox.send(mac, Pdu::Sdp(self.announcement));
                timers.start(TimerId::SdpAdvertise, PAIR_GAP_TICKS);
                self.advertise = AdvertiseState::Advertise2;
            }
            AdvertiseState::Advertise2 => {
                if timers.expired(TimerId::SdpAdvertise) {
                    outbox.send(mac, Pdu::Sdp(self.announcement));
                    if self.depart_pending {
                        self.depart_pending = false;
                        self.advertise = AdvertiseState::Departing1;
                    } else {
                        timers.start(TimerId::SdpReadvertise, u32::from(self.valid_time));
                        self.advertise = AdvertiseState::Waiting;
                    }
                }
            }
            AdvertiseState::Waiting => {
                if timers.expired(TimerId::SdpReadvertise) {
                    self.advertise = AdvertiseState::Advertise1;
                }
            }
            AdvertiseState::Departing1 => {
                outbox.send(mac, Pdu::Sdp(self.departing()));
                timers.start(TimerId::SdpAdvertise, PAIR_GAP_TICKS);
                self.advertise = AdvertiseState::Departing2;
            }
            AdvertiseState::Departing2 => {
                if timers.expired(TimerId::SdpAdvertise) {
                    outbox.send(mac, Pdu::Sdp(self.departing()));
                    self.advertise = AdvertiseState::Idle;
                }
            }
        }
        None
    }

    /// Advance the discovery machine
    pub fn discovery_periodic<C: Clock, M: MacChannel + ?Sized>(
        &mut self,
        timers: &mut TimerService<C>,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> Option<Event> {
        match self.discovery {
            DiscoveryState::Idle => None,
            DiscoveryState::Waiting => {
                if timers.expired(TimerId::SdpDiscovery) {
                    self.tick = self.tick.wrapping_add(1);
                    for guid in self.entities.sweep(self.tick) {
                        self.enqueue(Event::EntityRemoved { guid });
                    }
                    timers.start(TimerId::SdpDiscovery, 1);
                }
                self.backlog.pop_front()
            }
            DiscoveryState::Discover => {
                outbox.send(mac, Pdu::Sdp(SdpPdu::discover(self.discover_guid)));
                self.discovery = DiscoveryState::Waiting;
                None
            }
            DiscoveryState::Added(guid) => {
                self.discovery = DiscoveryState::Waiting;
                Some(Event::EntityAdded { guid })
            }
            DiscoveryState::Removed(guid) => {
                self.discovery = DiscoveryState::Waiting;
                Some(Event::EntityRemoved { guid })
            }
        }
    }

    fn departing(&self) -> SdpPdu {
        SdpPdu {
            message_type: SdpMessageType::EntityDeparting,
            valid_time: 0,
            ..self.announcement
        }
    }

    /// Advertise machine state
    pub fn advertise_state(&self) -> AdvertiseState {
        self.advertise
    }

    /// Discovery machine state
    pub fn discovery_state(&self) -> DiscoveryState {
        self.discovery
    }

    /// 2-second tick counter
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Target of the last discover request
    pub fn discover_guid(&self) -> Guid {
        self.discover_guid
    }

    /// Known remote entities
    pub fn entities(&self) -> &EntityDatabase {
        &self.entities
    }

    /// The ENTITY_AVAILABLE this entity sends
    pub fn announcement(&self) -> &SdpPdu {
        &self.announcement
    }
}
