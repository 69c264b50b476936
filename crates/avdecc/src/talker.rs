// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SCM talker state machine
//!
//! Answers TX commands addressed to the local GUID. CONNECT and DISCONNECT
//! are handed to the data plane as events and answered once the host calls
//! [`TalkerEngine::connection_complete`]; state queries are answered on the
//! next periodic call.

use crate::codec::{Pdu, ScmPdu};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::transport::{MacChannel, Outbox};
use crate::types::{Guid, MacAddr, ScmMessageType, StatusCode};

/// Talker machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkerState {
    /// Not initialised
    Idle,
    /// Ready for a command
    Waiting,
    /// CONNECT_TX_COMMAND received
    Connect,
    /// DISCONNECT_TX_COMMAND received
    Disconnect,
    /// GET_TX_STATE_COMMAND received
    GetState,
    /// GET_TX_CONNECTION_COMMAND received
    GetConnection,
    /// Data plane is starting the stream
    WaitingForConnect,
    /// Data plane is stopping the stream
    WaitingForDisconnect,
}

/// A listener attached to a talker stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerPair {
    /// Listener entity
    pub guid: Guid,
    /// Listener sink index
    pub unique_id: u16,
}

/// Per-source stream bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkerStream {
    /// Stream id (local MAC in the top 48 bits, source index below)
    pub stream_id: u64,
    /// Attached listeners
    pub connection_count: u16,
    /// Stream destination, zero until set by the host
    pub destination_mac: MacAddr,
    listeners: Vec<Option<ListenerPair>>,
}

impl TalkerStream {
    fn new(mac: MacAddr, talker_unique_id: u16, max_listeners: usize) -> Self {
        Self {
            stream_id: (mac.to_u64() << 16) | u64::from(talker_unique_id),
            connection_count: 0,
            destination_mac: MacAddr::ZERO,
            listeners: vec![None; max_listeners],
        }
    }

    /// Attached listeners in slot order
    pub fn listeners(&self) -> impl Iterator<Item = &ListenerPair> {
        self.listeners.iter().flatten()
    }

    /// The `index`th attached listener
    pub fn pair(&self, index: usize) -> Option<ListenerPair> {
        self.listeners().nth(index).copied()
    }

    /// True if `pair` is attached
    pub fn contains(&self, pair: ListenerPair) -> bool {
        self.listeners().any(|p| *p == pair)
    }

    fn is_full(&self) -> bool {
        self.listeners.iter().all(Option::is_some)
    }

    fn attach(&mut self, pair: ListenerPair) -> bool {
        if self.contains(pair) {
            return false;
        }
        match self.listeners.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(pair);
                self.connection_count = self.connection_count.saturating_add(1);
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, pair: ListenerPair) -> bool {
        match self.listeners.iter_mut().find(|s| **s == Some(pair)) {
            Some(slot) => {
                *slot = None;
                self.connection_count = self.connection_count.saturating_sub(1);
                true
            }
            None => false,
        }
    }
}

/// Talker side of connection management
#[derive(Debug, Clone)]
pub struct TalkerEngine {
    guid: Guid,
    state: TalkerState,
    rcvd: ScmPdu,
    streams: Vec<TalkerStream>,
}

impl TalkerEngine {
    /// One stream per configured source, state WAITING
    pub fn new(guid: Guid, mac: MacAddr, config: &EngineConfig) -> Self {
        let streams = (0..config.max_talkers)
            .map(|uid| TalkerStream::new(mac, uid, config.max_listeners_per_talker))
            .collect();

        Self {
            guid,
            state: TalkerState::Waiting,
            rcvd: ScmPdu::command(ScmMessageType::ConnectTxCommand),
            streams,
        }
    }

    /// Accept a TX command addressed to this talker
    ///
    /// Returns false if the frame is not for us or the machine is busy.
    pub fn handle(&mut self, pdu: &ScmPdu) -> bool {
        if pdu.talker_guid != self.guid {
            return false;
        }
        if self.state != TalkerState::Waiting {
            log::debug!(
                "[scm-talker] {:?} seq {} dropped in {:?}",
                pdu.message_type,
                pdu.sequence_id,
                self.state
            );
            return false;
        }

        let next = match pdu.message_type {
            ScmMessageType::ConnectTxCommand => TalkerState::Connect,
            ScmMessageType::DisconnectTxCommand => TalkerState::Disconnect,
            ScmMessageType::GetTxStateCommand => TalkerState::GetState,
            ScmMessageType::GetTxConnectionCommand => TalkerState::GetConnection,
            _ => return false,
        };

        log::debug!(
            "[scm-talker] {:?} seq {} from {}",
            pdu.message_type,
            pdu.sequence_id,
            pdu.controller_guid
        );
        self.rcvd = *pdu;
        self.state = next;
        true
    }

    /// Advance the machine; may surface a data-plane request
    pub fn periodic<M: MacChannel + ?Sized>(
        &mut self,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> Option<Event> {
        match self.state {
            TalkerState::Connect => self.on_connect(outbox, mac),
            TalkerState::Disconnect => self.on_disconnect(outbox, mac),
            TalkerState::GetState => {
                let rsp = if self.valid_talker_unique() {
                    self.response(ScmMessageType::GetTxStateResponse, StatusCode::Success)
                } else {
                    self.response(ScmMessageType::GetTxStateResponse, StatusCode::TalkerUnknownId)
                };
                outbox.send(mac, Pdu::Scm(rsp));
                self.state = TalkerState::Waiting;
                None
            }
            TalkerState::GetConnection => {
                let rsp = self.connection_response();
                outbox.send(mac, Pdu::Scm(rsp));
                self.state = TalkerState::Waiting;
                None
            }
            TalkerState::Idle
            | TalkerState::Waiting
            | TalkerState::WaitingForConnect
            | TalkerState::WaitingForDisconnect => None,
        }
    }

    fn on_connect<M: MacChannel + ?Sized>(&mut self, outbox: &mut Outbox, mac: &mut M) -> Option<Event> {
        let Some(stream) = self.stream(self.rcvd.talker_unique_id) else {
            log::debug!("[scm-talker] connect: unknown talker id {}", self.rcvd.talker_unique_id);
            let rsp = self.response(ScmMessageType::ConnectTxResponse, StatusCode::TalkerUnknownId);
            outbox.send(mac, Pdu::Scm(rsp));
            self.state = TalkerState::Waiting;
            return None;
        };

        let pair = self.rcvd_pair();
        if !stream.contains(pair) && stream.is_full() {
            log::debug!("[scm-talker] connect: stream {} has no free listener slot", self.rcvd.talker_unique_id);
            let rsp = self.response(ScmMessageType::ConnectTxResponse, StatusCode::TalkerExclusive);
            outbox.send(mac, Pdu::Scm(rsp));
            self.state = TalkerState::Waiting;
            return None;
        }

        let event = Event::ConnectTalker {
            talker_unique_id: self.rcvd.talker_unique_id,
            listener_guid: pair.guid,
            listener_unique_id: pair.unique_id,
            stream_id: stream.stream_id,
            dest_mac: stream.destination_mac,
        };
        self.state = TalkerState::WaitingForConnect;
        Some(event)
    }

    fn on_disconnect<M: MacChannel + ?Sized>(
        &mut self,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> Option<Event> {
        if !self.valid_talker_unique() {
            log::debug!("[scm-talker] disconnect: unknown talker id {}", self.rcvd.talker_unique_id);
            let rsp = self.response(ScmMessageType::DisconnectTxResponse, StatusCode::TalkerUnknownId);
            outbox.send(mac, Pdu::Scm(rsp));
            self.state = TalkerState::Waiting;
            return None;
        }

        let pair = self.rcvd_pair();
        self.state = TalkerState::WaitingForDisconnect;
        Some(Event::DisconnectTalker {
            talker_unique_id: self.rcvd.talker_unique_id,
            listener_guid: pair.guid,
            listener_unique_id: pair.unique_id,
        })
    }

    /// Data plane finished a connect or disconnect request
    ///
    /// Sends the TX response carrying `status` and returns to WAITING.
    /// Returns false when no request was outstanding.
    pub fn connection_complete<M: MacChannel + ?Sized>(
        &mut self,
        status: StatusCode,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> bool {
        let uid = usize::from(self.rcvd.talker_unique_id);
        let pair = self.rcvd_pair();

        let message_type = match self.state {
            TalkerState::WaitingForConnect => {
                if status.is_success() {
                    if let Some(stream) = self.streams.get_mut(uid) {
                        stream.attach(pair);
                    }
                }
                ScmMessageType::ConnectTxResponse
            }
            TalkerState::WaitingForDisconnect => {
                if status.is_success() {
                    if let Some(stream) = self.streams.get_mut(uid) {
                        stream.detach(pair);
                    }
                }
                ScmMessageType::DisconnectTxResponse
            }
            state => {
                log::warn!("[scm-talker] connection_complete in {:?} ignored", state);
                return false;
            }
        };

        log::debug!(
            "[scm-talker] {:?} seq {} status {:?}",
            message_type,
            self.rcvd.sequence_id,
            status
        );
        let rsp = self.response(message_type, status);
        outbox.send(mac, Pdu::Scm(rsp));
        self.state = TalkerState::Waiting;
        true
    }

    /// Set the destination MAC of talker stream `talker_unique_id`
    pub fn set_mac_address(&mut self, talker_unique_id: u16, mac: MacAddr) -> Result<()> {
        let stream = self
            .streams
            .get_mut(usize::from(talker_unique_id))
            .ok_or(Error::InvalidParameter("talker_unique_id out of range"))?;
        stream.destination_mac = mac;
        Ok(())
    }

    /// Stream bookkeeping for source `talker_unique_id`
    pub fn stream(&self, talker_unique_id: u16) -> Option<&TalkerStream> {
        self.streams.get(usize::from(talker_unique_id))
    }

    /// Current state
    pub fn state(&self) -> TalkerState {
        self.state
    }

    fn valid_talker_unique(&self) -> bool {
        usize::from(self.rcvd.talker_unique_id) < self.streams.len()
    }

    fn rcvd_pair(&self) -> ListenerPair {
        ListenerPair {
            guid: self.rcvd.listener_guid,
            unique_id: self.rcvd.listener_unique_id,
        }
    }

    fn response(&self, message_type: ScmMessageType, status: StatusCode) -> ScmPdu {
        let mut rsp = self.rcvd.reply(message_type, status);
        if let Some(stream) = self.stream(self.rcvd.talker_unique_id) {
            rsp.stream_id = stream.stream_id;
            rsp.stream_dest_mac = stream.destination_mac;
            rsp.connection_count = stream.connection_count;
        }
        rsp
    }

    fn connection_response(&self) -> ScmPdu {
        let message_type = ScmMessageType::GetTxConnectionResponse;
        let Some(stream) = self.stream(self.rcvd.talker_unique_id) else {
            return self.response(message_type, StatusCode::TalkerUnknownId);
        };

        match stream.pair(usize::from(self.rcvd.connection_count)) {
            Some(pair) => {
                let mut rsp = self.response(message_type, StatusCode::Success);
                rsp.listener_guid = pair.guid;
                rsp.listener_unique_id = pair.unique_id;
                rsp
            }
            None => self.response(message_type, StatusCode::NoSuchConnection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::CaptureChannel;

    const TALKER: Guid = Guid(0x1000);
    const LOCAL_MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x01]);

    fn setup() -> (TalkerEngine, Outbox, CaptureChannel) {
        let config = EngineConfig {
            max_talkers: 2,
            max_listeners_per_talker: 1,
            ..EngineConfig::default()
        };
        (
            TalkerEngine::new(TALKER, LOCAL_MAC, &config),
            Outbox::new(LOCAL_MAC),
            CaptureChannel::new(),
        )
    }

    fn command(message_type: ScmMessageType, talker_unique_id: u16, listener: u64) -> ScmPdu {
        ScmPdu {
            talker_guid: TALKER,
            talker_unique_id,
            listener_guid: Guid(listener),
            controller_guid: Guid(0xc0),
            sequence_id: 9,
            ..ScmPdu::command(message_type)
        }
    }

    fn last_scm(wire: &CaptureChannel) -> ScmPdu {
        match wire.decoded().last().map(|f| f.pdu) {
            Some(Pdu::Scm(pdu)) => pdu,
            other => panic!("expected SCM frame, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_id_from_mac() {
        let (talker, _, _) = setup();
        assert_eq!(talker.stream(0).unwrap().stream_id, 0x0200_0000_0001_0000);
        assert_eq!(talker.stream(1).unwrap().stream_id, 0x0200_0000_0001_0001);
        assert!(talker.stream(2).is_none());
    }

    #[test]
    fn test_not_addressed_to_us() {
        let (mut talker, _, _) = setup();
        let mut cmd = command(ScmMessageType::ConnectTxCommand, 0, 0x2000);
        cmd.talker_guid = Guid(0x9999);
        assert!(!talker.handle(&cmd));
        assert_eq!(talker.state(), TalkerState::Waiting);
    }

    #[test]
    fn test_responses_not_accepted() {
        let (mut talker, _, _) = setup();
        assert!(!talker.handle(&command(ScmMessageType::ConnectTxResponse, 0, 0x2000)));
        assert_eq!(talker.state(), TalkerState::Waiting);
    }

    #[test]
    fn test_connect_unknown_id() {
        let (mut talker, mut outbox, mut wire) = setup();
        assert!(talker.handle(&command(ScmMessageType::ConnectTxCommand, 2, 0x2000)));
        assert_eq!(talker.periodic(&mut outbox, &mut wire), None);

        let rsp = last_scm(&wire);
        assert_eq!(rsp.message_type, ScmMessageType::ConnectTxResponse);
        assert_eq!(rsp.status, StatusCode::TalkerUnknownId);
        assert_eq!(rsp.sequence_id, 9);
        assert_eq!(talker.state(), TalkerState::Waiting);
    }

    #[test]
    fn test_connect_and_complete() {
        let (mut talker, mut outbox, mut wire) = setup();
        talker.set_mac_address(0, MacAddr([0x91, 0xe0, 0xf0, 0, 0, 1])).unwrap();
        talker.handle(&command(ScmMessageType::ConnectTxCommand, 0, 0x2000));

        let event = talker.periodic(&mut outbox, &mut wire);
        assert_eq!(
            event,
            Some(Event::ConnectTalker {
                talker_unique_id: 0,
                listener_guid: Guid(0x2000),
                listener_unique_id: 0,
                stream_id: 0x0200_0000_0001_0000,
                dest_mac: MacAddr([0x91, 0xe0, 0xf0, 0, 0, 1]),
            })
        );
        assert_eq!(talker.state(), TalkerState::WaitingForConnect);
        assert!(wire.frames().is_empty());

        // busy: a second command is dropped
        assert!(!talker.handle(&command(ScmMessageType::GetTxStateCommand, 0, 0x2000)));
        assert_eq!(talker.periodic(&mut outbox, &mut wire), None);

        assert!(talker.connection_complete(StatusCode::Success, &mut outbox, &mut wire));
        let rsp = last_scm(&wire);
        assert_eq!(rsp.message_type, ScmMessageType::ConnectTxResponse);
        assert!(rsp.status.is_success());
        assert_eq!(rsp.connection_count, 1);
        assert_eq!(rsp.stream_id, 0x0200_0000_0001_0000);
        assert_eq!(talker.state(), TalkerState::Waiting);
        assert_eq!(talker.stream(0).unwrap().connection_count, 1);

        assert!(!talker.connection_complete(StatusCode::Success, &mut outbox, &mut wire));
    }

    #[test]
    fn test_connect_failure_not_recorded() {
        let (mut talker, mut outbox, mut wire) = setup();
        talker.handle(&command(ScmMessageType::ConnectTxCommand, 0, 0x2000));
        talker.periodic(&mut outbox, &mut wire);
        talker.connection_complete(StatusCode::TalkerNoBandwidth, &mut outbox, &mut wire);

        assert_eq!(last_scm(&wire).status, StatusCode::TalkerNoBandwidth);
        assert_eq!(talker.stream(0).unwrap().connection_count, 0);
    }

    #[test]
    fn test_connect_exclusive_when_full() {
        let (mut talker, mut outbox, mut wire) = setup();
        talker.handle(&command(ScmMessageType::ConnectTxCommand, 0, 0x2000));
        talker.periodic(&mut outbox, &mut wire);
        talker.connection_complete(StatusCode::Success, &mut outbox, &mut wire);

        // same listener again is allowed and not double counted
        talker.handle(&command(ScmMessageType::ConnectTxCommand, 0, 0x2000));
        assert!(talker.periodic(&mut outbox, &mut wire).is_some());
        talker.connection_complete(StatusCode::Success, &mut outbox, &mut wire);
        assert_eq!(talker.stream(0).unwrap().connection_count, 1);

        talker.handle(&command(ScmMessageType::ConnectTxCommand, 0, 0x3000));
        assert_eq!(talker.periodic(&mut outbox, &mut wire), None);
        assert_eq!(last_scm(&wire).status, StatusCode::TalkerExclusive);
        assert_eq!(talker.state(), TalkerState::Waiting);
    }

    #[test]
    fn test_disconnect_detaches() {
        let (mut talker, mut outbox, mut wire) = setup();
        talker.handle(&command(ScmMessageType::ConnectTxCommand, 0, 0x2000));
        talker.periodic(&mut outbox, &mut wire);
        talker.connection_complete(StatusCode::Success, &mut outbox, &mut wire);

        talker.handle(&command(ScmMessageType::DisconnectTxCommand, 0, 0x2000));
        assert_eq!(
            talker.periodic(&mut outbox, &mut wire),
            Some(Event::DisconnectTalker {
                talker_unique_id: 0,
                listener_guid: Guid(0x2000),
                listener_unique_id: 0,
            })
        );
        talker.connection_complete(StatusCode::Success, &mut outbox, &mut wire);

        let rsp = last_scm(&wire);
        assert_eq!(rsp.message_type, ScmMessageType::DisconnectTxResponse);
        assert_eq!(rsp.connection_count, 0);
        assert_eq!(talker.stream(0).unwrap().listeners().count(), 0);
    }

    #[test]
    fn test_disconnect_unknown_id() {
        let (mut talker, mut outbox, mut wire) = setup();
        talker.handle(&command(ScmMessageType::DisconnectTxCommand, 7, 0x2000));
        assert_eq!(talker.periodic(&mut outbox, &mut wire), None);
        assert_eq!(last_scm(&wire).status, StatusCode::TalkerUnknownId);
    }

    #[test]
    fn test_get_state() {
        let (mut talker, mut outbox, mut wire) = setup();
        talker.handle(&command(ScmMessageType::GetTxStateCommand, 1, 0));
        assert_eq!(talker.state(), TalkerState::GetState);
        talker.periodic(&mut outbox, &mut wire);

        let rsp = last_scm(&wire);
        assert_eq!(rsp.message_type, ScmMessageType::GetTxStateResponse);
        assert!(rsp.status.is_success());
        assert_eq!(rsp.stream_id, 0x0200_0000_0001_0001);
        assert_eq!(talker.state(), TalkerState::Waiting);
    }

    #[test]
    fn test_get_connection() {
        let (mut talker, mut outbox, mut wire) = setup();
        talker.handle(&command(ScmMessageType::GetTxConnectionCommand, 0, 0));
        talker.periodic(&mut outbox, &mut wire);
        assert_eq!(last_scm(&wire).status, StatusCode::NoSuchConnection);

        talker.handle(&command(ScmMessageType::ConnectTxCommand, 0, 0x2000));
        talker.periodic(&mut outbox, &mut wire);
        talker.connection_complete(StatusCode::Success, &mut outbox, &mut wire);

        talker.handle(&command(ScmMessageType::GetTxConnectionCommand, 0, 0));
        talker.periodic(&mut outbox, &mut wire);
        let rsp = last_scm(&wire);
        assert_eq!(rsp.message_type, ScmMessageType::GetTxConnectionResponse);
        assert!(rsp.status.is_success());
        assert_eq!(rsp.listener_guid, Guid(0x2000));
    }

    #[test]
    fn test_set_mac_out_of_range() {
        let (mut talker, _, _) = setup();
        assert!(matches!(
            talker.set_mac_address(2, MacAddr::ZERO),
            Err(Error::InvalidParameter(_))
        ));
    }
}
