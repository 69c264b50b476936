// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SCM listener state machine
//!
//! A controller asks the listener to connect (CONNECT_RX_COMMAND). The
//! listener forwards the request to the talker as CONNECT_TX_COMMAND,
//! tracks it in the [`InflightTable`], and relays the talker's answer back
//! to the controller as CONNECT_RX_RESPONSE. Disconnect follows the same
//! path.
//!
//! ```text
//! controller            listener                 talker
//!     |-- CONNECT_RX_CMD -->|                        |
//!     |                     |--- CONNECT_TX_CMD ---->|
//!     |                     |<-- CONNECT_TX_RSP -----|
//!     |<- CONNECT_RX_RSP ---|                        |
//!                           |-- ConnectListener --> host
//! ```

use std::collections::VecDeque;

use crate::codec::{Pdu, ScmPdu};
use crate::config::EngineConfig;
use crate::event::Event;
use crate::inflight::{InflightAction, InflightCommand, InflightTable};
use crate::transport::{MacChannel, Outbox, StreamDataPlane};
use crate::types::{Guid, MacAddr, ScmMessageType, StatusCode};

/// Listener machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not initialised
    Idle,
    /// Ready for a command or response
    Waiting,
    /// Controller asked us to connect
    ConnectRxCommand,
    /// Controller asked us to disconnect
    DisconnectRxCommand,
    /// Talker answered our CONNECT_TX_COMMAND
    ConnectTxResponse,
    /// Talker answered our DISCONNECT_TX_COMMAND
    DisconnectTxResponse,
    /// GET_RX_STATE_COMMAND received
    GetState,
    /// Data plane is starting the sink
    WaitingForConnect,
    /// Data plane is stopping the sink
    WaitingForDisconnect,
}

/// Per-sink stream bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerStream {
    /// Talker the sink is bound to
    pub talker_guid: Guid,
    /// Talker source index
    pub talker_unique_id: u16,
    /// Stream id
    pub stream_id: u64,
    /// Stream destination
    pub destination_mac: MacAddr,
    /// Sink enabled in the data plane
    pub connected: bool,
}

/// Listener side of connection management
#[derive(Debug, Clone)]
pub struct ListenerEngine {
    guid: Guid,
    state: ListenerState,
    rcvd: ScmPdu,
    streams: Vec<ListenerStream>,
    inflight: InflightTable,
    connect_timeout_ms: u64,
    disconnect_timeout_ms: u64,
    timeouts: VecDeque<Event>,
    last_status: StatusCode,
}

impl ListenerEngine {
    /// One stream record per configured sink, state WAITING
    pub fn new(guid: Guid, config: &EngineConfig) -> Self {
        Self {
            guid,
            state: ListenerState::Waiting,
            rcvd: ScmPdu::command(ScmMessageType::ConnectRxCommand),
            streams: vec![ListenerStream::default(); usize::from(config.max_listeners)],
            inflight: InflightTable::new(config.max_inflight_commands),
            connect_timeout_ms: config.connect_tx_timeout_ms,
            disconnect_timeout_ms: config.disconnect_tx_timeout_ms,
            timeouts: VecDeque::with_capacity(config.max_inflight_commands),
            last_status: StatusCode::Success,
        }
    }

    /// Accept an RX command or TX response addressed to this listener
    pub fn handle(&mut self, pdu: &ScmPdu) -> bool {
        if pdu.listener_guid != self.guid {
            return false;
        }
        if self.state != ListenerState::Waiting {
            log::debug!(
                "[scm-listener] {:?} seq {} dropped in {:?}",
                pdu.message_type,
                pdu.sequence_id,
                self.state
            );
            return false;
        }

        let next = match pdu.message_type {
            ScmMessageType::ConnectRxCommand => ListenerState::ConnectRxCommand,
            ScmMessageType::DisconnectRxCommand => ListenerState::DisconnectRxCommand,
            ScmMessageType::ConnectTxResponse => ListenerState::ConnectTxResponse,
            ScmMessageType::DisconnectTxResponse => ListenerState::DisconnectTxResponse,
            ScmMessageType::GetRxStateCommand => ListenerState::GetState,
            _ => return false,
        };

        log::debug!(
            "[scm-listener] {:?} seq {} sink {}",
            pdu.message_type,
            pdu.sequence_id,
            pdu.listener_unique_id
        );
        self.rcvd = *pdu;
        self.state = next;
        true
    }

    /// Advance the machine at time `now`
    pub fn periodic<D, M>(
        &mut self,
        now: u64,
        data_plane: &D,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> Option<Event>
    where
        D: StreamDataPlane + ?Sized,
        M: MacChannel + ?Sized,
    {
        match self.state {
            ListenerState::Idle => None,
            ListenerState::Waiting
            | ListenerState::WaitingForConnect
            | ListenerState::WaitingForDisconnect => {
                self.sweep(now, outbox, mac);
                self.timeouts.pop_front()
            }
            ListenerState::ConnectRxCommand => {
                self.on_connect_rx(now, data_plane, outbox, mac);
                self.state = ListenerState::Waiting;
                None
            }
            ListenerState::DisconnectRxCommand => {
                self.on_disconnect_rx(now, data_plane, outbox, mac);
                self.state = ListenerState::Waiting;
                None
            }
            ListenerState::ConnectTxResponse | ListenerState::DisconnectTxResponse => {
                self.on_tx_response(outbox, mac)
            }
            ListenerState::GetState => {
                let rsp = self.state_response(data_plane);
                outbox.send(mac, Pdu::Scm(rsp));
                self.state = ListenerState::Waiting;
                None
            }
        }
    }

    fn on_connect_rx<D, M>(&mut self, now: u64, data_plane: &D, outbox: &mut Outbox, mac: &mut M)
    where
        D: StreamDataPlane + ?Sized,
        M: MacChannel + ?Sized,
    {
        let uid = self.rcvd.listener_unique_id;
        let status = if !self.valid_listener_unique() {
            StatusCode::ListenerUnknownId
        } else if data_plane.sink_enabled(uid) {
            StatusCode::ListenerExclusive
        } else {
            let cmd = self.rcvd.reply(ScmMessageType::ConnectTxCommand, StatusCode::Success);
            self.tx_command(cmd, self.connect_timeout_ms, now, outbox, mac)
        };

        if !status.is_success() {
            log::debug!("[scm-listener] connect sink {} rejected: {:?}", uid, status);
            let rsp = self.rcvd.reply(ScmMessageType::ConnectRxResponse, status);
            outbox.send(mac, Pdu::Scm(rsp));
        }
    }

    fn on_disconnect_rx<D, M>(
        &mut self,
        now: u64,
        data_plane: &D,
        outbox: &mut Outbox,
        mac: &mut M,
    ) where
        D: StreamDataPlane + ?Sized,
        M: MacChannel + ?Sized,
    {
        let uid = self.rcvd.listener_unique_id;
        let status = if !self.valid_listener_unique() {
            StatusCode::ListenerUnknownId
        } else if !data_plane.sink_enabled(uid) {
            StatusCode::NotConnected
        } else {
            let cmd = self
                .rcvd
                .reply(ScmMessageType::DisconnectTxCommand, StatusCode::Success);
            self.tx_command(cmd, self.disconnect_timeout_ms, now, outbox, mac)
        };

        if !status.is_success() {
            log::debug!("[scm-listener] disconnect sink {} rejected: {:?}", uid, status);
            let rsp = self.rcvd.reply(ScmMessageType::DisconnectRxResponse, status);
            outbox.send(mac, Pdu::Scm(rsp));
        }
    }

    /// Send a TX command toward the talker and track it
    fn tx_command<M: MacChannel + ?Sized>(
        &mut self,
        cmd: ScmPdu,
        timeout_ms: u64,
        now: u64,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> StatusCode {
        match self
            .inflight
            .find_for_listener(cmd.listener_unique_id, cmd.sequence_id)
        {
            // a controller retry resends the tracked command
            Some(slot) if self.inflight.get(slot).map(|e| e.pdu) == Some(cmd) => {}
            Some(_) => {
                log::debug!(
                    "[scm-listener] seq {} for sink {} already used by another command",
                    cmd.sequence_id,
                    cmd.listener_unique_id
                );
                return StatusCode::CouldNotSendMessage;
            }
            None => {
                if self.inflight.add(cmd, timeout_ms, now).is_none() {
                    return StatusCode::CouldNotSendMessage;
                }
            }
        }
        log::debug!(
            "[scm-listener] {:?} seq {} to {}",
            cmd.message_type,
            cmd.sequence_id,
            cmd.talker_guid
        );
        outbox.send(mac, Pdu::Scm(cmd));
        StatusCode::Success
    }

    fn on_tx_response<M: MacChannel + ?Sized>(
        &mut self,
        outbox: &mut Outbox,
        mac: &mut M,
    ) -> Option<Event> {
        let rcvd = self.rcvd;
        let connect = rcvd.message_type == ScmMessageType::ConnectTxResponse;
        let command = if connect {
            ScmMessageType::ConnectTxCommand
        } else {
            ScmMessageType::DisconnectTxCommand
        };

        let entry = self
            .inflight
            .find_response(&rcvd, command)
            .and_then(|slot| self.inflight.remove(slot));
        let Some(entry) = entry else {
            log::debug!(
                "[scm-listener] {:?} seq {} matches no command, dropped",
                rcvd.message_type,
                rcvd.sequence_id
            );
            self.state = ListenerState::Waiting;
            return None;
        };

        let rsp_type = if connect {
            ScmMessageType::ConnectRxResponse
        } else {
            ScmMessageType::DisconnectRxResponse
        };
        let mut rsp = rcvd.reply(rsp_type, rcvd.status);
        rsp.controller_guid = entry.pdu.controller_guid;
        outbox.send(mac, Pdu::Scm(rsp));

        if !rcvd.status.is_success() || !self.valid_listener_unique() {
            log::debug!(
                "[scm-listener] {:?} seq {} failed: {:?}",
                rcvd.message_type,
                rcvd.sequence_id,
                rcvd.status
            );
            self.state = ListenerState::Waiting;
            return None;
        }

        if connect {
            self.state = ListenerState::WaitingForConnect;
            Some(Event::ConnectListener {
                listener_unique_id: rcvd.listener_unique_id,
                talker_guid: rcvd.talker_guid,
                talker_unique_id: rcvd.talker_unique_id,
                stream_id: rcvd.stream_id,
                dest_mac: rcvd.stream_dest_mac,
            })
        } else {
            self.state = ListenerState::WaitingForDisconnect;
            Some(Event::DisconnectListener {
                listener_unique_id: rcvd.listener_unique_id,
                talker_guid: rcvd.talker_guid,
                talker_unique_id: rcvd.talker_unique_id,
            })
        }
    }

    /// Retry or expire outstanding TX commands
    fn sweep<M: MacChannel + ?Sized>(&mut self, now: u64, outbox: &mut Outbox, mac: &mut M) {
        for action in self.inflight.tick(now) {
            match action {
                InflightAction::Retry(cmd) => {
                    outbox.send(mac, Pdu::Scm(cmd));
                }
                InflightAction::TimedOut(entry) => self.timed_out(&entry, outbox, mac),
            }
        }
    }

    fn timed_out<M: MacChannel + ?Sized>(
        &mut self,
        entry: &InflightCommand,
        outbox: &mut Outbox,
        mac: &mut M,
    ) {
        let rsp_type = match entry.command() {
            ScmMessageType::ConnectTxCommand => ScmMessageType::ConnectRxResponse,
            _ => ScmMessageType::DisconnectRxResponse,
        };
        log::warn!(
            "[scm-listener] {:?} seq {} to {} timed out",
            entry.command(),
            entry.original_sequence_id,
            entry.pdu.talker_guid
        );
        let rsp = entry.pdu.reply(rsp_type, StatusCode::ListenerTalkerTimeout);
        outbox.send(mac, Pdu::Scm(rsp));

        let event = Event::ListenerTimeout {
            sequence_id: entry.original_sequence_id,
            listener_unique_id: entry.listener_unique_id(),
            command: entry.command(),
        };
        if self.timeouts.len() >= self.inflight.capacity() * 2 {
            log::warn!("[scm-listener] timeout backlog full, dropping {:?}", event);
            return;
        }
        self.timeouts.push_back(event);
    }

    /// Data plane finished a connect or disconnect request
    ///
    /// Returns false when no request was outstanding.
    pub fn connection_complete(&mut self, status: StatusCode) -> bool {
        let uid = usize::from(self.rcvd.listener_unique_id);
        match self.state {
            ListenerState::WaitingForConnect => {
                if status.is_success() {
                    if let Some(stream) = self.streams.get_mut(uid) {
                        *stream = ListenerStream {
                            talker_guid: self.rcvd.talker_guid,
                            talker_unique_id: self.rcvd.talker_unique_id,
                            stream_id: self.rcvd.stream_id,
                            destination_mac: self.rcvd.stream_dest_mac,
                            connected: false,
                        };
                    }
                }
            }
            ListenerState::WaitingForDisconnect => {
                if status.is_success() {
                    if let Some(stream) = self.streams.get_mut(uid) {
                        *stream = ListenerStream::default();
                    }
                }
            }
            state => {
                log::warn!("[scm-listener] connection_complete in {:?} ignored", state);
                return false;
            }
        }

        log::debug!("[scm-listener] sink {} complete: {:?}", uid, status);
        self.last_status = status;
        self.state = ListenerState::Waiting;
        true
    }

    /// Stream record for sink `listener_unique_id`, `connected` read from
    /// the data plane
    pub fn stream<D: StreamDataPlane + ?Sized>(
        &self,
        listener_unique_id: u16,
        data_plane: &D,
    ) -> Option<ListenerStream> {
        self.streams
            .get(usize::from(listener_unique_id))
            .map(|s| ListenerStream {
                connected: data_plane.sink_enabled(listener_unique_id),
                ..*s
            })
    }

    /// Current state
    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Status passed to the last completed data-plane request
    pub fn last_status(&self) -> StatusCode {
        self.last_status
    }

    /// Outstanding TX commands
    pub fn inflight(&self) -> &InflightTable {
        &self.inflight
    }

    fn valid_listener_unique(&self) -> bool {
        usize::from(self.rcvd.listener_unique_id) < self.streams.len()
    }

    fn state_response<D: StreamDataPlane + ?Sized>(&self, data_plane: &D) -> ScmPdu {
        let message_type = ScmMessageType::GetRxStateResponse;
        let Some(stream) = self.stream(self.rcvd.listener_unique_id, data_plane) else {
            return self.rcvd.reply(message_type, StatusCode::ListenerUnknownId);
        };

        let mut rsp = self.rcvd.reply(message_type, StatusCode::Success);
        rsp.talker_guid = stream.talker_guid;
        rsp.talker_unique_id = stream.talker_unique_id;
        rsp.stream_id = stream.stream_id;
        rsp.stream_dest_mac = stream.destination_mac;
        rsp.connection_count = u16::from(stream.connected);
        rsp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{CaptureChannel, SinkTable};

    const LISTENER: Guid = Guid(0x2000);
    const TALKER: Guid = Guid(0x1000);
    const CONTROLLER: Guid = Guid(0xc0);

    struct Rig {
        listener: ListenerEngine,
        sinks: SinkTable,
        outbox: Outbox,
        wire: CaptureChannel,
        now: u64,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                listener: ListenerEngine::new(LISTENER, &EngineConfig::default()),
                sinks: SinkTable::new(1),
                outbox: Outbox::new(MacAddr([2, 0, 0, 0, 0, 2])),
                wire: CaptureChannel::new(),
                now: 0,
            }
        }

        fn periodic(&mut self) -> Option<Event> {
            self.listener
                .periodic(self.now, &self.sinks, &mut self.outbox, &mut self.wire)
        }

        fn sent(&self) -> Vec<ScmPdu> {
            self.wire
                .decoded()
                .into_iter()
                .filter_map(|f| match f.pdu {
                    Pdu::Scm(pdu) => Some(pdu),
                    _ => None,
                })
                .collect()
        }
    }

    fn rx_command(message_type: ScmMessageType, listener_unique_id: u16, seq: u16) -> ScmPdu {
        ScmPdu {
            controller_guid: CONTROLLER,
            listener_guid: LISTENER,
            talker_guid: TALKER,
            listener_unique_id,
            sequence_id: seq,
            ..ScmPdu::command(message_type)
        }
    }

    fn tx_response(message_type: ScmMessageType, seq: u16, status: StatusCode) -> ScmPdu {
        ScmPdu {
            status,
            stream_id: 0xabcd,
            stream_dest_mac: MacAddr([0x91, 0xe0, 0xf0, 0, 0, 7]),
            ..rx_command(message_type, 0, seq)
        }
    }

    #[test]
    fn test_connect_forwards_tx_command() {
        let mut rig = Rig::new();
        assert!(rig
            .listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 0, 7)));
        assert_eq!(rig.periodic(), None);

        let sent = rig.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_type, ScmMessageType::ConnectTxCommand);
        assert_eq!(sent[0].talker_guid, TALKER);
        assert_eq!(sent[0].sequence_id, 7);
        assert_eq!(rig.listener.inflight().len(), 1);
        assert_eq!(rig.listener.state(), ListenerState::Waiting);
    }

    #[test]
    fn test_connect_unknown_sink() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 1, 7));
        rig.periodic();

        let sent = rig.sent();
        assert_eq!(sent[0].message_type, ScmMessageType::ConnectRxResponse);
        assert_eq!(sent[0].status, StatusCode::ListenerUnknownId);
        assert!(rig.listener.inflight().is_empty());
    }

    #[test]
    fn test_connect_exclusive_when_sink_active() {
        let mut rig = Rig::new();
        rig.sinks.set_enabled(0, true);
        rig.listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 0, 7));
        rig.periodic();
        assert_eq!(rig.sent()[0].status, StatusCode::ListenerExclusive);
    }

    #[test]
    fn test_disconnect_not_connected() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::DisconnectRxCommand, 0, 3));
        rig.periodic();

        let sent = rig.sent();
        assert_eq!(sent[0].message_type, ScmMessageType::DisconnectRxResponse);
        assert_eq!(sent[0].status, StatusCode::NotConnected);
    }

    #[test]
    fn test_connect_happy_path() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 0, 7));
        rig.periodic();

        assert!(rig.listener.handle(&tx_response(
            ScmMessageType::ConnectTxResponse,
            7,
            StatusCode::Success
        )));
        let event = rig.periodic();
        assert_eq!(
            event,
            Some(Event::ConnectListener {
                listener_unique_id: 0,
                talker_guid: TALKER,
                talker_unique_id: 0,
                stream_id: 0xabcd,
                dest_mac: MacAddr([0x91, 0xe0, 0xf0, 0, 0, 7]),
            })
        );
        assert_eq!(rig.listener.state(), ListenerState::WaitingForConnect);
        assert!(rig.listener.inflight().is_empty());

        let rsp = rig.sent()[1];
        assert_eq!(rsp.message_type, ScmMessageType::ConnectRxResponse);
        assert_eq!(rsp.controller_guid, CONTROLLER);
        assert!(rsp.status.is_success());

        rig.sinks.set_enabled(0, true);
        assert!(rig.listener.connection_complete(StatusCode::Success));
        assert_eq!(rig.listener.state(), ListenerState::Waiting);

        let stream = rig.listener.stream(0, &rig.sinks).unwrap();
        assert!(stream.connected);
        assert_eq!(stream.talker_guid, TALKER);
        assert_eq!(stream.stream_id, 0xabcd);
    }

    #[test]
    fn test_failed_tx_response_relayed_without_event() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 0, 7));
        rig.periodic();
        rig.listener.handle(&tx_response(
            ScmMessageType::ConnectTxResponse,
            7,
            StatusCode::TalkerExclusive,
        ));

        assert_eq!(rig.periodic(), None);
        assert_eq!(rig.sent()[1].status, StatusCode::TalkerExclusive);
        assert_eq!(rig.listener.state(), ListenerState::Waiting);
        assert!(rig.listener.inflight().is_empty());
    }

    #[test]
    fn test_unmatched_tx_response_dropped() {
        let mut rig = Rig::new();
        rig.listener.handle(&tx_response(
            ScmMessageType::ConnectTxResponse,
            42,
            StatusCode::Success,
        ));
        assert_eq!(rig.periodic(), None);
        assert!(rig.wire.frames().is_empty());
        assert_eq!(rig.listener.state(), ListenerState::Waiting);
    }

    #[test]
    fn test_sequence_reused_by_other_controller_rejected() {
        let mut rig = Rig::new();
        let first = ScmPdu {
            controller_guid: Guid(0xa),
            ..rx_command(ScmMessageType::ConnectRxCommand, 0, 7)
        };
        rig.listener.handle(&first);
        rig.periodic();

        let second = ScmPdu {
            controller_guid: Guid(0xb),
            talker_guid: Guid(0x3000),
            ..rx_command(ScmMessageType::ConnectRxCommand, 0, 7)
        };
        rig.listener.handle(&second);
        rig.periodic();

        let sent = rig.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].message_type, ScmMessageType::ConnectRxResponse);
        assert_eq!(sent[1].status, StatusCode::CouldNotSendMessage);
        assert_eq!(sent[1].controller_guid, Guid(0xb));
        assert_eq!(rig.listener.inflight().len(), 1);

        // the other talker answering seq 7 matches nothing
        rig.listener.handle(&ScmPdu {
            talker_guid: Guid(0x3000),
            ..tx_response(ScmMessageType::ConnectTxResponse, 7, StatusCode::Success)
        });
        assert_eq!(rig.periodic(), None);
        assert_eq!(rig.sent().len(), 2);

        rig.listener.handle(&tx_response(
            ScmMessageType::ConnectTxResponse,
            7,
            StatusCode::Success,
        ));
        assert!(matches!(rig.periodic(), Some(Event::ConnectListener { .. })));
        let rsp = rig.sent()[2];
        assert_eq!(rsp.message_type, ScmMessageType::ConnectRxResponse);
        assert_eq!(rsp.controller_guid, Guid(0xa));
        assert!(rig.listener.inflight().is_empty());
    }

    #[test]
    fn test_controller_retry_resends_tracked_command() {
        let mut rig = Rig::new();
        let cmd = rx_command(ScmMessageType::ConnectRxCommand, 0, 7);
        rig.listener.handle(&cmd);
        rig.periodic();
        rig.listener.handle(&cmd);
        rig.periodic();

        let sent = rig.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|p| p.message_type == ScmMessageType::ConnectTxCommand && p.sequence_id == 7));
        assert_eq!(rig.listener.inflight().len(), 1);
    }

    #[test]
    fn test_response_of_wrong_kind_dropped() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 0, 7));
        rig.periodic();

        rig.listener.handle(&tx_response(
            ScmMessageType::DisconnectTxResponse,
            7,
            StatusCode::Success,
        ));
        assert_eq!(rig.periodic(), None);
        assert_eq!(rig.sent().len(), 1);
        assert_eq!(rig.listener.state(), ListenerState::Waiting);
        assert_eq!(rig.listener.inflight().len(), 1);
    }

    #[test]
    fn test_retry_then_timeout() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 0, 7));
        rig.periodic();

        rig.now = 2000;
        assert_eq!(rig.periodic(), None);
        assert_eq!(rig.sent().len(), 2);
        assert_eq!(rig.sent()[1].message_type, ScmMessageType::ConnectTxCommand);
        assert_eq!(rig.sent()[1].sequence_id, 7);

        rig.now = 4000;
        assert_eq!(
            rig.periodic(),
            Some(Event::ListenerTimeout {
                sequence_id: 7,
                listener_unique_id: 0,
                command: ScmMessageType::ConnectTxCommand,
            })
        );
        let rsp = rig.sent()[2];
        assert_eq!(rsp.message_type, ScmMessageType::ConnectRxResponse);
        assert_eq!(rsp.status, StatusCode::ListenerTalkerTimeout);
        assert_eq!(rsp.controller_guid, CONTROLLER);
        assert!(rig.listener.inflight().is_empty());
    }

    #[test]
    fn test_get_state() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::GetRxStateCommand, 0, 1));
        assert_eq!(rig.listener.state(), ListenerState::GetState);
        rig.periodic();

        let rsp = rig.sent()[0];
        assert_eq!(rsp.message_type, ScmMessageType::GetRxStateResponse);
        assert!(rsp.status.is_success());
        assert_eq!(rsp.connection_count, 0);
    }

    #[test]
    fn test_disconnect_clears_stream() {
        let mut rig = Rig::new();
        rig.listener
            .handle(&rx_command(ScmMessageType::ConnectRxCommand, 0, 7));
        rig.periodic();
        rig.listener.handle(&tx_response(
            ScmMessageType::ConnectTxResponse,
            7,
            StatusCode::Success,
        ));
        rig.periodic();
        rig.sinks.set_enabled(0, true);
        rig.listener.connection_complete(StatusCode::Success);

        rig.listener
            .handle(&rx_command(ScmMessageType::DisconnectRxCommand, 0, 8));
        rig.periodic();
        assert_eq!(rig.sent()[2].message_type, ScmMessageType::DisconnectTxCommand);

        rig.listener.handle(&tx_response(
            ScmMessageType::DisconnectTxResponse,
            8,
            StatusCode::Success,
        ));
        assert!(matches!(rig.periodic(), Some(Event::DisconnectListener { .. })));
        rig.sinks.set_enabled(0, false);
        assert!(rig.listener.connection_complete(StatusCode::Success));
        assert_eq!(
            rig.listener.stream(0, &rig.sinks),
            Some(ListenerStream::default())
        );
    }

    #[test]
    fn test_not_addressed_to_us() {
        let mut rig = Rig::new();
        let mut cmd = rx_command(ScmMessageType::ConnectRxCommand, 0, 7);
        cmd.listener_guid = Guid(0x9999);
        assert!(!rig.listener.handle(&cmd));
        assert_eq!(rig.periodic(), None);
        assert!(rig.wire.frames().is_empty());
    }
}
