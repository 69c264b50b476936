// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared helpers for the engine integration tests

#![allow(dead_code)]

use avdecc::codec::FRAME_SIZE;
use avdecc::{
    CaptureChannel, Engine, EngineConfig, Event, Frame, Guid, MacAddr, ManualClock, Pdu, ScmPdu,
    SdpPdu, SinkTable, StatusCode,
};

pub const LOCAL_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const LOCAL_SERIAL: u16 = 0x42;
pub const PEER_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x99]);

pub type TestEngine = Engine<ManualClock, SinkTable>;

/// Engine at `LOCAL_MAC` with default configuration
pub fn local_engine() -> (TestEngine, ManualClock) {
    engine_with(EngineConfig::default(), LOCAL_MAC)
}

pub fn engine_with(config: EngineConfig, mac: MacAddr) -> (TestEngine, ManualClock) {
    let clock = ManualClock::new();
    (engine_on(config, mac, clock.clone()), clock)
}

/// Engine driven by an existing clock
pub fn engine_on(config: EngineConfig, mac: MacAddr, clock: ManualClock) -> TestEngine {
    let sinks = SinkTable::new(usize::from(config.max_listeners));
    Engine::new(config, mac, LOCAL_SERIAL, clock, sinks).unwrap()
}

/// Encode `pdu` as if sent by a peer
pub fn wire_frame(pdu: Pdu) -> Vec<u8> {
    let mut buf = [0u8; FRAME_SIZE];
    let len = Frame::multicast(PEER_MAC, pdu).encode(&mut buf).unwrap();
    buf[..len].to_vec()
}

pub fn inject_sdp(engine: &mut TestEngine, pdu: SdpPdu) -> avdecc::Dispatch {
    engine.process_packet(&wire_frame(Pdu::Sdp(pdu)))
}

pub fn inject_scm(engine: &mut TestEngine, pdu: ScmPdu) -> avdecc::Dispatch {
    engine.process_packet(&wire_frame(Pdu::Scm(pdu)))
}

/// Call periodic until it returns `None`
pub fn drain(engine: &mut TestEngine, wire: &mut CaptureChannel) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = engine.periodic(wire) {
        events.push(event);
    }
    events
}

/// Advance the clock in `step_ms` steps, draining the engine after each
pub fn run_for(
    engine: &mut TestEngine,
    clock: &ManualClock,
    wire: &mut CaptureChannel,
    total_ms: u64,
    step_ms: u64,
) -> Vec<Event> {
    let mut events = Vec::new();
    let mut elapsed = 0;
    while elapsed < total_ms {
        clock.advance_ms(step_ms);
        elapsed += step_ms;
        events.extend(drain(engine, wire));
    }
    events
}

pub fn sdp_sent(wire: &CaptureChannel) -> Vec<SdpPdu> {
    wire.decoded()
        .into_iter()
        .filter_map(|f| match f.pdu {
            Pdu::Sdp(pdu) => Some(pdu),
            _ => None,
        })
        .collect()
}

pub fn scm_sent(wire: &CaptureChannel) -> Vec<ScmPdu> {
    wire.decoded()
        .into_iter()
        .filter_map(|f| match f.pdu {
            Pdu::Scm(pdu) => Some(pdu),
            _ => None,
        })
        .collect()
}

/// Host side of the data plane: enable/disable sinks and complete every
/// request with SUCCESS
pub fn complete_requests(engine: &mut TestEngine, wire: &mut CaptureChannel, event: &Event) {
    match *event {
        Event::ConnectTalker { .. } | Event::DisconnectTalker { .. } => {
            assert!(engine.scm_talker_connection_complete(StatusCode::Success, wire));
        }
        Event::ConnectListener {
            listener_unique_id, ..
        } => {
            engine.data_plane_mut().set_enabled(listener_unique_id, true);
            assert!(engine.scm_listener_connection_complete(StatusCode::Success));
        }
        Event::DisconnectListener {
            listener_unique_id, ..
        } => {
            engine.data_plane_mut().set_enabled(listener_unique_id, false);
            assert!(engine.scm_listener_connection_complete(StatusCode::Success));
        }
        _ => {}
    }
}

pub fn available(guid: Guid, valid_time: u8) -> SdpPdu {
    SdpPdu {
        message_type: avdecc::SdpMessageType::EntityAvailable,
        valid_time,
        ..SdpPdu::discover(guid)
    }
}
