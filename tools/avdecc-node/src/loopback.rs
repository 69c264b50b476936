// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data plane that starts and stops streams instantly

use avdecc::{Event, SinkTable, StreamDataPlane};

/// Which engine side a request must be completed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Talker,
    Listener,
}

/// Tracks sink state and per-source listener counts; no media moves
#[derive(Debug, Clone)]
pub struct LoopbackDataPlane {
    sinks: SinkTable,
    sources: Vec<u16>,
}

impl LoopbackDataPlane {
    pub fn new(sinks: usize, sources: usize) -> Self {
        Self {
            sinks: SinkTable::new(sinks),
            sources: vec![0; sources],
        }
    }

    /// Carry out a data-plane request
    ///
    /// Returns the side to complete, or `None` for discovery events.
    pub fn apply(&mut self, event: &Event) -> Option<Completion> {
        match *event {
            Event::ConnectTalker {
                talker_unique_id, ..
            } => {
                if let Some(count) = self.sources.get_mut(usize::from(talker_unique_id)) {
                    *count = count.saturating_add(1);
                }
                Some(Completion::Talker)
            }
            Event::DisconnectTalker {
                talker_unique_id, ..
            } => {
                if let Some(count) = self.sources.get_mut(usize::from(talker_unique_id)) {
                    *count = count.saturating_sub(1);
                }
                Some(Completion::Talker)
            }
            Event::ConnectListener {
                listener_unique_id, ..
            } => {
                self.sinks.set_enabled(listener_unique_id, true);
                Some(Completion::Listener)
            }
            Event::DisconnectListener {
                listener_unique_id, ..
            } => {
                self.sinks.set_enabled(listener_unique_id, false);
                Some(Completion::Listener)
            }
            Event::EntityAdded { .. }
            | Event::EntityRemoved { .. }
            | Event::ListenerTimeout { .. } => None,
        }
    }

    /// Listeners currently fed by source `talker_unique_id`
    pub fn source_listeners(&self, talker_unique_id: u16) -> u16 {
        self.sources
            .get(usize::from(talker_unique_id))
            .copied()
            .unwrap_or(0)
    }
}

impl StreamDataPlane for LoopbackDataPlane {
    fn sink_enabled(&self, listener_unique_id: u16) -> bool {
        self.sinks.sink_enabled(listener_unique_id)
    }
}
