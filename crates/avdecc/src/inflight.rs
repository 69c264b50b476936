// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Listener in-flight command table
//!
//! Every TX command the listener sends to a talker is tracked here until
//! the matching response arrives. An unanswered command is retried once,
//! then reported as timed out and freed.

use crate::codec::ScmPdu;
use crate::types::ScmMessageType;

/// One outstanding command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflightCommand {
    /// Frame as sent, kept for the retry
    pub pdu: ScmPdu,
    /// Absolute deadline (ms)
    pub deadline: u64,
    /// Per-attempt timeout (ms)
    pub timeout_ms: u64,
    /// Already retried once
    pub retried: bool,
    /// Sequence id of the first attempt
    pub original_sequence_id: u16,
}

impl InflightCommand {
    /// Command kind
    pub fn command(&self) -> ScmMessageType {
        self.pdu.message_type
    }

    /// Listener sink that issued the command
    pub fn listener_unique_id(&self) -> u16 {
        self.pdu.listener_unique_id
    }
}

/// What [`InflightTable::tick`] decided for an expired entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InflightAction {
    /// Send this frame again; the entry stays with a fresh deadline
    Retry(ScmPdu),
    /// Second deadline passed; the entry has been removed
    TimedOut(InflightCommand),
}

/// Bounded table of [`InflightCommand`]s
#[derive(Debug, Clone)]
pub struct InflightTable {
    slots: Vec<Option<InflightCommand>>,
}

impl InflightTable {
    /// Table with `capacity` free slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Track `pdu` with a deadline `timeout_ms` after `now`
    ///
    /// Returns the slot index, or `None` when the table is full or the
    /// `(listener_unique_id, sequence_id)` pair is already tracked.
    pub fn add(&mut self, pdu: ScmPdu, timeout_ms: u64, now: u64) -> Option<usize> {
        if self
            .find_for_listener(pdu.listener_unique_id, pdu.sequence_id)
            .is_some()
        {
            log::debug!(
                "[inflight] seq {} for listener {} already tracked",
                pdu.sequence_id,
                pdu.listener_unique_id
            );
            return None;
        }

        let Some(index) = self.slots.iter().position(Option::is_none) else {
            log::warn!("[inflight] table full, seq {} not tracked", pdu.sequence_id);
            return None;
        };
        self.slots[index] = Some(InflightCommand {
            pdu,
            deadline: now.saturating_add(timeout_ms),
            timeout_ms,
            retried: false,
            original_sequence_id: pdu.sequence_id,
        });
        Some(index)
    }

    /// First slot tracking `sequence_id`
    pub fn find(&self, sequence_id: u16) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Some(c) if c.pdu.sequence_id == sequence_id))
    }

    /// Slot tracking `sequence_id` for one listener sink
    pub fn find_for_listener(&self, listener_unique_id: u16, sequence_id: u16) -> Option<usize> {
        self.slots.iter().position(|s| {
            matches!(s, Some(c) if c.pdu.sequence_id == sequence_id
                && c.pdu.listener_unique_id == listener_unique_id)
        })
    }

    /// Slot of the `command` that `rsp` answers
    ///
    /// Sink, sequence id and talker must all match the tracked frame.
    pub fn find_response(&self, rsp: &ScmPdu, command: ScmMessageType) -> Option<usize> {
        self.find_for_listener(rsp.listener_unique_id, rsp.sequence_id)
            .filter(|&slot| {
                matches!(self.get(slot), Some(c) if c.command() == command
                    && c.pdu.talker_guid == rsp.talker_guid)
            })
    }

    /// Entry at `slot`
    pub fn get(&self, slot: usize) -> Option<&InflightCommand> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Free `slot`, returning what it held
    pub fn remove(&mut self, slot: usize) -> Option<InflightCommand> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Process deadlines at time `now`
    pub fn tick(&mut self, now: u64) -> Vec<InflightAction> {
        let mut actions = Vec::new();
        for slot in &mut self.slots {
            let Some(entry) = slot else { continue };
            if now < entry.deadline {
                continue;
            }
            if entry.retried {
                log::debug!("[inflight] seq {} timed out after retry", entry.pdu.sequence_id);
                actions.push(InflightAction::TimedOut(*entry));
                *slot = None;
            } else {
                entry.retried = true;
                entry.deadline = now.saturating_add(entry.timeout_ms);
                log::debug!("[inflight] retrying seq {}", entry.pdu.sequence_id);
                actions.push(InflightAction::Retry(entry.pdu));
            }
        }
        actions
    }

    /// Number of outstanding commands
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True if nothing is outstanding
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of outstanding commands
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Guid, StatusCode};

    fn connect_tx(listener_unique_id: u16, sequence_id: u16) -> ScmPdu {
        ScmPdu {
            listener_unique_id,
            sequence_id,
            ..ScmPdu::command(ScmMessageType::ConnectTxCommand)
        }
    }

    #[test]
    fn test_inflight_add_find_remove() {
        let mut table = InflightTable::new(2);
        let slot = table.add(connect_tx(0, 7), 2000, 0).unwrap();
        assert_eq!(table.find(7), Some(slot));
        assert_eq!(table.find_for_listener(1, 7), None);

        let entry = table.remove(slot).unwrap();
        assert_eq!(entry.command(), ScmMessageType::ConnectTxCommand);
        assert_eq!(entry.original_sequence_id, 7);
        assert!(table.is_empty());
        assert_eq!(table.remove(slot), None);
    }

    #[test]
    fn test_inflight_no_duplicate_pair() {
        let mut table = InflightTable::new(4);
        assert!(table.add(connect_tx(0, 7), 2000, 0).is_some());
        assert!(table.add(connect_tx(0, 7), 2000, 0).is_none());
        // same sequence id for another sink is a different pair
        assert!(table.add(connect_tx(1, 7), 2000, 0).is_some());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_inflight_response_must_match_command() {
        let mut table = InflightTable::new(2);
        let cmd = ScmPdu {
            talker_guid: Guid(0x1000),
            ..connect_tx(0, 7)
        };
        let slot = table.add(cmd, 2000, 0).unwrap();

        let rsp = cmd.reply(ScmMessageType::ConnectTxResponse, StatusCode::Success);
        assert_eq!(table.find_response(&rsp, ScmMessageType::ConnectTxCommand), Some(slot));
        assert_eq!(table.find_response(&rsp, ScmMessageType::DisconnectTxCommand), None);

        let other_talker = ScmPdu {
            talker_guid: Guid(0x2000),
            ..rsp
        };
        assert_eq!(
            table.find_response(&other_talker, ScmMessageType::ConnectTxCommand),
            None
        );
        let other_sink = ScmPdu {
            listener_unique_id: 1,
            ..rsp
        };
        assert_eq!(table.find_response(&other_sink, ScmMessageType::ConnectTxCommand), None);
    }

    #[test]
    fn test_inflight_full() {
        let mut table = InflightTable::new(1);
        assert!(table.add(connect_tx(0, 1), 2000, 0).is_some());
        assert!(table.add(connect_tx(0, 2), 2000, 0).is_none());
    }

    #[test]
    fn test_inflight_retry_then_timeout() {
        let mut table = InflightTable::new(2);
        table.add(connect_tx(0, 7), 200, 0);

        assert!(table.tick(199).is_empty());

        let actions = table.tick(200);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], InflightAction::Retry(pdu) if pdu.sequence_id == 7));
        assert!(table.get(0).unwrap().retried);

        assert!(table.tick(399).is_empty());
        let actions = table.tick(400);
        assert!(matches!(
            actions[0],
            InflightAction::TimedOut(entry) if entry.original_sequence_id == 7
        ));
        assert!(table.is_empty());
    }
}
