// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote entity table
//!
//! Fixed capacity, no LRU: when the table is full a new entity is dropped
//! until an existing one expires or departs. Deadlines are absolute values
//! of the 2-second discovery tick.

use crate::types::Guid;

/// One remote entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityRecord {
    /// Entity GUID (never zero in an occupied slot)
    pub guid: Guid,
    /// Expires when `timeout < tick`
    pub timeout: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    record: EntityRecord,
    occupied: bool,
}

/// Result of [`EntityDatabase::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New slot allocated
    Inserted,
    /// Existing slot deadline refreshed
    Refreshed,
    /// Table full or zero GUID, nothing stored
    Dropped,
}

/// Bounded entity table keyed by GUID
#[derive(Debug, Clone)]
pub struct EntityDatabase {
    slots: Vec<Slot>,
}

impl EntityDatabase {
    /// Table with `capacity` slots, all free
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
        }
    }

    /// Maximum number of entities
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Insert or refresh `guid` with deadline `tick + valid_time`
    pub fn add(&mut self, guid: Guid, valid_time: u8, tick: u32) -> AddOutcome {
        if guid.is_zero() {
            return AddOutcome::Dropped;
        }
        let timeout = tick.saturating_add(u32::from(valid_time));

        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.occupied && s.record.guid == guid)
        {
            slot.record.timeout = timeout;
            return AddOutcome::Refreshed;
        }

        match self.slots.iter_mut().find(|s| !s.occupied) {
            Some(slot) => {
                *slot = Slot {
                    record: EntityRecord { guid, timeout },
                    occupied: true,
                };
                log::debug!("[entity-db] added {} (timeout tick {})", guid, timeout);
                AddOutcome::Inserted
            }
            None => {
                log::debug!("[entity-db] table full, dropping {}", guid);
                AddOutcome::Dropped
            }
        }
    }

    /// Clear the slot holding `guid`; true if one was cleared
    pub fn remove(&mut self, guid: Guid) -> bool {
        let mut removed = false;
        for slot in &mut self.slots {
            if slot.occupied && slot.record.guid == guid {
                slot.occupied = false;
                removed = true;
            }
        }
        removed
    }

    /// Evict every entry with `timeout < tick`, returning the evicted GUIDs
    pub fn sweep(&mut self, tick: u32) -> Vec<Guid> {
        let mut evicted = Vec::new();
        for slot in &mut self.slots {
            if slot.occupied && slot.record.timeout < tick {
                slot.occupied = false;
                log::debug!("[entity-db] {} timed out at tick {}", slot.record.guid, tick);
                evicted.push(slot.record.guid);
            }
        }
        evicted
    }

    /// Look up an entity
    pub fn get(&self, guid: Guid) -> Option<&EntityRecord> {
        self.iter().find(|r| r.guid == guid)
    }

    /// True if `guid` is present
    pub fn contains(&self, guid: Guid) -> bool {
        self.get(guid).is_some()
    }

    /// Occupied records
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.slots.iter().filter(|s| s.occupied).map(|s| &s.record)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if no entity is known
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_add_and_refresh() {
        let mut db = EntityDatabase::new(4);
        assert_eq!(db.add(Guid(1), 2, 0), AddOutcome::Inserted);
        assert_eq!(db.add(Guid(1), 10, 3), AddOutcome::Refreshed);
        assert_eq!(db.len(), 1);
        assert_eq!(db.get(Guid(1)).unwrap().timeout, 13);
    }

    #[test]
    fn test_entity_zero_guid_never_stored() {
        let mut db = EntityDatabase::new(4);
        assert_eq!(db.add(Guid::ZERO, 10, 0), AddOutcome::Dropped);
        assert!(db.is_empty());
    }

    #[test]
    fn test_entity_overflow_dropped() {
        let mut db = EntityDatabase::new(2);
        db.add(Guid(1), 10, 0);
        db.add(Guid(2), 10, 0);
        assert_eq!(db.add(Guid(3), 10, 0), AddOutcome::Dropped);
        assert_eq!(db.len(), 2);
        assert!(!db.contains(Guid(3)));

        // a freed slot is reused
        db.remove(Guid(1));
        assert_eq!(db.add(Guid(3), 10, 0), AddOutcome::Inserted);
        assert!(db.contains(Guid(3)));
    }

    #[test]
    fn test_entity_sweep() {
        let mut db = EntityDatabase::new(4);
        db.add(Guid(1), 2, 0);
        db.add(Guid(2), 10, 0);

        // timeout == tick is still valid
        assert!(db.sweep(2).is_empty());
        assert_eq!(db.sweep(3), vec![Guid(1)]);
        assert_eq!(db.len(), 1);
        assert!(db.iter().all(|r| r.timeout >= 3));
    }

    #[test]
    fn test_entity_remove_missing() {
        let mut db = EntityDatabase::new(1);
        assert!(!db.remove(Guid(9)));
        db.add(Guid(9), 1, 0);
        assert!(db.remove(Guid(9)));
        assert!(db.is_empty());
    }
}
