//! Players waiting to be routed.
//!
//! When a player leaves a station, the station reports the player's updated
//! record. The record waits here, keyed by player id, until the player's card
//! is swiped at the controller and a station of the record's stage is free.

use waypoint_core::PlayerId;
use waypoint_protocol::PlayerRecord;

/// Ordered pending records, at most one per player id.
#[derive(Debug, Default, Clone)]
pub struct PendingSet {
    records: Vec<PlayerRecord>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `record`, replacing an earlier record of the same player in place.
    ///
    /// Returns the replaced record, if any.
    pub fn insert(&mut self, record: PlayerRecord) -> Option<PlayerRecord> {
        match self.records.iter_mut().find(|r| r.same_player(&record)) {
            Some(existing) => Some(std::mem::replace(existing, record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    pub fn find(&self, player_id: &PlayerId) -> Option<&PlayerRecord> {
        self.records.iter().find(|r| &r.player_id == player_id)
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.find(player_id).is_some()
    }

    pub fn remove(&mut self, player_id: &PlayerId) -> Option<PlayerRecord> {
        let index = self.records.iter().position(|r| &r.player_id == player_id)?;
        Some(self.records.remove(index))
    }

    /// Records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
