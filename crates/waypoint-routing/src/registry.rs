//! Station registry.
//!
//! Maps each connected station endpoint to the stage group it serves and
//! tracks whether a player currently occupies it. Slots keep registration
//! order, which is the tie-break when several stations of a stage are free.

use chrono::{DateTime, Utc};
use serde::Serialize;
use waypoint_core::{EndpointId, Stage};

/// One physical station terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationSlot {
    pub endpoint: EndpointId,
    pub stage: Stage,
    pub occupied: bool,
    /// Cleared when the station's channel closes.
    pub connected: bool,
    pub registered_at: DateTime<Utc>,
}

impl StationSlot {
    /// Returns `true` if a player can be sent here now.
    pub fn is_available(&self) -> bool {
        self.connected && !self.occupied
    }
}

/// Outcome of [`StationRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The endpoint was not known before.
    New,
    /// The endpoint re-announced itself; its stage group may have changed.
    Updated { previous: Stage },
}

/// Insertion-ordered set of station slots.
#[derive(Debug, Default)]
pub struct StationRegistry {
    slots: Vec<StationSlot>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` as serving `stage`.
    ///
    /// A station that registers again keeps its place in the order and
    /// starts out unoccupied.
    pub fn register(&mut self, endpoint: EndpointId, stage: Stage) -> Registration {
        if let Some(slot) = self.slot_mut(&endpoint) {
            let previous = slot.stage;
            slot.stage = stage;
            slot.occupied = false;
            slot.connected = true;
            return Registration::Updated { previous };
        }

        self.slots.push(StationSlot {
            endpoint,
            stage,
            occupied: false,
            connected: true,
            registered_at: Utc::now(),
        });
        Registration::New
    }

    /// Set the occupancy of `endpoint`. Returns `false` if it never registered.
    pub fn set_occupied(&mut self, endpoint: &EndpointId, occupied: bool) -> bool {
        match self.slot_mut(endpoint) {
            Some(slot) => {
                slot.occupied = occupied;
                true
            }
            None => false,
        }
    }

    /// Mark `endpoint` closed and unoccupied. Returns `false` if it never
    /// registered.
    pub fn mark_closed(&mut self, endpoint: &EndpointId) -> bool {
        match self.slot_mut(endpoint) {
            Some(slot) => {
                slot.occupied = false;
                slot.connected = false;
                true
            }
            None => false,
        }
    }

    /// First available station of `stage`, in registration order.
    pub fn first_available(&self, stage: Stage) -> Option<EndpointId> {
        self.slots
            .iter()
            .find(|slot| slot.stage == stage && slot.is_available())
            .map(|slot| slot.endpoint)
    }

    /// Number of available stations of `stage`.
    pub fn available_count(&self, stage: Stage) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.stage == stage && slot.is_available())
            .count()
    }

    pub fn get(&self, endpoint: &EndpointId) -> Option<&StationSlot> {
        self.slots.iter().find(|slot| &slot.endpoint == endpoint)
    }

    fn slot_mut(&mut self, endpoint: &EndpointId) -> Option<&mut StationSlot> {
        self.slots.iter_mut().find(|slot| &slot.endpoint == endpoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(n: u8) -> Stage {
        Stage::new(n).unwrap()
    }

    #[test]
    fn test_first_available_uses_registration_order() {
        let mut registry = StationRegistry::new();
        let (a, b, c) = (EndpointId::new(), EndpointId::new(), EndpointId::new());
        registry.register(a, stage(1));
        registry.register(b, stage(0));
        registry.register(c, stage(1));

        assert_eq!(registry.first_available(stage(1)), Some(a));
        registry.set_occupied(&a, true);
        assert_eq!(registry.first_available(stage(1)), Some(c));
        registry.set_occupied(&c, true);
        assert_eq!(registry.first_available(stage(1)), None);
        assert_eq!(registry.first_available(stage(0)), Some(b));
    }

    #[test]
    fn test_reregistration_updates_in_place() {
        let mut registry = StationRegistry::new();
        let (a, b) = (EndpointId::new(), EndpointId::new());
        registry.register(a, stage(0));
        registry.register(b, stage(1));
        registry.set_occupied(&a, true);

        assert_eq!(
            registry.register(a, stage(1)),
            Registration::Updated { previous: stage(0) }
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.first_available(stage(1)), Some(a));
        assert_eq!(registry.first_available(stage(0)), None);
    }

    #[test]
    fn test_closed_station_is_skipped() {
        let mut registry = StationRegistry::new();
        let (a, b) = (EndpointId::new(), EndpointId::new());
        registry.register(a, stage(2));
        registry.register(b, stage(2));
        registry.set_occupied(&a, true);

        assert!(registry.mark_closed(&a));
        let slot = registry.get(&a).unwrap();
        assert!(!slot.occupied);
        assert!(!slot.connected);
        assert_eq!(registry.first_available(stage(2)), Some(b));
        assert_eq!(registry.available_count(stage(2)), 1);
    }

    #[test]
    fn test_unknown_endpoint() {
        let mut registry = StationRegistry::new();
        let stranger = EndpointId::new();
        assert!(!registry.set_occupied(&stranger, false));
        assert!(!registry.mark_closed(&stranger));
        assert!(registry.is_empty());
    }
}
