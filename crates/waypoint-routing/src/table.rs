//! Shared routing state.
//!
//! The card loop and every station connection touch the same registry,
//! pending set and in-system set. All of it lives in one [`RoutingTable`]
//! behind a single async mutex so a routing decision and its commit are
//! atomic with respect to station events.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use waypoint_core::{EndpointId, PlayerId};
use waypoint_protocol::{PlayerRecord, StationMessage};

use crate::pending::PendingSet;
use crate::registry::{Registration, StationRegistry};
use crate::scores::ScoreBoard;

/// Routing table shared between the card loop and the station server.
pub type SharedTable = Arc<Mutex<RoutingTable>>;

/// Station slots, pending records, in-system players and scores.
#[derive(Debug, Default)]
pub struct RoutingTable {
    pub stations: StationRegistry,
    pub pending: PendingSet,
    pub in_system: HashSet<PlayerId>,
    pub scores: ScoreBoard,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh table for sharing.
    pub fn shared() -> SharedTable {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Apply one message received from `endpoint`.
    pub fn apply(&mut self, endpoint: EndpointId, message: StationMessage) {
        match message {
            StationMessage::Registered { stage } => {
                match self.stations.register(endpoint, stage) {
                    Registration::New => {
                        info!(endpoint = %endpoint, stage = %stage, "Station registered");
                    }
                    Registration::Updated { previous } => info!(
                        endpoint = %endpoint,
                        stage = %stage,
                        "Station re-registered (was stage {})",
                        previous
                    ),
                }
            }
            StationMessage::ScoreReported { card, score } => {
                let entry = self.scores.record(card.username, score);
                info!("New score: {}", entry);
            }
            StationMessage::Reset => {
                if !self.stations.set_occupied(&endpoint, false) {
                    warn!(endpoint = %endpoint, "Reset from unregistered station");
                } else {
                    debug!(endpoint = %endpoint, "Station reset");
                }
            }
            StationMessage::PlayerDeparted(record) => self.player_departed(endpoint, record),
        }
    }

    fn player_departed(&mut self, endpoint: EndpointId, record: PlayerRecord) {
        info!(endpoint = %endpoint, "Player left station: {}", record.printable());

        self.in_system.remove(&record.player_id);
        if let Some(previous) = self.pending.insert(record) {
            debug!(player_id = %previous.player_id, "Replaced pending record");
        }
        if !self.stations.set_occupied(&endpoint, false) {
            warn!(endpoint = %endpoint, "Departure from unregistered station");
        }
    }

    /// A station channel opened. Nothing is tracked until it registers.
    pub fn handle_open(&self, endpoint: EndpointId) {
        debug!(endpoint = %endpoint, "Station channel opened");
    }

    /// A station channel closed. Treated like a reset.
    pub fn handle_close(&mut self, endpoint: EndpointId) {
        if self.stations.mark_closed(&endpoint) {
            info!(endpoint = %endpoint, "Station disconnected");
        } else {
            debug!(endpoint = %endpoint, "Unregistered channel closed");
        }
    }

    /// Record that `record` was delivered to `endpoint`.
    pub fn commit_routing(&mut self, endpoint: &EndpointId, record: &PlayerRecord) {
        self.pending.remove(&record.player_id);
        self.stations.set_occupied(endpoint, true);
        self.in_system.insert(record.player_id.clone());
    }

    /// Clear the in-system mark of `player_id`. Returns whether it was set.
    pub fn clear_in_system(&mut self, player_id: &PlayerId) -> bool {
        self.in_system.remove(player_id)
    }

    pub fn is_in_system(&self, player_id: &PlayerId) -> bool {
        self.in_system.contains(player_id)
    }
}
