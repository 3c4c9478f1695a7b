//! Card routing coordinator.
//!
//! The coordinator owns the card reader and drives one swipe cycle at a time:
//! read the card, validate it (offering to format unreadable cards), match it
//! against the records stations reported, pick a free station of the right
//! stage, write the updated record back to the card and tell the station.
//!
//! ```text
//!  swipe ──► Validating ──bad──► PromptingFormat ──yes──► WritingBack ──┐
//!               │  ▲                                                     │
//!               │  └─────────────────────────────────────────────────────┘
//!               ├─pending──► ResolvingDestination ──► WritingBack ──► Notifying
//!               └─unknown──► PromptingDestination ──► ResolvingDestination
//! ```
//!
//! Station events are applied to the shared [`RoutingTable`] by the network
//! side; the coordinator only locks the table for lookups and commits, never
//! while waiting on the operator.

use std::sync::Arc;

use tracing::{debug, info, warn};
use waypoint_core::{EndpointId, PlayerId, Stage, constants::MAX_STAGE};
use waypoint_hardware::CardReader;
use waypoint_protocol::PlayerRecord;

use crate::counter::PlayerIdCounter;
use crate::error::{Result, RoutingError};
use crate::notifier::StationNotifier;
use crate::operator::Operator;
use crate::state_machine::{PhaseTracker, RoutingPhase};
use crate::table::{RoutingTable, SharedTable};

/// Question asked when a swiped card has no destination yet.
pub const DESTINATION_QUESTION: &str = "What station should I send this player to? (0 to ignore)";

/// Result of one completed swipe cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// The player's card was rewritten and the station notified.
    Routed {
        player_id: PlayerId,
        stage: Stage,
        endpoint: EndpointId,
    },
    /// The operator chose not to route this player.
    Ignored { player_id: PlayerId },
}

/// Drives swipe cycles against one card reader.
pub struct RoutingCoordinator<R, O, C, N> {
    reader: R,
    operator: O,
    counter: C,
    notifier: N,
    table: SharedTable,
    phases: PhaseTracker,
    /// Allocated by a format attempt whose card write failed.
    unwritten_format: Option<PlayerRecord>,
}

impl<R, O, C, N> RoutingCoordinator<R, O, C, N>
where
    R: CardReader,
    O: Operator,
    C: PlayerIdCounter,
    N: StationNotifier,
{
    pub fn new(reader: R, operator: O, counter: C, notifier: N, table: SharedTable) -> Self {
        Self {
            reader,
            operator,
            counter,
            notifier,
            table,
            phases: PhaseTracker::new(),
            unwritten_format: None,
        }
    }

    pub fn table(&self) -> &SharedTable {
        &self.table
    }

    pub fn phases(&self) -> &PhaseTracker {
        &self.phases
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Run one swipe cycle.
    ///
    /// On error the phase tracker returns to `Idle` and the shared table is
    /// left as it was, except for a card that was formatted along the way.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the cycle. Use
    /// [`RoutingError::is_recoverable`] to decide whether to swipe again.
    pub async fn process_card(&mut self) -> Result<RoutingOutcome> {
        let result = self.route_swiped_card().await;
        if result.is_err()
            && let Some(transition) = self.phases.reset()
        {
            debug!("Swipe cycle abandoned in phase {}", transition.from);
        }
        result
    }

    /// Run swipe cycles until one completes, retrying recoverable failures.
    ///
    /// # Errors
    ///
    /// Returns the first failure that is not recoverable.
    pub async fn handle_swipe(&mut self) -> Result<RoutingOutcome> {
        loop {
            match self.process_card().await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_recoverable() => {
                    warn!("Swipe cycle failed: {}", err);
                    self.operator.notice(&err.to_string());
                    self.operator.notice("Retrying...");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Card entry mode: route swiped cards until the reader fails.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the session.
    pub async fn run_entry_mode(&mut self) -> Result<()> {
        info!("Card entry mode started");
        loop {
            match self.handle_swipe().await? {
                RoutingOutcome::Routed {
                    player_id,
                    stage,
                    endpoint,
                } => debug!(
                    player_id = %player_id,
                    stage = %stage,
                    endpoint = %endpoint,
                    "Card routed"
                ),
                RoutingOutcome::Ignored { player_id } => {
                    debug!(player_id = %player_id, "Card ignored")
                }
            }
        }
    }

    /// Formatting mode: turn every swiped card into a fresh record.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the session, including running out of
    /// player ids.
    pub async fn run_formatting_mode(&mut self) -> Result<()> {
        info!("Formatting mode started");
        let mut formatted: u32 = 0;
        loop {
            self.operator.notice("Swipe a card to format...");
            match self.format_card().await {
                Ok(record) => {
                    formatted += 1;
                    info!(player_id = %record.player_id, "Card formatted");
                    self.operator.notice(&format!("Formatted {formatted} cards"));
                }
                Err(RoutingError::Hardware(err)) if err.is_timeout() => {
                    debug!("No card swiped for formatting");
                }
                Err(err @ RoutingError::Counter(_)) => return Err(err),
                Err(err) if err.is_recoverable() => {
                    warn!("Formatting failed: {}", err);
                    self.operator.notice(&err.to_string());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Write a fresh record onto the next swiped card.
    ///
    /// A record whose write failed is reused by the next call, so a missed
    /// swipe does not consume a player id.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::Counter` if no id could be allocated, or the
    /// reader's error.
    pub async fn format_card(&mut self) -> Result<PlayerRecord> {
        let record = match self.unwritten_format.take() {
            Some(record) => record,
            None => PlayerRecord::fresh(self.counter.allocate()?),
        };

        match self.reader.write_card(record.encode().as_bytes()).await {
            Ok(()) => Ok(record),
            Err(err) => {
                self.unwritten_format = Some(record);
                Err(err.into())
            }
        }
    }

    async fn route_swiped_card(&mut self) -> Result<RoutingOutcome> {
        self.operator.notice("Waiting for card swipe...");
        self.phases.transition_to(RoutingPhase::AwaitingSwipe)?;
        let raw = self.await_swipe().await?;

        self.phases.transition_to(RoutingPhase::Validating)?;
        let record = match validate(&raw) {
            Ok(record) => record,
            Err(err) => self.offer_format(err).await?,
        };
        debug!("Swiped card: {}", record.printable());

        let pending = {
            let table = self.table.lock().await;
            table.pending.find(&record.player_id).cloned()
        };

        match pending {
            Some(pending) if pending.stage.is_routable() => {
                self.operator
                    .notice(&format!("Found an incoming card: {}", pending.printable()));
                self.phases.transition_to(RoutingPhase::ResolvingDestination)?;
                self.send_to_station(pending).await
            }
            Some(pending) => {
                self.operator
                    .notice(&format!("Found an incoming card: {}", pending.printable()));
                self.operator
                    .notice("Reached last base. Where should this player go next?");
                self.prompt_destination(record).await
            }
            None => {
                let was_in_system = self.table.lock().await.clear_in_system(&record.player_id);
                if was_in_system {
                    warn!(player_id = %record.player_id, "Card swiped again while in the system");
                    self.operator
                        .notice("This card appears to already be in the system!");
                } else {
                    let missing = RoutingError::NoPendingMatch(record.player_id.clone());
                    self.operator.notice(&missing.to_string());
                }
                self.prompt_destination(record).await
            }
        }
    }

    async fn await_swipe(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.reader.read_card().await {
                Ok(raw) => return Ok(raw),
                Err(err) if err.is_timeout() => debug!("No card swiped, reading again"),
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn offer_format(&mut self, err: RoutingError) -> Result<PlayerRecord> {
        self.phases.transition_to(RoutingPhase::PromptingFormat)?;
        let question = format!("{err}. Format?");
        if !self.operator.confirm(&question).await {
            return Err(RoutingError::OperatorDeclined(format!("format after: {err}")));
        }

        self.phases.transition_to(RoutingPhase::WritingBack)?;
        self.operator.notice("Awaiting card write...");
        let record = self.format_card().await?;
        info!(player_id = %record.player_id, "Formatted unreadable card");

        self.phases.transition_to(RoutingPhase::Validating)?;
        Ok(record)
    }

    async fn prompt_destination(&mut self, record: PlayerRecord) -> Result<RoutingOutcome> {
        self.phases.transition_to(RoutingPhase::PromptingDestination)?;
        let choice = self
            .operator
            .choose(DESTINATION_QUESTION, 0..=MAX_STAGE + 1)
            .await;

        if choice == 0 {
            self.phases.reset();
            info!(player_id = %record.player_id, "Operator chose not to route player");
            return Ok(RoutingOutcome::Ignored {
                player_id: record.player_id,
            });
        }

        let stage = Stage::new(choice - 1)
            .ok()
            .filter(|stage| stage.is_routable())
            .ok_or_else(|| RoutingError::Validation(format!("no base {choice}")))?;
        self.phases.transition_to(RoutingPhase::ResolvingDestination)?;
        self.send_to_station(record.with_stage(stage)).await
    }

    /// Write `record` to the card and hand it to a free station of its stage.
    async fn send_to_station(&mut self, record: PlayerRecord) -> Result<RoutingOutcome> {
        let stage = record.stage;
        let planned = self
            .table
            .lock()
            .await
            .stations
            .first_available(stage)
            .ok_or(RoutingError::NoStationAvailable(stage))?;

        self.operator
            .notice(&format!("Sending to base {}", u16::from(stage.as_u8()) + 1));
        self.operator.notice("Awaiting card write...");
        self.phases.transition_to(RoutingPhase::WritingBack)?;
        let text = record.encode();
        self.reader.write_card(text.as_bytes()).await?;

        self.phases.transition_to(RoutingPhase::Notifying)?;
        let table = Arc::clone(&self.table);
        let mut table = table.lock().await;
        let endpoint = resolve_endpoint(&table, planned, stage)?;
        self.notifier.notify(&endpoint, &text)?;
        table.commit_routing(&endpoint, &record);
        drop(table);

        self.phases.transition_to(RoutingPhase::Idle)?;
        info!(player_id = %record.player_id, stage = %stage, endpoint = %endpoint, "Player routed");
        Ok(RoutingOutcome::Routed {
            player_id: record.player_id,
            stage,
            endpoint,
        })
    }
}

// The table is unlocked while the card is written, so the planned station
// may have been taken or closed meanwhile.
fn resolve_endpoint(table: &RoutingTable, planned: EndpointId, stage: Stage) -> Result<EndpointId> {
    let still_free = table
        .stations
        .get(&planned)
        .is_some_and(|slot| slot.stage == stage && slot.is_available());
    if still_free {
        return Ok(planned);
    }
    warn!(endpoint = %planned, "Planned station went away during card write");
    table
        .stations
        .first_available(stage)
        .ok_or(RoutingError::NoStationAvailable(stage))
}

fn validate(raw: &[u8]) -> Result<PlayerRecord> {
    let record = PlayerRecord::decode_bytes(raw)?;
    if !record.is_valid() {
        return Err(RoutingError::Validation(record.printable()));
    }
    Ok(record)
}
