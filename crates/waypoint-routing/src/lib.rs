//! Routing layer of the waypoint controller.
//!
//! Decides where a swiped player goes next. The [`RoutingCoordinator`] owns
//! the card reader; station events land in the shared [`RoutingTable`].
//! Console prompts, station delivery and id persistence are injected through
//! [`Operator`], [`StationNotifier`] and [`PlayerIdCounter`].

pub mod coordinator;
pub mod counter;
pub mod error;
pub mod notifier;
pub mod operator;
pub mod pending;
pub mod registry;
pub mod scores;
pub mod state_machine;
pub mod table;

pub use coordinator::{DESTINATION_QUESTION, RoutingCoordinator, RoutingOutcome};
pub use counter::{FileCounter, MemoryCounter, PlayerIdCounter};
pub use error::{NotifyError, Result, RoutingError};
pub use notifier::{RecordingNotifier, StationNotifier};
pub use operator::{Operator, ScriptedOperator};
pub use pending::PendingSet;
pub use registry::{Registration, StationRegistry, StationSlot};
pub use scores::{Score, ScoreBoard};
pub use state_machine::{PhaseTracker, PhaseTransition, RoutingPhase};
pub use table::{RoutingTable, SharedTable};
