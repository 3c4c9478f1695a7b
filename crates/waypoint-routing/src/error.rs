//! Error types for the routing layer.
//!
//! Every failure of a swipe cycle is a [`RoutingError`]. The card entry loop
//! asks [`RoutingError::is_recoverable`] whether to print "Retrying..." and
//! start over, or to give up the reader session.

use crate::state_machine::RoutingPhase;
use thiserror::Error;
use waypoint_core::{EndpointId, PlayerId, Stage};
use waypoint_hardware::HardwareError;
use waypoint_protocol::DecodeError;

/// Result type alias for routing operations.
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Failure to deliver a message to a station.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Station {0} is not connected")]
    NotConnected(EndpointId),

    #[error("Station {endpoint} rejected the message: {message}")]
    Rejected { endpoint: EndpointId, message: String },
}

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Error reading card data: {0}")]
    Decode(#[from] DecodeError),

    #[error("Card not setup correctly: {0}")]
    Validation(String),

    #[error("No incoming cards with this player ID: {0}")]
    NoPendingMatch(PlayerId),

    #[error("No available stations for base {}. Please check back later", .0.as_u8() + 1)]
    NoStationAvailable(Stage),

    #[error("Operator declined: {0}")]
    OperatorDeclined(String),

    #[error("Card reader error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Player ID counter error: {0}")]
    Counter(#[from] waypoint_core::Error),

    #[error("Station notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("Invalid routing transition from {from} to {to}")]
    InvalidTransition { from: RoutingPhase, to: RoutingPhase },
}

impl RoutingError {
    /// Returns `true` if the swipe cycle may simply be retried.
    ///
    /// Only reader construction failures, a reader that was never opened,
    /// oversized command frames, a lost device and internal phase violations
    /// end the session.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Hardware(HardwareError::NotConnected) => false,
            Self::Hardware(err) => !err.is_fatal(),
            Self::InvalidTransition { .. } => false,
            _ => true,
        }
    }
}
