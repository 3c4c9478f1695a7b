//! Routing phase tracking.
//!
//! Every swipe cycle walks the coordinator through a fixed set of phases,
//! from waiting for a swipe to notifying the chosen station. The tracker
//! validates each step and keeps a bounded history for diagnostics.
//!
//! # Valid Transitions
//!
//! - Idle → AwaitingSwipe → Validating
//! - Validating → ResolvingDestination | PromptingFormat | PromptingDestination
//! - PromptingFormat → WritingBack → Validating (freshly formatted card)
//! - PromptingDestination → ResolvingDestination
//! - ResolvingDestination → WritingBack | PromptingDestination
//! - WritingBack → Notifying → Idle
//!
//! Failures and declined prompts leave through [`PhaseTracker::reset`].
//!
//! # Examples
//!
//! ```
//! use waypoint_routing::{PhaseTracker, RoutingPhase};
//!
//! let mut phases = PhaseTracker::new();
//! phases.transition_to(RoutingPhase::AwaitingSwipe).unwrap();
//! phases.transition_to(RoutingPhase::Validating).unwrap();
//! assert!(phases.transition_to(RoutingPhase::Notifying).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};

/// Maximum number of phase transitions to keep in history.
///
/// A routed card takes six to eight transitions, so this covers the last
/// dozen swipes or so.
const MAX_HISTORY_SIZE: usize = 100;

/// Phase of the card routing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPhase {
    /// Between swipes.
    Idle,

    /// Read command issued, waiting for a card.
    AwaitingSwipe,

    /// Decoding and validating the card text.
    Validating,

    /// Looking for a free station of the target stage.
    ResolvingDestination,

    /// Asking the operator whether to format an unreadable card.
    PromptingFormat,

    /// Asking the operator where to send the player.
    PromptingDestination,

    /// Writing the updated record back onto the card.
    WritingBack,

    /// Sending the record to the chosen station.
    Notifying,
}

impl fmt::Display for RoutingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoutingPhase::Idle => "Idle",
            RoutingPhase::AwaitingSwipe => "AwaitingSwipe",
            RoutingPhase::Validating => "Validating",
            RoutingPhase::ResolvingDestination => "ResolvingDestination",
            RoutingPhase::PromptingFormat => "PromptingFormat",
            RoutingPhase::PromptingDestination => "PromptingDestination",
            RoutingPhase::WritingBack => "WritingBack",
            RoutingPhase::Notifying => "Notifying",
        };
        write!(f, "{}", name)
    }
}

impl RoutingPhase {
    /// Check if moving to `target` is a legal step from this phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_routing::RoutingPhase;
    ///
    /// assert!(RoutingPhase::Idle.can_transition_to(&RoutingPhase::AwaitingSwipe));
    /// assert!(!RoutingPhase::Idle.can_transition_to(&RoutingPhase::WritingBack));
    /// ```
    pub fn can_transition_to(&self, target: &RoutingPhase) -> bool {
        use RoutingPhase::*;

        matches!(
            (self, target),
            (Idle, AwaitingSwipe)
                | (AwaitingSwipe, Validating)
                | (
                    Validating,
                    ResolvingDestination | PromptingFormat | PromptingDestination
                )
                | (PromptingFormat, WritingBack)
                | (PromptingDestination, ResolvingDestination)
                | (ResolvingDestination, WritingBack | PromptingDestination)
                | (WritingBack, Notifying | Validating)
                | (Notifying, Idle)
        )
    }

    /// Returns `true` while the coordinator waits on the operator.
    pub fn is_prompting(&self) -> bool {
        matches!(
            self,
            RoutingPhase::PromptingFormat | RoutingPhase::PromptingDestination
        )
    }
}

/// A single phase transition with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: RoutingPhase,
    pub to: RoutingPhase,

    /// Not serialized; set to the deserialization time when read back.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl PhaseTransition {
    pub fn new(from: RoutingPhase, to: RoutingPhase) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Time since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Tracks the current routing phase and recent transitions.
///
/// Not thread-safe; the coordinator owns its tracker exclusively.
#[derive(Debug)]
pub struct PhaseTracker {
    current: RoutingPhase,
    entered_at: Instant,
    history: VecDeque<PhaseTransition>,
}

impl PhaseTracker {
    /// Create a tracker in the `Idle` phase.
    pub fn new() -> Self {
        Self {
            current: RoutingPhase::Idle,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current(&self) -> RoutingPhase {
        self.current
    }

    /// Time spent in the current phase.
    pub fn time_in_current_phase(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<PhaseTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<PhaseTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Move to `next`, validating the step.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::InvalidTransition` if the step is not allowed
    /// from the current phase. The phase is left unchanged.
    pub fn transition_to(&mut self, next: RoutingPhase) -> Result<PhaseTransition> {
        if !self.current.can_transition_to(&next) {
            return Err(RoutingError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }

        let transition = PhaseTransition::new(self.current, next);
        self.enter(next, transition.clone());
        Ok(transition)
    }

    /// Return to `Idle` from any phase. A no-op when already idle.
    pub fn reset(&mut self) -> Option<PhaseTransition> {
        if self.current == RoutingPhase::Idle {
            return None;
        }
        let transition = PhaseTransition::new(self.current, RoutingPhase::Idle);
        self.enter(RoutingPhase::Idle, transition.clone());
        Some(transition)
    }

    fn enter(&mut self, phase: RoutingPhase, transition: PhaseTransition) {
        self.current = phase;
        self.entered_at = Instant::now();
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RoutingPhase::*;
    use rstest::rstest;

    fn walk(path: &[RoutingPhase]) -> PhaseTracker {
        let mut tracker = PhaseTracker::new();
        for phase in path {
            tracker.transition_to(*phase).unwrap();
        }
        tracker
    }

    #[test]
    fn test_new_tracker_starts_idle() {
        let tracker = PhaseTracker::new();
        assert_eq!(tracker.current(), Idle);
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_pending_match_path() {
        let tracker = walk(&[
            AwaitingSwipe,
            Validating,
            ResolvingDestination,
            WritingBack,
            Notifying,
            Idle,
        ]);
        assert_eq!(tracker.current(), Idle);
        assert_eq!(tracker.history().len(), 6);
    }

    #[test]
    fn test_format_then_prompt_path() {
        let tracker = walk(&[
            AwaitingSwipe,
            Validating,
            PromptingFormat,
            WritingBack,
            Validating,
            PromptingDestination,
            ResolvingDestination,
            WritingBack,
            Notifying,
        ]);
        assert_eq!(tracker.current(), Notifying);
    }

    #[rstest]
    #[case(Idle, Validating)]
    #[case(AwaitingSwipe, WritingBack)]
    #[case(PromptingFormat, Notifying)]
    #[case(Notifying, AwaitingSwipe)]
    #[case(Idle, Idle)]
    fn test_invalid_transitions(#[case] from: RoutingPhase, #[case] to: RoutingPhase) {
        assert!(!from.can_transition_to(&to));
    }

    #[test]
    fn test_invalid_transition_leaves_phase() {
        let mut tracker = walk(&[AwaitingSwipe]);
        let err = tracker.transition_to(Notifying).unwrap_err();
        assert!(matches!(
            err,
            RoutingError::InvalidTransition {
                from: AwaitingSwipe,
                to: Notifying
            }
        ));
        assert_eq!(tracker.current(), AwaitingSwipe);
    }

    #[test]
    fn test_reset_from_any_phase() {
        let mut tracker = walk(&[AwaitingSwipe, Validating, PromptingFormat]);
        let transition = tracker.reset().unwrap();
        assert_eq!(transition.from, PromptingFormat);
        assert_eq!(tracker.current(), Idle);
        assert!(tracker.reset().is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = PhaseTracker::new();
        for _ in 0..MAX_HISTORY_SIZE {
            tracker.transition_to(AwaitingSwipe).unwrap();
            tracker.reset();
        }
        assert_eq!(tracker.history().len(), MAX_HISTORY_SIZE);
        assert_eq!(tracker.last_transitions(2).len(), 2);
        assert_eq!(tracker.last_transitions(2)[1].to, Idle);
    }

    #[test]
    fn test_prompting_phases() {
        assert!(PromptingFormat.is_prompting());
        assert!(PromptingDestination.is_prompting());
        assert!(!WritingBack.is_prompting());
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&ResolvingDestination).unwrap();
        assert_eq!(json, "\"resolving_destination\"");
    }
}
