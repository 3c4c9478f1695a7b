//! Text formats exchanged by the waypoint controller.
//!
//! - [`PlayerRecord`]: the record stored on a player's magnetic stripe card.
//! - [`StationMessage`]: messages received from station terminals.

pub mod error;
pub mod message;
pub mod record;

pub use error::{DecodeError, MessageError};
pub use message::StationMessage;
pub use record::PlayerRecord;
