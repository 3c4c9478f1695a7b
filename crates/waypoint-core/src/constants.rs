//! Core constants for the waypoint routing controller.
//!
//! This module centralizes the fixed values shared by the card payload codec,
//! the card reader driver and the station protocol. Changing any of them breaks
//! compatibility with cards already in circulation or with deployed stations.
//!
//! # Card Layout
//!
//! A formatted card carries a single ASCII record:
//!
//! ```text
//! <stage:1><payload:9><player_id:3><username:*>
//! ```
//!
//! | Field | Width | Example |
//! |-------|-------|---------|
//! | stage | [`STAGE_LENGTH`] | `0` |
//! | payload | [`PAYLOAD_LENGTH`] | `000000000` |
//! | player id | [`PLAYER_ID_LENGTH`] | `007` |
//! | username | remainder, up to [`MAX_RECORD_LENGTH`] in total | `alice` |
//!
//! # Usage
//!
//! ```
//! use waypoint_core::constants::*;
//!
//! assert_eq!(MIN_RECORD_LENGTH, STAGE_LENGTH + PAYLOAD_LENGTH + PLAYER_ID_LENGTH);
//! assert!(MIN_RECORD_LENGTH < MAX_RECORD_LENGTH);
//! assert!(MAX_STAGE < 10);
//! ```

// ============================================================================
// Card Layout
// ============================================================================

/// Width of the stage digit at the start of a card record.
pub const STAGE_LENGTH: usize = 1;

/// Width of the opaque ship/progress payload block.
pub const PAYLOAD_LENGTH: usize = 9;

/// Width of the zero-padded numeric player identifier.
pub const PLAYER_ID_LENGTH: usize = 3;

/// Shortest valid record: stage, payload and player id with an empty username.
pub const MIN_RECORD_LENGTH: usize = STAGE_LENGTH + PAYLOAD_LENGTH + PLAYER_ID_LENGTH;

/// Longest record the reader can write in one command.
///
/// A write command wraps the record in 10 framing bytes and must fit the
/// 63 command bytes of a report, which leaves 53 characters of record and
/// 40 of username.
pub const MAX_RECORD_LENGTH: usize = 53;

/// Fill character of a freshly formatted payload block.
pub const PAYLOAD_FILL: char = '0';

/// Highest player id representable in [`PLAYER_ID_LENGTH`] digits.
pub const MAX_PLAYER_ID: u32 = 999;

// ============================================================================
// Stages
// ============================================================================

/// Index of the last stage a player can be routed to.
///
/// Stages are zero-based; the installation has `MAX_STAGE + 1` stations
/// groups. A card whose stage is greater than this value belongs to a player
/// who has completed the final stage.
///
/// # Examples
///
/// ```
/// use waypoint_core::constants::MAX_STAGE;
///
/// let stage_groups: Vec<u8> = (0..=MAX_STAGE).collect();
/// assert_eq!(stage_groups, vec![0, 1, 2]);
/// ```
pub const MAX_STAGE: u8 = 2;

// ============================================================================
// Card Reader
// ============================================================================

/// USB vendor id of the magnetic stripe reader.
pub const READER_VENDOR_ID: u16 = 0x0801;

/// USB product id of the magnetic stripe reader.
pub const READER_PRODUCT_ID: u16 = 0x0003;

/// Default wait for a single command response, in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2000;

/// Default wait for a player to swipe a card, in milliseconds.
pub const DEFAULT_SWIPE_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// Station Protocol
// ============================================================================

/// Tag of a station registration message (`S<stage>`).
pub const TAG_REGISTER: char = 'S';

/// Tag of a score report message (`H<card>,<score>`).
pub const TAG_SCORE: char = 'H';

/// Tag of a station reset message (`9`).
pub const TAG_RESET: char = '9';

/// Default port of the station WebSocket server.
pub const DEFAULT_STATION_PORT: u16 = 8000;

/// Default request path stations connect to.
pub const DEFAULT_STATION_PATH: &str = "/Station";

// ============================================================================
// Persistence
// ============================================================================

/// Default file holding the next player id.
pub const DEFAULT_COUNTER_FILE: &str = "config.txt";
