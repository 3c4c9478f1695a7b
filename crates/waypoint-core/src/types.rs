use crate::{
    Result,
    constants::{MAX_PLAYER_ID, MAX_STAGE, PLAYER_ID_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Game stage stored as the first digit of a card record.
///
/// Any single digit is representable; only stages up to [`MAX_STAGE`] have
/// stations. A stage above it marks a player who finished the last stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stage(u8);

impl Stage {
    /// First stage, assigned to freshly formatted cards.
    pub const FIRST: Stage = Stage(0);

    /// Create a stage with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidStage` if the value does not fit in one decimal digit.
    pub fn new(value: u8) -> Result<Self> {
        if value > 9 {
            return Err(Error::InvalidStage(format!(
                "Stage must be a single digit, got {value}"
            )));
        }
        Ok(Stage(value))
    }

    /// Parse a stage from its card digit.
    ///
    /// # Errors
    /// Returns `Error::InvalidStage` if `c` is not an ASCII digit.
    pub fn from_digit(c: char) -> Result<Self> {
        c.to_digit(10)
            .map(|d| Stage(d as u8))
            .ok_or_else(|| Error::InvalidStage(format!("Stage must be a digit, got {c:?}")))
    }

    /// Get the raw stage number.
    #[inline]
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Card digit for this stage.
    #[inline]
    #[must_use]
    pub fn to_digit(self) -> char {
        char::from(b'0' + self.0)
    }

    /// Returns `true` if a station group exists for this stage.
    #[inline]
    #[must_use]
    pub fn is_routable(self) -> bool {
        self.0 <= MAX_STAGE
    }

    /// Iterate over every routable stage in ascending order.
    pub fn routable() -> impl Iterator<Item = Stage> {
        (0..=MAX_STAGE).map(Stage)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Stage {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Stage::new(value)
    }
}

/// Player identifier (3 characters, zero-padded when allocated)
///
/// Two card records belong to the same player iff their ids are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a player id from its card text.
    ///
    /// # Errors
    /// Returns `Error::InvalidPlayerId` if the text is not exactly
    /// `PLAYER_ID_LENGTH` visible ASCII characters.
    pub fn new(id: &str) -> Result<Self> {
        if id.len() != PLAYER_ID_LENGTH {
            return Err(Error::InvalidPlayerId(format!(
                "Player ID must be {PLAYER_ID_LENGTH} chars, got {}",
                id.len()
            )));
        }
        if !id.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::InvalidPlayerId(format!(
                "Player ID must be visible ASCII, got {id:?}"
            )));
        }
        Ok(PlayerId(id.to_string()))
    }

    /// Allocate the id for counter value `n`, zero-padded to three digits.
    ///
    /// # Errors
    /// Returns `Error::CounterExhausted` once `n` no longer fits.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_core::PlayerId;
    ///
    /// assert_eq!(PlayerId::from_counter(7).unwrap().as_str(), "007");
    /// assert!(PlayerId::from_counter(1000).is_err());
    /// ```
    pub fn from_counter(n: u32) -> Result<Self> {
        if n > MAX_PLAYER_ID {
            return Err(Error::CounterExhausted(n));
        }
        Ok(PlayerId(format!("{n:03}")))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PlayerId::new(s)
    }
}

/// Opaque identifier of one connected station channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(Uuid);

impl EndpointId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        EndpointId(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
