use crate::error::{DecodeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use waypoint_core::{
    PlayerId, Stage,
    constants::{
        MAX_RECORD_LENGTH, MIN_RECORD_LENGTH, PAYLOAD_FILL, PAYLOAD_LENGTH, PLAYER_ID_LENGTH,
        STAGE_LENGTH,
    },
};

/// Player state stored on a magnetic stripe card.
///
/// The card text is the flat concatenation
/// `stage ++ payload ++ player_id ++ username`. Equality compares every
/// field; use [`PlayerRecord::same_player`] to compare identities.
///
/// # Examples
///
/// ```
/// use waypoint_protocol::PlayerRecord;
///
/// let record = PlayerRecord::decode("1011010101007alice").unwrap();
/// assert_eq!(record.stage.as_u8(), 1);
/// assert_eq!(record.payload, "011010101");
/// assert_eq!(record.player_id.as_str(), "007");
/// assert_eq!(record.username, "alice");
/// assert_eq!(record.encode(), "1011010101007alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub stage: Stage,
    /// Opaque ship/progress block, always `PAYLOAD_LENGTH` characters.
    pub payload: String,
    pub player_id: PlayerId,
    pub username: String,
}

impl PlayerRecord {
    /// Record written onto a freshly formatted card.
    #[must_use]
    pub fn fresh(player_id: PlayerId) -> Self {
        PlayerRecord {
            stage: Stage::FIRST,
            payload: PAYLOAD_FILL.to_string().repeat(PAYLOAD_LENGTH),
            player_id,
            username: String::new(),
        }
    }

    /// Decode a record from card text.
    ///
    /// # Errors
    /// - `DecodeError::NotAscii` if the text contains non-ASCII characters
    /// - `DecodeError::TooShort` if the fixed-width fields do not fit
    /// - `DecodeError::TooLong` if the record would not fit a card write
    /// - `DecodeError::InvalidStage` if the first character is not a digit
    /// - `DecodeError::InvalidPlayerId` if the id field is not printable
    pub fn decode(text: &str) -> Result<Self> {
        if !text.is_ascii() {
            return Err(DecodeError::NotAscii);
        }
        if text.len() < MIN_RECORD_LENGTH {
            return Err(DecodeError::TooShort {
                len: text.len(),
                min: MIN_RECORD_LENGTH,
            });
        }
        if text.len() > MAX_RECORD_LENGTH {
            return Err(DecodeError::TooLong {
                len: text.len(),
                max: MAX_RECORD_LENGTH,
            });
        }

        let (stage, rest) = text.split_at(STAGE_LENGTH);
        let (payload, rest) = rest.split_at(PAYLOAD_LENGTH);
        let (player_id, username) = rest.split_at(PLAYER_ID_LENGTH);

        let stage_digit = stage.chars().next().unwrap_or_default();
        let stage =
            Stage::from_digit(stage_digit).map_err(|_| DecodeError::InvalidStage(stage_digit))?;
        let player_id = PlayerId::new(player_id)
            .map_err(|_| DecodeError::InvalidPlayerId(player_id.to_string()))?;

        Ok(PlayerRecord {
            stage,
            payload: payload.to_string(),
            player_id,
            username: username.to_string(),
        })
    }

    /// Decode a record from the raw bytes read off a card.
    ///
    /// # Errors
    /// Same as [`PlayerRecord::decode`].
    pub fn decode_bytes(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|_| DecodeError::NotAscii)?;
        Self::decode(text)
    }

    /// Serialize the record to card text.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(MIN_RECORD_LENGTH + self.username.len());
        out.push(self.stage.to_digit());
        out.push_str(&self.payload);
        out.push_str(self.player_id.as_str());
        out.push_str(&self.username);
        out
    }

    /// Returns `true` if the record can be routed.
    ///
    /// Payload and id must be present and the stage must have stations.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.payload.is_empty() && !self.player_id.as_str().is_empty() && self.stage.is_routable()
    }

    /// Returns `true` if both records describe the same player.
    #[must_use]
    pub fn same_player(&self, other: &PlayerRecord) -> bool {
        self.player_id == other.player_id
    }

    /// Copy of the record redirected to `stage`.
    #[must_use]
    pub fn with_stage(&self, stage: Stage) -> Self {
        PlayerRecord {
            stage,
            ..self.clone()
        }
    }

    /// Operator-facing summary. Stages are shown one-based as bases.
    #[must_use]
    pub fn printable(&self) -> String {
        format!(
            "Base: {}, ShipData: {}, PlayerId: {}, Username: {}",
            u16::from(self.stage.as_u8()) + 1,
            self.payload,
            self.player_id,
            self.username
        )
    }
}

impl fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl std::str::FromStr for PlayerRecord {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self> {
        PlayerRecord::decode(s)
    }
}
