use crate::{error::MessageError, record::PlayerRecord};
use std::fmt;
use waypoint_core::{
    Stage,
    constants::{TAG_REGISTER, TAG_RESET, TAG_SCORE},
};

/// Message received from a station terminal.
///
/// The first character selects the variant:
///
/// | Wire | Variant |
/// |------|---------|
/// | `S<digit>` | [`StationMessage::Registered`] |
/// | `H<card>,<score>` | [`StationMessage::ScoreReported`] |
/// | `9` | [`StationMessage::Reset`] |
/// | anything else | [`StationMessage::PlayerDeparted`] |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationMessage {
    /// The station announces the stage group it serves.
    Registered { stage: Stage },
    /// A player finished the final stage with `score`.
    ScoreReported { card: PlayerRecord, score: i64 },
    /// The station is idle again.
    Reset,
    /// A player left the station and awaits routing to `stage`.
    PlayerDeparted(PlayerRecord),
}

impl StationMessage {
    /// Parse one text frame.
    ///
    /// # Errors
    /// Returns `MessageError` if the frame is empty or its body does not
    /// match the tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_protocol::StationMessage;
    ///
    /// let msg = StationMessage::parse("S1").unwrap();
    /// assert!(matches!(msg, StationMessage::Registered { stage } if stage.as_u8() == 1));
    /// assert_eq!(StationMessage::parse("9").unwrap(), StationMessage::Reset);
    /// ```
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let mut chars = text.chars();
        let tag = chars.next().ok_or(MessageError::Empty)?;
        let body = chars.as_str();

        match tag {
            TAG_REGISTER => parse_registration(body),
            TAG_SCORE => parse_score(body),
            TAG_RESET => Ok(StationMessage::Reset),
            _ => Ok(StationMessage::PlayerDeparted(PlayerRecord::decode(text)?)),
        }
    }
}

fn parse_registration(body: &str) -> Result<StationMessage, MessageError> {
    let invalid = || MessageError::InvalidRegistration(format!("{TAG_REGISTER}{body}"));

    let mut digits = body.trim().chars();
    let digit = digits.next().ok_or_else(invalid)?;
    if digits.next().is_some() {
        return Err(invalid());
    }

    let stage = Stage::from_digit(digit).map_err(|_| invalid())?;
    if !stage.is_routable() {
        return Err(invalid());
    }
    Ok(StationMessage::Registered { stage })
}

// Older stations put a separator right after the tag.
fn parse_score(body: &str) -> Result<StationMessage, MessageError> {
    let invalid = || MessageError::InvalidScore(format!("{TAG_SCORE}{body}"));

    let body = body.strip_prefix(',').unwrap_or(body);
    let (card, score) = body.rsplit_once(',').ok_or_else(invalid)?;
    let score = score.trim().parse().map_err(|_| invalid())?;
    let card = PlayerRecord::decode(card)?;

    Ok(StationMessage::ScoreReported { card, score })
}

impl fmt::Display for StationMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StationMessage::Registered { stage } => write!(f, "{TAG_REGISTER}{stage}"),
            StationMessage::ScoreReported { card, score } => {
                write!(f, "{TAG_SCORE}{card},{score}")
            }
            StationMessage::Reset => write!(f, "{TAG_RESET}"),
            StationMessage::PlayerDeparted(record) => write!(f, "{record}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use rstest::rstest;

    #[rstest]
    #[case("S0", 0)]
    #[case("S1", 1)]
    #[case("S2", 2)]
    #[case("S1\n", 1)]
    fn test_parse_registration(#[case] input: &str, #[case] expected: u8) {
        assert_eq!(
            StationMessage::parse(input).unwrap(),
            StationMessage::Registered {
                stage: Stage::new(expected).unwrap()
            }
        );
    }

    #[rstest]
    #[case("S")]
    #[case("Sx")]
    #[case("S12")]
    #[case("S7")]
    fn test_parse_registration_invalid(#[case] input: &str) {
        assert!(matches!(
            StationMessage::parse(input),
            Err(MessageError::InvalidRegistration(_))
        ));
    }

    #[rstest]
    #[case("H3000000000007alice,120")]
    #[case("H,3000000000007alice,120")]
    #[case("H3000000000007alice, 120 ")]
    fn test_parse_score(#[case] input: &str) {
        let StationMessage::ScoreReported { card, score } = StationMessage::parse(input).unwrap()
        else {
            panic!("expected score report");
        };
        assert_eq!(card.username, "alice");
        assert_eq!(card.player_id.as_str(), "007");
        assert_eq!(score, 120);
    }

    #[test]
    fn test_score_username_may_contain_commas() {
        let msg = StationMessage::parse("H3000000000007smith, john,-5").unwrap();
        let StationMessage::ScoreReported { card, score } = msg else {
            panic!("expected score report");
        };
        assert_eq!(card.username, "smith, john");
        assert_eq!(score, -5);
    }

    #[rstest]
    #[case("H3000000000007alice")]
    #[case("H3000000000007alice,lots")]
    fn test_parse_score_invalid(#[case] input: &str) {
        assert!(matches!(
            StationMessage::parse(input),
            Err(MessageError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_parse_score_with_bad_card() {
        assert_eq!(
            StationMessage::parse("Hshort,10"),
            Err(MessageError::Record(DecodeError::TooShort {
                len: 5,
                min: 13
            }))
        );
    }

    #[test]
    fn test_reset_ignores_trailing_text() {
        assert_eq!(StationMessage::parse("9").unwrap(), StationMessage::Reset);
        assert_eq!(StationMessage::parse("9\r\n").unwrap(), StationMessage::Reset);
    }

    #[test]
    fn test_anything_else_is_a_departure() {
        let msg = StationMessage::parse("2011010101007").unwrap();
        let StationMessage::PlayerDeparted(record) = msg else {
            panic!("expected departure");
        };
        assert_eq!(record.stage.as_u8(), 2);
        assert_eq!(record.player_id.as_str(), "007");
    }

    #[test]
    fn test_departure_too_long_for_a_card() {
        let fits = format!("1022222222007{}", "x".repeat(40));
        assert!(matches!(
            StationMessage::parse(&fits),
            Ok(StationMessage::PlayerDeparted(_))
        ));

        let too_long = format!("1022222222007{}", "x".repeat(45));
        assert_eq!(
            StationMessage::parse(&too_long),
            Err(MessageError::Record(DecodeError::TooLong { len: 58, max: 53 }))
        );
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(StationMessage::parse(""), Err(MessageError::Empty));
        assert!(matches!(
            StationMessage::parse("hello"),
            Err(MessageError::Record(_))
        ));
    }

    #[rstest]
    #[case("S1")]
    #[case("9")]
    #[case("H3000000000007alice,120")]
    #[case("1011010101007bob")]
    fn test_display_is_wire_form(#[case] wire: &str) {
        assert_eq!(StationMessage::parse(wire).unwrap().to_string(), wire);
    }
}
