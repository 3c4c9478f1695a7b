//! Command framing for the magstripe reader.
//!
//! Every command travels as one 64-byte feature report:
//!
//! ```text
//! [0x00][command bytes ...][0x00 padding ...]
//!  ^ report id placeholder          total = FRAME_LENGTH
//! ```
//!
//! Commands are built from the reader's escape-prefixed opcodes. Reads come
//! back framed between a track start byte and the next escape byte; see
//! [`extract_card_data`].

use crate::error::{HardwareError, Result};
use std::fmt;

/// Size of every outbound feature report, report id included.
pub const FRAME_LENGTH: usize = 64;

/// Largest command that fits next to the report id.
pub const MAX_COMMAND_LENGTH: usize = FRAME_LENGTH - 1;

/// Report id placeholder leading every frame.
pub const REPORT_ID: u8 = 0x00;

/// Header byte of short single-opcode commands.
pub const SHORT_COMMAND: u8 = 0xC2;

/// Header byte of the self-test command.
pub const TEST_COMMAND: u8 = 0xC5;

/// Byte the device answers at [`SELF_TEST_OFFSET`] when the link works.
pub const SELF_TEST_SENTINEL: u8 = b'y';

/// Offset of the self-test sentinel in the response.
pub const SELF_TEST_OFFSET: usize = 2;

/// Reader opcodes.
pub mod opcode {
    pub const RESET: u8 = 0x61;
    pub const ESCAPE: u8 = 0x1B;
    pub const READ: u8 = 0x72;
    pub const WRITE: u8 = 0x77;
    pub const WRITE_S: u8 = 0x73;
    pub const WRITE_RAW: u8 = 0x6E;
    pub const QUESTION: u8 = 0x3F;
    pub const FS: u8 = 0x1C;
    pub const TEST: u8 = 0x65;
    pub const HI_CO: u8 = 0x78;
}

/// Start byte of the first track in a read response.
pub const TRACK_START: u8 = 0x01;

use opcode::*;

/// A padded, ready-to-send feature report.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandFrame([u8; FRAME_LENGTH]);

impl CommandFrame {
    /// Frame `command` behind the report id and zero-pad it.
    ///
    /// # Errors
    /// Returns `HardwareError::FrameTooLong` if `command` exceeds
    /// [`MAX_COMMAND_LENGTH`]. Callers treat this as fatal.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_hardware::frame::{CommandFrame, FRAME_LENGTH};
    ///
    /// let frame = CommandFrame::new(&[0xC2, 0x1B, 0x61]).unwrap();
    /// assert_eq!(frame.as_bytes().len(), FRAME_LENGTH);
    /// assert_eq!(&frame.as_bytes()[..4], &[0x00, 0xC2, 0x1B, 0x61]);
    /// ```
    pub fn new(command: &[u8]) -> Result<Self> {
        if command.len() > MAX_COMMAND_LENGTH {
            return Err(HardwareError::frame_too_long(command.len(), MAX_COMMAND_LENGTH));
        }

        let mut frame = [0u8; FRAME_LENGTH];
        frame[0] = REPORT_ID;
        frame[1..=command.len()].copy_from_slice(command);
        Ok(Self(frame))
    }

    /// Full report, report id included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Report body after the report id.
    #[must_use]
    pub fn command(&self) -> &[u8] {
        &self.0[1..]
    }
}

impl fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(1, |i| i + 1);
        write!(f, "CommandFrame({:02X?})", &self.0[..end])
    }
}

/// Return the device to its idle state.
#[must_use]
pub fn reset_command() -> Vec<u8> {
    vec![SHORT_COMMAND, ESCAPE, RESET]
}

/// Communication self-test.
#[must_use]
pub fn test_command() -> Vec<u8> {
    vec![TEST_COMMAND, ESCAPE, TEST]
}

/// Arm the reader for one swipe.
#[must_use]
pub fn read_command() -> Vec<u8> {
    vec![SHORT_COMMAND, ESCAPE, READ]
}

/// Switch the writer head to high coercivity.
#[must_use]
pub fn hico_command() -> Vec<u8> {
    vec![SHORT_COMMAND, ESCAPE, HI_CO]
}

/// Bytes [`write_command`] adds around the card data.
pub const WRITE_FRAMING_LENGTH: usize = 10;

/// Write `data` to the first track of the next swiped card.
#[must_use]
pub fn write_command(data: &[u8]) -> Vec<u8> {
    let mut command = Vec::with_capacity(data.len() + WRITE_FRAMING_LENGTH);
    command.extend_from_slice(&[ESCAPE, RESET, ESCAPE, WRITE]);
    command.extend_from_slice(&[ESCAPE, WRITE_S, ESCAPE, TRACK_START]);
    command.extend_from_slice(data);
    command.extend_from_slice(&[QUESTION, FS]);
    command
}

/// Pull the card text out of a read response.
///
/// Drops everything up to and including the track start byte and the start
/// sentinel after it, stops at the next escape byte, and drops the end
/// sentinel in front of it. Returns an empty vector if the framing is absent.
///
/// # Examples
///
/// ```
/// use waypoint_hardware::frame::extract_card_data;
///
/// let report = [0x1B, b's', 0x1B, 0x01, b'%', b'0', b'4', b'2', b'?', 0x1B, b'0'];
/// assert_eq!(extract_card_data(&report), b"042");
/// ```
#[must_use]
pub fn extract_card_data(report: &[u8]) -> Vec<u8> {
    let Some(start) = report.iter().position(|&b| b == TRACK_START) else {
        return Vec::new();
    };

    let track = report.get(start + 2..).unwrap_or_default();
    let end = track.iter().position(|&b| b == ESCAPE).unwrap_or(track.len());
    track[..end.saturating_sub(1)].to_vec()
}

/// Returns `true` if a self-test response carries the expected sentinel.
#[must_use]
pub fn self_test_passed(response: &[u8]) -> bool {
    response.get(SELF_TEST_OFFSET) == Some(&SELF_TEST_SENTINEL)
}
