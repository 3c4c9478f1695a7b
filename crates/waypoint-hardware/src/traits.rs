//! Card reader trait definitions.
//!
//! Two seams separate the stack:
//!
//! - [`ReportTransport`] moves raw feature reports to and from one device.
//!   The USB HID backend and the mock reader implement it.
//! - [`CardReader`] is what the routing layer consumes: read the card text of
//!   the next swipe, write card text back.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::frame::CommandFrame;
use crate::types::{DeviceInfo, DeviceResponse};

/// Raw report channel to a single device.
///
/// Responses arrive asynchronously; the transport buffers them until
/// [`next_report`](ReportTransport::next_report) or
/// [`discard_pending`](ReportTransport::discard_pending) consumes them.
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generics or [`AnyTransport`](crate::devices::AnyTransport).
pub trait ReportTransport: Send {
    /// Send one framed command as a feature report.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejected the report or is gone.
    async fn write_feature(&mut self, frame: &CommandFrame) -> Result<()>;

    /// Wait for the next response report.
    ///
    /// Waits indefinitely; callers bound the wait with a timeout. Must be
    /// cancel safe: dropping the future loses no report.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disconnected` once the device is gone.
    async fn next_report(&mut self) -> Result<DeviceResponse>;

    /// Drop every buffered response, returning how many were dropped.
    fn discard_pending(&mut self) -> usize;

    /// Static information about the device.
    fn info(&self) -> DeviceInfo;
}

/// High-level card access used by the routing coordinator.
///
/// # Examples
///
/// ```no_run
/// use waypoint_hardware::traits::CardReader;
/// use waypoint_hardware::error::Result;
///
/// async fn copy_card<R: CardReader>(reader: &mut R) -> Result<()> {
///     let text = reader.read_card().await?;
///     reader.write_card(&text).await
/// }
/// ```
pub trait CardReader: Send {
    /// Wait for a swipe and return the card text.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if nobody swiped in time, or any
    /// device error.
    async fn read_card(&mut self) -> Result<Vec<u8>>;

    /// Write `data` onto the next swiped card.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::FrameTooLong` if `data` cannot fit in one
    /// command, or any device error.
    async fn write_card(&mut self, data: &[u8]) -> Result<()>;
}
