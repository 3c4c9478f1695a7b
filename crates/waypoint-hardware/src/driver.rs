//! Device protocol driver.
//!
//! The driver owns a [`ReportTransport`] and turns command byte sequences into
//! framed feature reports. [`ProtocolDriver::send_and_wait`] pairs each command
//! with exactly one response:
//!
//! 1. stale responses left over from earlier commands are dropped,
//! 2. the framed command is written,
//! 3. the first response is awaited, bounded by a timeout,
//! 4. after a short settle delay any further responses are dropped.
//!
//! The driver never retries; retry policy belongs to the caller.

use crate::error::{HardwareError, Result};
use crate::frame::CommandFrame;
use crate::traits::ReportTransport;
use crate::types::{DeviceInfo, DeviceResponse};
use std::time::Duration;
use tracing::{trace, warn};
use waypoint_core::constants::{DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_SWIPE_TIMEOUT_MS};

/// Default pause between the first response and consuming it.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2;

/// Driver timing configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum wait for a command response.
    pub command_timeout: Duration,

    /// Maximum wait for commands that need a card swiped (read, write).
    pub swipe_timeout: Duration,

    /// Pause after the first response before trailing responses are dropped.
    pub settle_delay: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            swipe_timeout: Duration::from_millis(DEFAULT_SWIPE_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }
}

/// Frames commands and pairs them with device responses.
#[derive(Debug)]
pub struct ProtocolDriver<T> {
    transport: T,
    config: DriverConfig,
}

impl<T: ReportTransport> ProtocolDriver<T> {
    pub fn new(transport: T, config: DriverConfig) -> Self {
        Self { transport, config }
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        self.transport.info()
    }

    /// Send a command without waiting for a response.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::FrameTooLong` if the command does not fit in
    /// one report, or the transport's write error.
    pub async fn send(&mut self, command: &[u8]) -> Result<()> {
        let frame = CommandFrame::new(command)?;

        let stale = self.transport.discard_pending();
        if stale > 0 {
            trace!(stale, "Dropped stale responses before command");
        }

        trace!(?frame, "Sending command");
        self.transport.write_feature(&frame).await
    }

    /// Send a command and wait for its response, using the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`send_and_wait_timeout`](Self::send_and_wait_timeout).
    pub async fn send_and_wait(&mut self, command: &[u8]) -> Result<DeviceResponse> {
        let timeout = self.config.command_timeout;
        self.send_and_wait_timeout(command, timeout).await
    }

    /// Send a command and wait up to `timeout` for its response.
    ///
    /// # Errors
    ///
    /// - `HardwareError::Timeout` if no response arrived in time
    /// - `HardwareError::FrameTooLong` if the command does not fit
    /// - `HardwareError::Disconnected` if the device went away
    pub async fn send_and_wait_timeout(
        &mut self,
        command: &[u8],
        timeout: Duration,
    ) -> Result<DeviceResponse> {
        self.send(command).await?;

        let response = tokio::time::timeout(timeout, self.transport.next_report())
            .await
            .map_err(|_| HardwareError::timeout(timeout.as_millis() as u64))??;

        tokio::time::sleep(self.config.settle_delay).await;

        let extra = self.transport.discard_pending();
        if extra > 0 {
            warn!(extra, "Device sent more than one response, extras dropped");
        }

        trace!(len = response.len(), "Received response");
        Ok(response)
    }

    /// Give the transport back, closing the driver.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{hico_command, read_command, reset_command, test_command};
    use crate::mock::MockMagstripe;

    fn fast_config() -> DriverConfig {
        DriverConfig {
            command_timeout: Duration::from_millis(50),
            swipe_timeout: Duration::from_millis(50),
            settle_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_send_writes_framed_command() {
        let (reader, handle) = MockMagstripe::new();
        let mut driver = ProtocolDriver::new(reader, fast_config());

        driver.send(&reset_command()).await.unwrap();

        assert_eq!(handle.commands(), vec![reset_command()]);
    }

    #[tokio::test]
    async fn test_send_and_wait_returns_response() {
        let (reader, _handle) = MockMagstripe::new();
        let mut driver = ProtocolDriver::new(reader, fast_config());

        let response = driver.send_and_wait(&test_command()).await.unwrap();
        assert_eq!(response.byte(2), Some(b'y'));
    }

    #[tokio::test]
    async fn test_send_and_wait_times_out() {
        let (reader, handle) = MockMagstripe::new();
        handle.set_silent(true);
        let mut driver = ProtocolDriver::new(reader, fast_config());

        let err = driver.send_and_wait(&hico_command()).await.unwrap_err();
        assert!(matches!(err, HardwareError::Timeout { duration_ms: 50 }));
    }

    #[tokio::test]
    async fn test_extra_responses_are_discarded() {
        let (reader, handle) = MockMagstripe::new();
        handle.set_duplicate_responses(true);
        let mut driver = ProtocolDriver::new(reader, fast_config());

        let first = driver.send_and_wait(&test_command()).await.unwrap();
        let second = driver.send_and_wait(&hico_command()).await.unwrap();

        assert_eq!(first.byte(2), Some(b'y'));
        // Would be the duplicated self-test answer if extras leaked through.
        assert_eq!(second.byte(2), Some(b'0'));
    }

    #[tokio::test]
    async fn test_oversized_command_never_reaches_device() {
        let (reader, handle) = MockMagstripe::new();
        let mut driver = ProtocolDriver::new(reader, fast_config());

        let err = driver.send(&[0u8; 80]).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(handle.commands().is_empty());
    }

    #[tokio::test]
    async fn test_read_times_out_without_swipe() {
        let (reader, _handle) = MockMagstripe::new();
        let mut driver = ProtocolDriver::new(reader, fast_config());

        let err = driver
            .send_and_wait_timeout(&read_command(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
