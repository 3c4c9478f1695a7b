//! Card reader session.
//!
//! A session sequences driver calls into the reader's high-level operations
//! and owns the device exclusively. Opening performs the reader handshake:
//!
//! 1. reset
//! 2. communication self-test (sentinel `'y'` at response offset 2)
//! 3. reset
//! 4. switch to high-coercivity write mode
//!
//! A failed self-test leaves the session closed.

use crate::driver::{DriverConfig, ProtocolDriver};
use crate::error::{HardwareError, Result};
use crate::frame::{
    self, SELF_TEST_OFFSET, SELF_TEST_SENTINEL, extract_card_data, hico_command, read_command,
    reset_command, test_command, write_command,
};
use crate::traits::{CardReader, ReportTransport};
use crate::types::{DeviceInfo, DeviceResponse};
use tracing::{debug, info, warn};

/// Exclusive session on one card reader.
#[derive(Debug)]
pub struct CardReaderSession<T> {
    driver: Option<ProtocolDriver<T>>,
    config: DriverConfig,
}

impl<T: ReportTransport> CardReaderSession<T> {
    /// Create a session that has not opened any device yet.
    pub fn new(config: DriverConfig) -> Self {
        Self {
            driver: None,
            config,
        }
    }

    /// Open `transport` and run the handshake.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn open(transport: T, config: DriverConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.connect(transport).await?;
        Ok(session)
    }

    /// Take ownership of `transport` and run the handshake.
    ///
    /// Any previously opened device is closed first.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::SelfTestFailed` if the device answered the
    /// self-test with the wrong sentinel, or any error from the handshake
    /// commands. The session stays closed on error.
    pub async fn connect(&mut self, transport: T) -> Result<()> {
        self.close();

        let mut driver = ProtocolDriver::new(transport, self.config.clone());
        let info = driver.device_info();
        debug!("Opening card reader {}", info.name);

        driver.send(&reset_command()).await?;
        let response = driver.send_and_wait(&test_command()).await?;
        if !frame::self_test_passed(response.data()) {
            warn!(
                "Card reader {} failed the communication test: {:02X?}",
                info.name,
                response.byte(SELF_TEST_OFFSET)
            );
            return Err(HardwareError::self_test_failed(
                SELF_TEST_SENTINEL,
                response.byte(SELF_TEST_OFFSET),
            ));
        }
        driver.send(&reset_command()).await?;
        driver.send_and_wait(&hico_command()).await?;

        info!(
            device = %info.name,
            vendor_id = info.vendor_id,
            product_id = info.product_id,
            "Card reader connected"
        );
        self.driver = Some(driver);
        Ok(())
    }

    /// Returns `true` once the handshake succeeded.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    /// Information about the open device.
    #[must_use]
    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.driver.as_ref().map(ProtocolDriver::device_info)
    }

    fn driver(&mut self) -> Result<&mut ProtocolDriver<T>> {
        self.driver.as_mut().ok_or(HardwareError::NotConnected)
    }

    /// Return the reader to idle. Does not wait for a response.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::NotConnected` before `connect`, or the
    /// driver's error.
    pub async fn reset(&mut self) -> Result<()> {
        self.driver()?.send(&reset_command()).await
    }

    /// Run the communication self-test.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::NotConnected` before `connect`, or the
    /// driver's error.
    pub async fn self_test(&mut self) -> Result<bool> {
        let response = self.driver()?.send_and_wait(&test_command()).await?;
        Ok(frame::self_test_passed(response.data()))
    }

    /// Wait for a swipe and return the raw card text.
    ///
    /// A swipe timeout resets the reader so it stops waiting for a card.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if nobody swiped in time, or the
    /// driver's error.
    pub async fn read(&mut self) -> Result<Vec<u8>> {
        let timeout = self.config.swipe_timeout;
        let driver = self.driver()?;

        match driver.send_and_wait_timeout(&read_command(), timeout).await {
            Ok(report) => Ok(extract_card_data(report.data())),
            Err(err) if err.is_timeout() => {
                driver.send(&reset_command()).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Write `data` onto the next swiped card and wait for the acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::FrameTooLong` if `data` does not fit, or the
    /// driver's error.
    pub async fn write(&mut self, data: &[u8]) -> Result<DeviceResponse> {
        let timeout = self.config.swipe_timeout;
        let ack = self
            .driver()?
            .send_and_wait_timeout(&write_command(data), timeout)
            .await?;
        debug!(status = ?ack.byte(2), "Card write acknowledged");
        Ok(ack)
    }

    /// Release the device. Closing a session that never opened does nothing.
    pub fn close(&mut self) {
        match self.driver.take() {
            Some(driver) => {
                info!("Closing card reader {}", driver.device_info().name);
                drop(driver.into_transport());
            }
            None => debug!("No card reader was opened, nothing to close"),
        }
    }
}

impl<T: ReportTransport> CardReader for CardReaderSession<T> {
    async fn read_card(&mut self) -> Result<Vec<u8>> {
        self.read().await
    }

    async fn write_card(&mut self, data: &[u8]) -> Result<()> {
        self.write(data).await.map(|_| ())
    }
}
