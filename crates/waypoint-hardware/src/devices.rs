//! Enum wrapper for card reader transport dispatch.
//!
//! Native `async fn` in traits (RPITIT) is not object-safe, so
//! `Box<dyn ReportTransport>` is not available. [`AnyTransport`] provides
//! concrete dispatch instead, with backends enabled by feature flags.
//!
//! # Examples
//!
//! ```
//! use waypoint_hardware::devices::AnyTransport;
//! use waypoint_hardware::mock::MockMagstripe;
//! use waypoint_hardware::traits::ReportTransport;
//!
//! let (reader, _handle) = MockMagstripe::new();
//! let transport = AnyTransport::Mock(reader);
//! assert_eq!(transport.info().name, "Mock Magstripe Reader");
//! ```

use crate::error::Result;
use crate::frame::CommandFrame;
use crate::mock::MockMagstripe;
use crate::traits::ReportTransport;
use crate::types::{DeviceInfo, DeviceResponse};

#[cfg(feature = "hardware-hid")]
use crate::hid::HidTransport;

/// Any supported card reader transport.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// In-process simulated reader.
    Mock(MockMagstripe),

    /// Physical reader over USB HID.
    #[cfg(feature = "hardware-hid")]
    Hid(HidTransport),
}

impl ReportTransport for AnyTransport {
    async fn write_feature(&mut self, frame: &CommandFrame) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_feature(frame).await,
            #[cfg(feature = "hardware-hid")]
            Self::Hid(device) => device.write_feature(frame).await,
        }
    }

    async fn next_report(&mut self) -> Result<DeviceResponse> {
        match self {
            Self::Mock(device) => device.next_report().await,
            #[cfg(feature = "hardware-hid")]
            Self::Hid(device) => device.next_report().await,
        }
    }

    fn discard_pending(&mut self) -> usize {
        match self {
            Self::Mock(device) => device.discard_pending(),
            #[cfg(feature = "hardware-hid")]
            Self::Hid(device) => device.discard_pending(),
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
            #[cfg(feature = "hardware-hid")]
            Self::Hid(device) => device.info(),
        }
    }
}

impl From<MockMagstripe> for AnyTransport {
    fn from(device: MockMagstripe) -> Self {
        Self::Mock(device)
    }
}

#[cfg(feature = "hardware-hid")]
impl From<HidTransport> for AnyTransport {
    fn from(device: HidTransport) -> Self {
        Self::Hid(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverConfig;
    use crate::session::CardReaderSession;
    use crate::traits::CardReader;

    #[tokio::test]
    async fn test_any_transport_mock_session() {
        let (reader, handle) = MockMagstripe::new();
        let transport = AnyTransport::from(reader);
        let mut session = CardReaderSession::open(transport, DriverConfig::default())
            .await
            .unwrap();

        handle.swipe("0000000000009").unwrap();
        assert_eq!(session.read_card().await.unwrap(), b"0000000000009");
    }
}
