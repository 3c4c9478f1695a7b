//! Magnetic stripe card reader access for the waypoint controller.
//!
//! The crate is layered bottom-up:
//!
//! - [`frame`]: command byte sequences and 64-byte feature-report framing
//! - [`driver`]: one command, one response, bounded by a timeout
//! - [`session`]: connect handshake and the read/write/reset/self-test
//!   operations, exposed to the routing layer through [`CardReader`]
//! - transports: [`mock::MockMagstripe`] in-process, and `hid::HidTransport`
//!   behind the `hardware-hid` feature
//!
//! # Example
//!
//! ```
//! use waypoint_hardware::{CardReader, CardReaderSession, DriverConfig};
//! use waypoint_hardware::mock::MockMagstripe;
//!
//! #[tokio::main]
//! async fn main() -> waypoint_hardware::Result<()> {
//!     let (reader, handle) = MockMagstripe::new();
//!     let mut session = CardReaderSession::open(reader, DriverConfig::default()).await?;
//!
//!     session.write_card(b"0000000000001").await?;
//!     assert_eq!(handle.written_cards(), vec!["0000000000001"]);
//!
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod driver;
pub mod error;
pub mod frame;
#[cfg(feature = "hardware-hid")]
pub mod hid;
pub mod mock;
pub mod session;
pub mod traits;
pub mod types;

pub use devices::AnyTransport;
pub use driver::{DriverConfig, ProtocolDriver};
pub use error::{HardwareError, Result};
pub use session::CardReaderSession;
pub use traits::{CardReader, ReportTransport};
pub use types::{DeviceInfo, DeviceResponse};

#[cfg(feature = "hardware-hid")]
pub use hid::{HidConfig, HidTransport};
