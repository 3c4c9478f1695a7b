//! Error types for card reader operations.
//!
//! Failures split in two groups. Device construction failures and oversized
//! command frames are fatal to a reader session ([`HardwareError::is_fatal`]);
//! everything else describes a single command and may be retried by the caller.
//! The driver itself never retries.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to the card reader.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No device with the expected vendor/product identifiers is attached.
    #[error("Device not found: {vendor_id:04X}:{product_id:04X}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// The communication self-test returned the wrong sentinel.
    #[error("Self-test failed: expected {expected:#04X}, got {actual:?}")]
    SelfTestFailed { expected: u8, actual: Option<u8> },

    /// No response arrived within the allotted time.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A command does not fit in one feature report.
    #[error("Command frame too long: {len} bytes, max {max}")]
    FrameTooLong { len: usize, max: usize },

    /// The device went away while in use.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// An operation was attempted before `connect` succeeded.
    #[error("Card reader is not connected")]
    NotConnected,

    /// Device communication error.
    #[error("Communication error: {message}")]
    Communication { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new device-not-found error.
    pub fn device_not_found(vendor_id: u16, product_id: u16) -> Self {
        Self::DeviceNotFound {
            vendor_id,
            product_id,
        }
    }

    /// Create a new self-test failure.
    pub fn self_test_failed(expected: u8, actual: Option<u8>) -> Self {
        Self::SelfTestFailed { expected, actual }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new frame-too-long error.
    pub fn frame_too_long(len: usize, max: usize) -> Self {
        Self::FrameTooLong { len, max }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// Returns `true` if the reader session cannot continue after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. }
                | Self::SelfTestFailed { .. }
                | Self::FrameTooLong { .. }
                | Self::Disconnected { .. }
        )
    }

    /// Returns `true` if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_error() {
        let error = HardwareError::device_not_found(0x0801, 0x0003);
        assert_eq!(error.to_string(), "Device not found: 0801:0003");
        assert!(error.is_fatal());
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(2000);
        assert!(error.is_timeout());
        assert!(!error.is_fatal());
        assert_eq!(error.to_string(), "Operation timeout after 2000ms");
    }

    #[test]
    fn test_self_test_error() {
        let error = HardwareError::self_test_failed(b'y', Some(b'n'));
        assert!(matches!(error, HardwareError::SelfTestFailed { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_frame_too_long_is_fatal() {
        let error = HardwareError::frame_too_long(70, 63);
        assert_eq!(error.to_string(), "Command frame too long: 70 bytes, max 63");
        assert!(error.is_fatal());
    }

    #[test]
    fn test_recoverable_errors() {
        let errors = vec![
            HardwareError::NotConnected,
            HardwareError::communication("pipe closed"),
            HardwareError::timeout(10),
        ];

        for error in errors {
            assert!(!error.is_fatal(), "{error} should be recoverable");
        }
    }
}
