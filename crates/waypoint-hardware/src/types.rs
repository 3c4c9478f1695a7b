//! Common types shared by card reader transports.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Generic device information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "MSR605X", "Mock Magstripe Reader").
    pub name: String,

    /// USB vendor identifier.
    pub vendor_id: u16,

    /// USB product identifier.
    pub product_id: u16,

    /// Optional device serial number.
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            name: name.into(),
            vendor_id,
            product_id,
            serial_number: None,
        }
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }
}

/// Raw report returned by the device for one outstanding command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse(Bytes);

impl DeviceResponse {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Report bytes, without the report id.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.0
    }

    /// Byte at `index`, if the report is long enough.
    #[must_use]
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("MSR", 0x0801, 0x0003).with_serial_number("A1");
        assert_eq!(info.vendor_id, 0x0801);
        assert_eq!(info.serial_number.as_deref(), Some("A1"));
    }

    #[test]
    fn test_response_byte_access() {
        let response = DeviceResponse::new(vec![0xC5, 0x1B, b'y']);
        assert_eq!(response.byte(2), Some(b'y'));
        assert_eq!(response.byte(3), None);
        assert_eq!(response.len(), 3);
    }
}
