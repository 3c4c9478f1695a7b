//! USB HID backend for the physical magstripe reader.
//!
//! The `hidapi` device handle lives on a dedicated worker thread. The thread
//! alternates between servicing queued feature-report writes and polling for
//! input reports with a short read timeout; every input report is handed to
//! the async side over a channel. When the read fails the device is gone: the
//! worker logs the detach and exits, and the transport reports
//! `HardwareError::Disconnected` from then on.

use crate::error::{HardwareError, Result};
use crate::frame::CommandFrame;
use crate::traits::ReportTransport;
use crate::types::{DeviceInfo, DeviceResponse};
use hidapi::{HidApi, HidDevice};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use waypoint_core::constants::{READER_PRODUCT_ID, READER_VENDOR_ID};

/// Size of one input report.
const REPORT_LENGTH: usize = 64;

/// HID backend configuration.
#[derive(Debug, Clone)]
pub struct HidConfig {
    pub vendor_id: u16,
    pub product_id: u16,

    /// Read timeout of one poll on the worker thread, in milliseconds.
    pub poll_interval_ms: i32,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            vendor_id: READER_VENDOR_ID,
            product_id: READER_PRODUCT_ID,
            poll_interval_ms: 2,
        }
    }
}

enum Request {
    Write(Vec<u8>, oneshot::Sender<Result<()>>),
    Stop,
}

/// Feature-report transport over `hidapi`.
#[derive(Debug)]
pub struct HidTransport {
    requests: std_mpsc::Sender<Request>,
    reports: mpsc::UnboundedReceiver<DeviceResponse>,
    worker: Option<JoinHandle<()>>,
    info: DeviceInfo,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Write(data, _) => write!(f, "Write({} bytes)", data.len()),
            Request::Stop => write!(f, "Stop"),
        }
    }
}

impl HidTransport {
    /// Locate the reader by vendor/product id and start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::DeviceNotFound` if no matching device is
    /// attached, `HardwareError::Communication` if it cannot be opened.
    pub fn open(config: HidConfig) -> Result<Self> {
        let (requests, request_rx) = std_mpsc::channel();
        let (report_tx, reports) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let worker = thread::Builder::new()
            .name("hid-card-reader".to_string())
            .spawn(move || {
                let device = match open_device(&config) {
                    Ok((device, info)) => {
                        let _ = ready_tx.send(Ok(info));
                        device
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                run_worker(&device, config.poll_interval_ms, &request_rx, &report_tx);
            })?;

        let info = ready_rx
            .recv()
            .map_err(|_| HardwareError::communication("HID worker exited during open"))??;

        info!(
            "Opened card reader {} ({:04X}:{:04X})",
            info.name, info.vendor_id, info.product_id
        );
        Ok(Self {
            requests,
            reports,
            worker: Some(worker),
            info,
        })
    }
}

fn open_device(config: &HidConfig) -> Result<(HidDevice, DeviceInfo)> {
    let api = HidApi::new().map_err(|e| HardwareError::communication(e.to_string()))?;

    let present = api
        .device_list()
        .any(|d| d.vendor_id() == config.vendor_id && d.product_id() == config.product_id);
    if !present {
        return Err(HardwareError::device_not_found(
            config.vendor_id,
            config.product_id,
        ));
    }

    let device = api
        .open(config.vendor_id, config.product_id)
        .map_err(|e| HardwareError::communication(e.to_string()))?;

    let name = device
        .get_product_string()
        .ok()
        .flatten()
        .unwrap_or_else(|| "HID card reader".to_string());
    let mut info = DeviceInfo::new(name, config.vendor_id, config.product_id);
    if let Ok(Some(serial)) = device.get_serial_number_string() {
        info = info.with_serial_number(serial);
    }

    Ok((device, info))
}

fn run_worker(
    device: &HidDevice,
    poll_interval_ms: i32,
    requests: &std_mpsc::Receiver<Request>,
    reports: &mpsc::UnboundedSender<DeviceResponse>,
) {
    let mut buf = [0u8; REPORT_LENGTH];

    loop {
        loop {
            match requests.try_recv() {
                Ok(Request::Write(frame, reply)) => {
                    let result = device
                        .send_feature_report(&frame)
                        .map_err(|e| HardwareError::communication(e.to_string()));
                    let _ = reply.send(result);
                }
                Ok(Request::Stop) | Err(std_mpsc::TryRecvError::Disconnected) => {
                    debug!("HID worker stopping");
                    return;
                }
                Err(std_mpsc::TryRecvError::Empty) => break,
            }
        }

        match device.read_timeout(&mut buf, poll_interval_ms) {
            Ok(0) => {}
            Ok(n) => {
                if reports.send(DeviceResponse::new(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("Card reader removed: {}", e);
                return;
            }
        }
    }
}

impl ReportTransport for HidTransport {
    async fn write_feature(&mut self, frame: &CommandFrame) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(Request::Write(frame.as_bytes().to_vec(), reply_tx))
            .map_err(|_| HardwareError::disconnected(self.info.name.clone()))?;

        reply_rx
            .await
            .map_err(|_| HardwareError::disconnected(self.info.name.clone()))?
    }

    async fn next_report(&mut self) -> Result<DeviceResponse> {
        match self.reports.recv().await {
            Some(report) => Ok(report),
            None => {
                error!("Card reader {} detached", self.info.name);
                Err(HardwareError::disconnected(self.info.name.clone()))
            }
        }
    }

    fn discard_pending(&mut self) -> usize {
        let mut count = 0;
        while self.reports.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }
}

impl Drop for HidTransport {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("HID worker thread panicked");
            }
        }
        debug!("Closed card reader {}", self.info.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_reader() {
        let config = HidConfig::default();
        assert_eq!(config.vendor_id, 0x0801);
        assert_eq!(config.product_id, 0x0003);
        assert_eq!(config.poll_interval_ms, 2);
    }
}
