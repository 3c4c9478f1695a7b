//! Mock magstripe reader for testing and development.
//!
//! The mock answers framed commands the way the physical reader does:
//!
//! | Command | Response |
//! |---------|----------|
//! | reset | none, cancels a pending read |
//! | self-test | `[0xC5, ESC, 'y']` (or `'n'` when failing) |
//! | hi-co | `[0xC2, ESC, '0']` |
//! | read | the next swiped card, framed as track 1 |
//! | write | `[0xC2, ESC, '0']`, card text logged |

use crate::{
    HardwareError, Result,
    frame::{CommandFrame, SELF_TEST_SENTINEL, SHORT_COMMAND, TEST_COMMAND, TRACK_START, opcode::*},
    traits::ReportTransport,
    types::{DeviceInfo, DeviceResponse},
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use waypoint_core::constants::{READER_PRODUCT_ID, READER_VENDOR_ID};

/// Size of the input reports produced by the mock.
const REPORT_LENGTH: usize = 64;

/// Status byte of a successful command.
const STATUS_OK: u8 = b'0';

/// Mock magstripe reader.
///
/// # Examples
///
/// ```
/// use waypoint_hardware::mock::MockMagstripe;
/// use waypoint_hardware::session::CardReaderSession;
/// use waypoint_hardware::traits::CardReader;
/// use waypoint_hardware::DriverConfig;
///
/// #[tokio::main]
/// async fn main() -> waypoint_hardware::Result<()> {
///     let (reader, handle) = MockMagstripe::new();
///     let mut session = CardReaderSession::open(reader, DriverConfig::default()).await?;
///
///     handle.swipe("0000000000007")?;
///     assert_eq!(session.read_card().await?, b"0000000000007");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockMagstripe {
    swipe_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    responses: VecDeque<DeviceResponse>,
    awaiting_swipe: bool,
    state: Arc<Mutex<MockState>>,
    name: String,
}

#[derive(Debug, Default)]
struct MockState {
    commands: Vec<Vec<u8>>,
    written: Vec<Vec<u8>>,
    fail_self_test: bool,
    silent: bool,
    duplicate_responses: bool,
    unplugged: bool,
}

impl MockMagstripe {
    /// Create a new mock reader with the default name.
    ///
    /// Returns the reader and a handle used to swipe cards and inspect what
    /// was written.
    pub fn new() -> (Self, MockMagstripeHandle) {
        Self::with_name("Mock Magstripe Reader")
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockMagstripeHandle) {
        let (swipe_tx, swipe_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(MockState::default()));
        let name = name.into();

        let reader = Self {
            swipe_rx,
            responses: VecDeque::new(),
            awaiting_swipe: false,
            state: Arc::clone(&state),
            name: name.clone(),
        };
        let handle = MockMagstripeHandle {
            swipe_tx,
            state,
            name,
        };

        (reader, handle)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    fn respond(&mut self, body: &[u8]) {
        let copies = {
            let state = self.state();
            if state.silent {
                return;
            }
            if state.duplicate_responses { 2 } else { 1 }
        };
        let response = DeviceResponse::new(report(body));
        for _ in 0..copies {
            self.responses.push_back(response.clone());
        }
    }

    fn handle_command(&mut self, command: &[u8]) {
        match command {
            [ESCAPE, RESET, ESCAPE, WRITE, ESCAPE, WRITE_S, ESCAPE, TRACK_START, rest @ ..] => {
                let Some(end) = rest.windows(2).rposition(|w| w == [QUESTION, FS]) else {
                    warn!("Mock reader got a write without terminator");
                    return;
                };
                self.state().written.push(rest[..end].to_vec());
                self.respond(&[SHORT_COMMAND, ESCAPE, STATUS_OK]);
            }
            [_, ESCAPE, RESET, ..] => {
                self.awaiting_swipe = false;
            }
            [TEST_COMMAND, ESCAPE, TEST, ..] => {
                let sentinel = if self.state().fail_self_test {
                    b'n'
                } else {
                    SELF_TEST_SENTINEL
                };
                self.respond(&[TEST_COMMAND, ESCAPE, sentinel]);
            }
            [_, ESCAPE, HI_CO, ..] => {
                self.respond(&[SHORT_COMMAND, ESCAPE, STATUS_OK]);
            }
            [_, ESCAPE, READ, ..] => {
                self.awaiting_swipe = true;
            }
            other => {
                warn!("Mock reader ignoring unknown command {:02X?}", other);
            }
        }
    }
}

impl ReportTransport for MockMagstripe {
    async fn write_feature(&mut self, frame: &CommandFrame) -> Result<()> {
        let command = trim_padding(frame.command()).to_vec();
        {
            let mut state = self.state();
            if state.unplugged {
                return Err(HardwareError::disconnected(self.name.clone()));
            }
            state.commands.push(command.clone());
        }
        self.handle_command(&command);
        Ok(())
    }

    async fn next_report(&mut self) -> Result<DeviceResponse> {
        if let Some(response) = self.responses.pop_front() {
            return Ok(response);
        }

        if !self.awaiting_swipe {
            // Nothing outstanding: a real reader stays silent.
            return std::future::pending().await;
        }

        let card = self
            .swipe_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected(self.name.clone()))?;
        self.awaiting_swipe = false;
        debug!(len = card.len(), "Mock reader swiped");
        Ok(DeviceResponse::new(read_response(&card)))
    }

    fn discard_pending(&mut self) -> usize {
        let count = self.responses.len();
        self.responses.clear();
        count
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), READER_VENDOR_ID, READER_PRODUCT_ID)
    }
}

/// Handle for controlling a mock magstripe reader.
#[derive(Debug, Clone)]
pub struct MockMagstripeHandle {
    swipe_tx: mpsc::UnboundedSender<Vec<u8>>,
    state: Arc<Mutex<MockState>>,
    name: String,
}

impl MockMagstripeHandle {
    /// Swipe a card carrying `text` through the reader.
    ///
    /// The swipe is queued and answers the next read command.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disconnected` if the reader was dropped.
    pub fn swipe(&self, text: &str) -> Result<()> {
        self.swipe_bytes(text.as_bytes())
    }

    /// Swipe a card carrying arbitrary bytes.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disconnected` if the reader was dropped.
    pub fn swipe_bytes(&self, data: &[u8]) -> Result<()> {
        self.swipe_tx
            .send(data.to_vec())
            .map_err(|_| HardwareError::disconnected(self.name.clone()))
    }

    /// Every command received so far, padding stripped.
    #[must_use]
    pub fn commands(&self) -> Vec<Vec<u8>> {
        lock(&self.state).commands.clone()
    }

    /// Card texts written so far, oldest first.
    #[must_use]
    pub fn written_cards(&self) -> Vec<String> {
        lock(&self.state)
            .written
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Make the self-test answer with the wrong sentinel.
    pub fn fail_self_test(&self, fail: bool) {
        lock(&self.state).fail_self_test = fail;
    }

    /// Stop answering commands altogether.
    pub fn set_silent(&self, silent: bool) {
        lock(&self.state).silent = silent;
    }

    /// Answer every command twice.
    pub fn set_duplicate_responses(&self, duplicate: bool) {
        lock(&self.state).duplicate_responses = duplicate;
    }

    /// Simulate pulling the USB cable.
    pub fn unplug(&self) {
        lock(&self.state).unplugged = true;
    }

    /// Device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn trim_padding(command: &[u8]) -> &[u8] {
    let end = command.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &command[..end]
}

fn report(body: &[u8]) -> Vec<u8> {
    let mut report = body.to_vec();
    report.resize(REPORT_LENGTH, 0);
    report
}

// ESC s ESC 1 % <track 1> ? ESC 2 ESC 3 ? FS ESC 0
fn read_response(card: &[u8]) -> Vec<u8> {
    const HEAD: [u8; 5] = [ESCAPE, WRITE_S, ESCAPE, TRACK_START, b'%'];
    const TAIL: [u8; 10] = [
        QUESTION, ESCAPE, 0x02, ESCAPE, 0x03, QUESTION, FS, ESCAPE, STATUS_OK, 0,
    ];

    let room = REPORT_LENGTH - HEAD.len() - TAIL.len();
    let mut body = Vec::with_capacity(REPORT_LENGTH);
    body.extend_from_slice(&HEAD);
    body.extend_from_slice(&card[..card.len().min(room)]);
    body.extend_from_slice(&TAIL);
    report(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{extract_card_data, read_command, reset_command, write_command};

    async fn send(reader: &mut MockMagstripe, command: &[u8]) {
        let frame = CommandFrame::new(command).unwrap();
        reader.write_feature(&frame).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_response_framing() {
        let (mut reader, handle) = MockMagstripe::new();
        handle.swipe("1011010101007bob").unwrap();

        send(&mut reader, &read_command()).await;
        let response = reader.next_report().await.unwrap();

        assert_eq!(response.len(), REPORT_LENGTH);
        assert_eq!(extract_card_data(response.data()), b"1011010101007bob");
    }

    #[tokio::test]
    async fn test_write_is_logged_and_acknowledged() {
        let (mut reader, handle) = MockMagstripe::new();

        send(&mut reader, &write_command(b"0000000000001")).await;
        let ack = reader.next_report().await.unwrap();

        assert_eq!(ack.byte(2), Some(STATUS_OK));
        assert_eq!(handle.written_cards(), vec!["0000000000001".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_cancels_pending_read() {
        let (mut reader, handle) = MockMagstripe::new();
        send(&mut reader, &read_command()).await;
        send(&mut reader, &reset_command()).await;
        handle.swipe("0000000000001").unwrap();

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), reader.next_report()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_unplugged_reader_rejects_commands() {
        let (mut reader, handle) = MockMagstripe::new();
        handle.unplug();

        let frame = CommandFrame::new(&reset_command()).unwrap();
        let err = reader.write_feature(&frame).await.unwrap_err();
        assert!(matches!(err, HardwareError::Disconnected { .. }));
    }

    #[tokio::test]
    async fn test_dropped_handle_disconnects_pending_read() {
        let (mut reader, handle) = MockMagstripe::new();
        send(&mut reader, &read_command()).await;
        drop(handle);

        let err = reader.next_report().await.unwrap_err();
        assert!(matches!(err, HardwareError::Disconnected { .. }));
    }

    #[test]
    fn test_info_uses_reader_ids() {
        let (reader, _handle) = MockMagstripe::new();
        let info = reader.info();
        assert_eq!((info.vendor_id, info.product_id), (0x0801, 0x0003));
    }
}
