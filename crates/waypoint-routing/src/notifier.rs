//! Outbound channel to station terminals.

use crate::error::NotifyError;
use std::sync::{Arc, Mutex};
use waypoint_core::EndpointId;

/// Delivers text messages to connected stations.
pub trait StationNotifier: Send + Sync {
    /// Queue `message` for the station behind `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::NotConnected` if the station has no live channel.
    fn notify(&self, endpoint: &EndpointId, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that keeps every message in memory.
///
/// Endpoints listed with [`RecordingNotifier::disconnect`] refuse delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(EndpointId, String)>>>,
    offline: Arc<Mutex<Vec<EndpointId>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far, oldest first.
    pub fn sent(&self) -> Vec<(EndpointId, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Refuse further deliveries to `endpoint`.
    pub fn disconnect(&self, endpoint: EndpointId) {
        if let Ok(mut offline) = self.offline.lock() {
            offline.push(endpoint);
        }
    }
}

impl StationNotifier for RecordingNotifier {
    fn notify(&self, endpoint: &EndpointId, message: &str) -> Result<(), NotifyError> {
        let offline = self
            .offline
            .lock()
            .map(|o| o.contains(endpoint))
            .unwrap_or(false);
        if offline {
            return Err(NotifyError::NotConnected(*endpoint));
        }

        self.sent
            .lock()
            .map_err(|_| NotifyError::Rejected {
                endpoint: *endpoint,
                message: "recorder poisoned".to_string(),
            })?
            .push((*endpoint, message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_refuses() {
        let notifier = RecordingNotifier::new();
        let (a, b) = (EndpointId::new(), EndpointId::new());
        notifier.disconnect(b);

        notifier.notify(&a, "1000000000007").unwrap();
        assert_eq!(
            notifier.notify(&b, "x"),
            Err(NotifyError::NotConnected(b))
        );
        assert_eq!(notifier.sent(), vec![(a, "1000000000007".to_string())]);
    }
}
