//! Outbound channels to connected stations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::trace;
use waypoint_core::EndpointId;
use waypoint_routing::{NotifyError, StationNotifier};

/// Live station connections, keyed by endpoint.
///
/// Cloning is cheap; every clone sees the same set of links.
#[derive(Debug, Clone, Default)]
pub struct StationLinks {
    inner: Arc<Mutex<HashMap<EndpointId, mpsc::UnboundedSender<String>>>>,
}

impl StationLinks {
    pub fn new() -> Self {
        Self::default()
    }

    fn links(&self) -> MutexGuard<'_, HashMap<EndpointId, mpsc::UnboundedSender<String>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn insert(&self, endpoint: EndpointId, sender: mpsc::UnboundedSender<String>) {
        self.links().insert(endpoint, sender);
    }

    pub(crate) fn remove(&self, endpoint: &EndpointId) {
        self.links().remove(endpoint);
    }

    pub fn is_connected(&self, endpoint: &EndpointId) -> bool {
        self.links().contains_key(endpoint)
    }

    /// Number of open station connections.
    pub fn len(&self) -> usize {
        self.links().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links().is_empty()
    }
}

impl StationNotifier for StationLinks {
    fn notify(&self, endpoint: &EndpointId, message: &str) -> Result<(), NotifyError> {
        let links = self.links();
        let sender = links
            .get(endpoint)
            .ok_or(NotifyError::NotConnected(*endpoint))?;
        sender
            .send(message.to_string())
            .map_err(|_| NotifyError::NotConnected(*endpoint))?;
        trace!(endpoint = %endpoint, "Queued station message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_queues_text() {
        let links = StationLinks::new();
        let endpoint = EndpointId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        links.insert(endpoint, tx);

        links.notify(&endpoint, "1000000000007").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "1000000000007");
    }

    #[test]
    fn test_notify_unknown_or_closed_endpoint() {
        let links = StationLinks::new();
        let endpoint = EndpointId::new();
        assert_eq!(
            links.notify(&endpoint, "x"),
            Err(NotifyError::NotConnected(endpoint))
        );

        let (tx, rx) = mpsc::unbounded_channel();
        links.insert(endpoint, tx);
        drop(rx);
        assert!(links.notify(&endpoint, "x").is_err());

        links.remove(&endpoint);
        assert!(links.is_empty());
    }
}
