//! Feeds station events into the routing table.

use tokio::sync::mpsc;
use tracing::{info, warn};
use waypoint_protocol::StationMessage;
use waypoint_routing::SharedTable;

use crate::server::StationEvent;

/// Number of scores logged after each new score report.
const LEADERBOARD_SIZE: usize = 5;

/// Apply every event from `events` to `table` until the channel closes.
///
/// Each event takes the table lock once, so a routing decision in progress
/// sees either all or none of an event's effects.
pub async fn apply_events(mut events: mpsc::Receiver<StationEvent>, table: SharedTable) {
    while let Some(event) = events.recv().await {
        let mut table = table.lock().await;
        match event {
            StationEvent::Opened { endpoint, .. } => table.handle_open(endpoint),
            StationEvent::Message { endpoint, message } => {
                let is_score = matches!(message, StationMessage::ScoreReported { .. });
                table.apply(endpoint, message);
                if is_score {
                    let leaderboard = table.scores.leaderboard(LEADERBOARD_SIZE);
                    for (rank, score) in leaderboard.iter().enumerate() {
                        info!("#{} {}", rank + 1, score);
                    }
                }
            }
            StationEvent::Malformed {
                endpoint,
                text,
                error,
            } => warn!(endpoint = %endpoint, "Ignoring station message {:?}: {}", text, error),
            StationEvent::Closed { endpoint } => table.handle_close(endpoint),
        }
    }
    info!("Station event stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{EndpointId, PlayerId, Stage};
    use waypoint_routing::RoutingTable;

    #[tokio::test]
    async fn test_events_update_table() {
        let table = RoutingTable::shared();
        let (tx, rx) = mpsc::channel(8);
        let endpoint = EndpointId::new();

        for text in ["S1", "1000000000007amy", "H3000000000007amy,50"] {
            let message = StationMessage::parse(text).unwrap();
            tx.send(StationEvent::Message { endpoint, message }).await.unwrap();
        }
        tx.send(StationEvent::Malformed {
            endpoint,
            text: "S".into(),
            error: StationMessage::parse("S").unwrap_err(),
        })
        .await
        .unwrap();
        tx.send(StationEvent::Closed { endpoint }).await.unwrap();
        drop(tx);

        apply_events(rx, table.clone()).await;

        let table = table.lock().await;
        assert!(table.pending.contains(&PlayerId::new("007").unwrap()));
        assert_eq!(table.scores.len(), 1);
        assert!(!table.stations.get(&endpoint).unwrap().connected);
        assert_eq!(table.stations.first_available(Stage::new(1).unwrap()), None);
    }
}
