//! Stand-in station terminal.
//!
//! A simulated station registers its stage and answers every player routed to
//! it with a departure towards the next stage, as if the player had finished
//! the stage at once. Paired with the simulated card reader it drives the
//! whole controller without hardware or game clients.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use waypoint_core::Stage;
use waypoint_core::constants::TAG_REGISTER;
use waypoint_protocol::PlayerRecord;

use crate::error::{NetworkError, Result};

/// Ship data reported for every player leaving a simulated station.
pub const SIMULATED_PAYLOAD: &str = "011010101";

/// Departure frame for a player who just finished `record`'s stage.
///
/// Returns `None` for a record whose stage has no stations, which a
/// controller never routes.
///
/// # Examples
///
/// ```
/// use waypoint_network::departure_for;
/// use waypoint_protocol::PlayerRecord;
///
/// let arrived = PlayerRecord::decode("1000000000007amy").unwrap();
/// assert_eq!(departure_for(&arrived).as_deref(), Some("2011010101007amy"));
/// ```
#[must_use]
pub fn departure_for(record: &PlayerRecord) -> Option<String> {
    if !record.stage.is_routable() {
        return None;
    }
    let next = Stage::new(record.stage.as_u8() + 1).ok()?;
    let departed = PlayerRecord {
        stage: next,
        payload: SIMULATED_PAYLOAD.to_string(),
        ..record.clone()
    };
    Some(departed.encode())
}

/// Connect to the controller at `url` as a station of `stage` and answer
/// routed players until the controller closes the connection.
///
/// # Errors
///
/// Returns `NetworkError::ConnectFailed` if the controller is unreachable and
/// `NetworkError::WebSocket` if the connection breaks.
pub async fn run_station(url: &str, stage: Stage) -> Result<()> {
    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|source| NetworkError::ConnectFailed {
            url: url.to_string(),
            source: Box::new(source),
        })?;
    info!(stage = %stage, "Simulated station connected to {}", url);

    ws.send(WsMessage::Text(format!("{TAG_REGISTER}{stage}"))).await?;

    while let Some(frame) = ws.next().await {
        match frame? {
            WsMessage::Text(text) => {
                if let Some(reply) = reply_to(&text) {
                    debug!("Simulated departure: {}", reply);
                    ws.send(WsMessage::Text(reply)).await?;
                }
            }
            WsMessage::Close(_) => break,
            other => debug!("Ignoring non-text frame: {:?}", other),
        }
    }

    info!(stage = %stage, "Controller closed the station connection");
    Ok(())
}

fn reply_to(text: &str) -> Option<String> {
    let record = match PlayerRecord::decode(text) {
        Ok(record) => record,
        Err(e) => {
            warn!("Ignoring controller message {:?}: {}", text, e);
            return None;
        }
    };

    info!("Player arrived: {}", record.printable());
    let reply = departure_for(&record);
    if reply.is_none() {
        warn!("Player {} arrived at a stage without stations", record.player_id);
    }
    reply
}
