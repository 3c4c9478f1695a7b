//! WebSocket server for station terminals.
//!
//! # Architecture
//!
//! ```text
//! Station A ┐                 ┌──► StationEvent channel ──► routing table
//!           ├──> StationServer┤
//! Station B ┘   (task per     └──◄ StationLinks ◄── coordinator notifications
//!                connection)
//! ```
//!
//! Every accepted connection runs in its own task with a reader loop and a
//! writer task fed by an unbounded channel. Only upgrades to the configured
//! path are accepted; other paths get `404 Not Found`.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, trace, warn};
use waypoint_core::EndpointId;
use waypoint_core::constants::{DEFAULT_STATION_PATH, DEFAULT_STATION_PORT};
use waypoint_protocol::{MessageError, StationMessage};

use crate::error::{NetworkError, Result};
use crate::links::StationLinks;

/// Configuration for the station server.
///
/// # Example
///
/// ```
/// use waypoint_network::StationServerConfig;
///
/// let config = StationServerConfig {
///     bind_addr: "127.0.0.1:9000".parse().unwrap(),
///     ..StationServerConfig::default()
/// };
/// assert_eq!(config.path, "/Station");
/// ```
#[derive(Debug, Clone)]
pub struct StationServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,

    /// Request path stations must connect to.
    pub path: String,
}

impl Default for StationServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_STATION_PORT)),
            path: DEFAULT_STATION_PATH.to_string(),
        }
    }
}

/// Something that happened on a station connection.
#[derive(Debug, Clone)]
pub enum StationEvent {
    /// A station completed the WebSocket handshake.
    Opened {
        endpoint: EndpointId,
        peer: SocketAddr,
        connected_at: DateTime<Utc>,
    },

    /// A well-formed text frame.
    Message {
        endpoint: EndpointId,
        message: StationMessage,
    },

    /// A text frame that did not parse.
    Malformed {
        endpoint: EndpointId,
        text: String,
        error: MessageError,
    },

    /// The connection ended, cleanly or not.
    Closed { endpoint: EndpointId },
}

/// WebSocket listener for station terminals.
pub struct StationServer {
    listener: TcpListener,
    config: StationServerConfig,
    links: StationLinks,
}

impl StationServer {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::BindFailed` if the address is unavailable.
    pub async fn bind(config: StationServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| NetworkError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        info!(
            "Station server listening on ws://{}{}",
            config.bind_addr, config.path
        );

        Ok(Self {
            listener,
            config,
            links: StationLinks::new(),
        })
    }

    /// Address actually bound, useful with port 0.
    ///
    /// # Errors
    ///
    /// Returns the socket error, if any.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &StationServerConfig {
        &self.config
    }

    /// Handle for sending messages to connected stations.
    pub fn links(&self) -> StationLinks {
        self.links.clone()
    }

    /// Accept stations until `events` is closed.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::EventsClosed` once nobody listens for events.
    /// Accept failures are logged and do not stop the server.
    pub async fn run(self, events: mpsc::Sender<StationEvent>) -> Result<()> {
        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                () = events.closed() => return Err(NetworkError::EventsClosed),
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted TCP connection from {}", peer);
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                    }
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        self.config.path.clone(),
                        self.links.clone(),
                        events.clone(),
                    ));
                }
                Err(e) => error!("Station accept error: {}", e),
            }
        }
    }
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Unknown path".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    path: String,
    links: StationLinks,
    events: mpsc::Sender<StationEvent>,
) {
    let handshake = accept_hdr_async(stream, move |request: &Request, response: Response| {
        if request.uri().path() == path {
            Ok(response)
        } else {
            warn!("Rejected station upgrade to {} from {}", request.uri().path(), peer);
            Err(not_found())
        }
    })
    .await;

    let ws_stream = match handshake {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            debug!("Station handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let endpoint = EndpointId::new();
    let (mut write, mut read) = ws_stream.split();
    let (send_tx, mut send_rx) = mpsc::unbounded_channel::<String>();
    links.insert(endpoint, send_tx);
    info!(endpoint = %endpoint, "Station connected from {} (total: {})", peer, links.len());

    let opened = StationEvent::Opened {
        endpoint,
        peer,
        connected_at: Utc::now(),
    };
    if events.send(opened).await.is_err() {
        links.remove(&endpoint);
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = send_rx.recv().await {
            if let Err(e) = write.send(WsMessage::Text(text)).await {
                error!(endpoint = %endpoint, "Station write error: {}", e);
                break;
            }
        }
        let _ = write.close().await;
    });

    while let Some(frame) = read.next().await {
        let event = match frame {
            Ok(WsMessage::Text(text)) => {
                trace!(endpoint = %endpoint, "Station frame: {:?}", text);
                match StationMessage::parse(&text) {
                    Ok(message) => StationEvent::Message { endpoint, message },
                    Err(error) => StationEvent::Malformed {
                        endpoint,
                        text,
                        error,
                    },
                }
            }
            Ok(WsMessage::Close(frame)) => {
                debug!(endpoint = %endpoint, "Station sent close: {:?}", frame);
                break;
            }
            Ok(other) => {
                trace!(endpoint = %endpoint, "Ignoring non-text frame: {:?}", other);
                continue;
            }
            Err(e) => {
                debug!(endpoint = %endpoint, "Station read error: {}", e);
                break;
            }
        };

        if events.send(event).await.is_err() {
            break;
        }
    }

    links.remove(&endpoint);
    writer.abort();
    info!(endpoint = %endpoint, "Station disconnected ({})", peer);
    let _ = events.send(StationEvent::Closed { endpoint }).await;
}
