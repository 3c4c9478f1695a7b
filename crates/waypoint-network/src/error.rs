use std::net::SocketAddr;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors of the station server and the simulated station. Per-connection
/// failures of the server are logged and end only that connection.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Failed to bind station server to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Event receiver dropped, station server stopping")]
    EventsClosed,

    #[error("Failed to connect to {url}: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: Box<WsError>,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(Box<WsError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WsError> for NetworkError {
    fn from(err: WsError) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
