//! Station network layer for the waypoint controller.
//!
//! Stations connect over WebSocket and exchange plain text frames (see
//! [`waypoint_protocol::StationMessage`]). Each connection gets its own
//! [`EndpointId`](waypoint_core::EndpointId); incoming frames are parsed once
//! here and forwarded as [`StationEvent`]s, and outgoing notifications go
//! through [`StationLinks`].
//!
//! [`run_station`] plays the other side: a simulated station terminal for
//! running the controller without game clients.
//!
//! # Example
//!
//! ```no_run
//! use waypoint_network::{StationServer, StationServerConfig, apply_events};
//! use waypoint_routing::RoutingTable;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = StationServer::bind(StationServerConfig::default()).await?;
//! let links = server.links();
//! let table = RoutingTable::shared();
//!
//! let (events_tx, events_rx) = tokio::sync::mpsc::channel(64);
//! tokio::spawn(apply_events(events_rx, table.clone()));
//! server.run(events_tx).await?;
//! # drop(links);
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod error;
mod links;
mod server;
mod simulator;

pub use dispatch::apply_events;
pub use error::{NetworkError, Result};
pub use links::StationLinks;
pub use server::{StationEvent, StationServer, StationServerConfig};
pub use simulator::{SIMULATED_PAYLOAD, departure_for, run_station};
