//! Command line flags.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use waypoint_core::constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_COUNTER_FILE, DEFAULT_STATION_PATH,
    DEFAULT_STATION_PORT, DEFAULT_SWIPE_TIMEOUT_MS, MAX_STAGE,
};
use waypoint_hardware::DriverConfig;
use waypoint_hardware::driver::DEFAULT_SETTLE_DELAY_MS;
use waypoint_network::StationServerConfig;

/// Waypoint - routes players between game stations by magnetic stripe card
#[derive(Debug, Parser)]
#[command(name = "waypoint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Address the station server listens on
    #[arg(
        long,
        env = "WAYPOINT_BIND",
        default_value_t = StationServerConfig::default().bind_addr
    )]
    pub bind: SocketAddr,

    /// Request path stations connect to
    #[arg(long, env = "WAYPOINT_PATH", default_value = DEFAULT_STATION_PATH)]
    pub path: String,

    /// File holding the next player id
    #[arg(long, env = "WAYPOINT_COUNTER_FILE", default_value = DEFAULT_COUNTER_FILE)]
    pub counter_file: PathBuf,

    /// Wait for a single reader response, in milliseconds
    #[arg(long, default_value_t = DEFAULT_COMMAND_TIMEOUT_MS)]
    pub command_timeout_ms: u64,

    /// Wait for a card swipe before re-arming the reader, in milliseconds
    #[arg(long, default_value_t = DEFAULT_SWIPE_TIMEOUT_MS)]
    pub swipe_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Use the in-process mock reader instead of the USB device
    #[arg(long)]
    pub simulate: bool,

    /// With --simulate, card texts to swipe in order, one per line
    #[arg(long, requires = "simulate")]
    pub swipe_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to run; without a command the main menu asks for a mode.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Write a fresh player record onto every swiped card
    Format,
    /// Route swiped players to stations
    Entry,
    /// Act as a station terminal that sends every player on to the next stage
    Station(StationArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct StationArgs {
    /// Stage group the station serves
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_STAGE)))]
    pub stage: u8,

    /// Controller to connect to
    #[arg(long, env = "WAYPOINT_URL", default_value_t = default_controller_url())]
    pub url: String,
}

fn default_controller_url() -> String {
    format!("ws://127.0.0.1:{DEFAULT_STATION_PORT}{DEFAULT_STATION_PATH}")
}

/// Card reader operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Format,
    Entry,
}

impl Cli {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            swipe_timeout: Duration::from_millis(self.swipe_timeout_ms),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }

    pub fn server_config(&self) -> StationServerConfig {
        StationServerConfig {
            bind_addr: self.bind,
            path: self.path.clone(),
        }
    }
}
