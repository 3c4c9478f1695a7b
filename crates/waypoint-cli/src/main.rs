//! Waypoint controller.
//!
//! Starts the station server, connects the card reader and runs either
//! formatting mode or card entry mode until the reader fails or Ctrl+C.
//! `waypoint station` instead runs a simulated station terminal.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use waypoint_hardware::mock::{MockMagstripe, MockMagstripeHandle};
use waypoint_hardware::{AnyTransport, CardReaderSession};
use waypoint_core::Stage;
use waypoint_network::{StationServer, apply_events, run_station};
use waypoint_routing::{FileCounter, Operator, PlayerIdCounter, RoutingCoordinator, RoutingTable};

mod cli;
mod console;

use cli::{Cli, Command, Mode, StationArgs};
use console::ConsoleOperator;

/// Station events buffered between the server and the routing table.
const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    let requested = match &cli.command {
        Some(Command::Station(args)) => return simulate_station(args).await,
        Some(Command::Format) => Some(Mode::Format),
        Some(Command::Entry) => Some(Mode::Entry),
        None => None,
    };

    let server = StationServer::bind(cli.server_config())
        .await
        .context("Failed to start station server")?;
    let links = server.links();
    let table = RoutingTable::shared();
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(apply_events(events_rx, table.clone()));
    let server_task = tokio::spawn(server.run(events_tx));

    let counter = FileCounter::load(&cli.counter_file).with_context(|| {
        format!("Failed to read counter file: {}", cli.counter_file.display())
    })?;
    info!("Next player id: {:03}", counter.peek());

    let (transport, _swiper) = open_transport(&cli)?;
    let session = CardReaderSession::open(transport, cli.driver_config())
        .await
        .context("Failed to connect to the card reader")?;

    let mut operator = ConsoleOperator::new();
    let mode = match requested {
        Some(mode) => mode,
        None => match main_menu(&mut operator).await {
            Some(mode) => mode,
            None => {
                server_task.abort();
                return Ok(());
            }
        },
    };

    let mut coordinator = RoutingCoordinator::new(session, operator, counter, links, table);
    let run = async {
        match mode {
            Mode::Format => coordinator.run_formatting_mode().await,
            Mode::Entry => coordinator.run_entry_mode().await,
        }
    };

    let result = tokio::select! {
        result = run => result.context("Card reader session ended"),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    coordinator.reader_mut().close();
    server_task.abort();
    result
}

fn setup_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    Ok(())
}

async fn simulate_station(args: &StationArgs) -> Result<()> {
    let stage = Stage::new(args.stage)?;
    tokio::select! {
        result = run_station(&args.url, stage) => result.context("Simulated station stopped"),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    }
}

async fn main_menu(operator: &mut impl Operator) -> Option<Mode> {
    operator.notice("1) Format cards");
    operator.notice("2) Card entry");
    operator.notice("0) Quit");
    match operator.choose("Select a mode:", 0..=2).await {
        1 => Some(Mode::Format),
        2 => Some(Mode::Entry),
        _ => None,
    }
}

/// Open the card reader transport.
///
/// A simulated reader fed from a swipe file is unplugged once every card has
/// been read; without a file it waits for swipes forever.
fn open_transport(cli: &Cli) -> Result<(AnyTransport, Option<MockMagstripeHandle>)> {
    if !cli.simulate {
        return Ok((open_device()?, None));
    }

    let (reader, handle) = MockMagstripe::with_name("Simulated reader");
    let Some(path) = &cli.swipe_file else {
        warn!("Simulated reader has no cards to swipe");
        return Ok((reader.into(), Some(handle)));
    };

    let cards = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read swipe file: {}", path.display()))?;
    let mut count = 0;
    for card in cards.lines().map(str::trim_end).filter(|c| !c.is_empty()) {
        handle.swipe(card)?;
        count += 1;
    }
    info!("Queued {} simulated swipes", count);
    Ok((reader.into(), None))
}

#[cfg(feature = "hid")]
fn open_device() -> Result<AnyTransport> {
    use waypoint_hardware::{HidConfig, HidTransport};

    let transport =
        HidTransport::open(HidConfig::default()).context("Failed to open the card reader")?;
    Ok(transport.into())
}

#[cfg(not(feature = "hid"))]
fn open_device() -> Result<AnyTransport> {
    anyhow::bail!("Built without USB support; rebuild with `--features hid` or pass --simulate")
}
