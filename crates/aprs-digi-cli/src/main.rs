//! LoRa APRS Digipeater Command-Line Interface
//!
//! This CLI runs the digipeater station logic on a host machine:
//! - Running a live digipeater over a UDP packet radio link
//! - Printing the position beacon a configuration would transmit
//! - Computing APRS-IS passcodes
//! - Running deterministic traffic simulations
//!
//! Radio frames on the UDP link are TNC2 monitor text, one packet per
//! datagram.

use anyhow::{Context, Result};
use aprs_digi_core::{
    aprs_passcode, AprsPacket, BeaconScheduler, DigiConfig, DigiNode, IsUplink, NoUplink,
    PollEvent, RadioTransport, Received, SimConfig, StationKind, TrafficSim, TransportError,
    UplinkTransport,
};
use clap::{Parser, Subcommand};
use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "aprs-digi")]
#[command(author, version, about = "LoRa APRS digipeater", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the digipeater over a UDP radio link
    Run {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Station callsign, overrides the config file
        #[arg(long)]
        callsign: Option<String>,

        /// Station latitude in decimal degrees
        #[arg(long)]
        lat: Option<f64>,

        /// Station longitude in decimal degrees
        #[arg(long)]
        lng: Option<f64>,

        /// Local UDP address to bind for radio frames
        #[arg(long, default_value = "0.0.0.0:14440")]
        listen: SocketAddr,

        /// Remote UDP address radio frames are sent to
        #[arg(long, default_value = "127.0.0.1:14441")]
        peer: SocketAddr,
    },

    /// Print the position beacon for a configuration and exit
    Beacon {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Station callsign, overrides the config file
        #[arg(long)]
        callsign: Option<String>,

        /// Station latitude in decimal degrees
        #[arg(long)]
        lat: Option<f64>,

        /// Station longitude in decimal degrees
        #[arg(long)]
        lng: Option<f64>,
    },

    /// Compute the APRS-IS passcode for a callsign
    Passcode {
        /// Callsign (SSID suffix is ignored)
        callsign: String,
    },

    /// Run a deterministic traffic simulation against a live node
    Simulate {
        /// Number of simulated transmitting stations
        #[arg(long, default_value = "5")]
        stations: usize,

        /// Simulated seconds to run
        #[arg(long, default_value = "3600")]
        steps: u64,

        /// Chance per station per second of originating a packet
        #[arg(long, default_value = "0.005")]
        rate: f64,

        /// Chance that an offered packet repeats the previous one
        #[arg(long, default_value = "0.2")]
        dup_rate: f64,

        /// Random seed; omit for a random run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the effective station configuration
    Info {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Packet radio over UDP: one TNC2 text frame per datagram. Stands in
/// for the LoRa modem during bench testing.
struct UdpRadio {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpRadio {
    fn new(listen: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(listen)
            .map_err(|e| TransportError::InitFailed(format!("bind {}: {}", listen, e)))?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, peer })
    }
}

impl RadioTransport for UdpRadio {
    fn transmit(&mut self, packet: &AprsPacket) -> Result<(), TransportError> {
        self.socket
            .send_to(packet.encode().as_bytes(), self.peer)
            .map_err(|e| TransportError::TxFailed(e.to_string()))?;
        Ok(())
    }

    fn poll_receive(&mut self) -> Option<Received> {
        let mut buf = [0u8; 512];
        let (len, from) = match self.socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return None,
            Err(e) => {
                warn!("radio receive error: {}", e);
                return None;
            }
        };
        let text = match std::str::from_utf8(&buf[..len]) {
            Ok(t) => t.trim_end(),
            Err(_) => {
                warn!("dropping non-UTF8 frame from {}", from);
                return None;
            }
        };
        match AprsPacket::decode(text) {
            Some(packet) => Some(Received {
                packet,
                // No signal readings on a UDP link
                rssi: 0.0,
                snr: 0.0,
            }),
            None => {
                warn!("dropping malformed frame from {}: '{}'", from, text);
                None
            }
        }
    }
}

/// Load the config file (if any) and apply flag overrides.
fn load_config(
    path: Option<PathBuf>,
    callsign: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<DigiConfig> {
    let mut config = match path {
        Some(path) => DigiConfig::from_file(&path)
            .with_context(|| format!("failed to load config {:?}", path))?,
        None => DigiConfig::default(),
    };
    if let Some(callsign) = callsign {
        config.callsign = callsign;
    }
    if let Some(lat) = lat {
        config.latitude = lat;
    }
    if let Some(lng) = lng {
        config.longitude = lng;
    }
    Ok(config)
}

fn run_loop<R: RadioTransport, U: UplinkTransport>(
    config: DigiConfig,
    radio: R,
    uplink: U,
) -> Result<()> {
    let mut node = DigiNode::new(config, radio, uplink)?;
    node.spawn_ticker();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    println!("Digipeater running (Press Ctrl+C to stop)");

    let mut last_countdown = u64::MAX;
    while running.load(Ordering::SeqCst) {
        let countdown = node.seconds_to_next_beacon();
        if countdown != last_countdown {
            debug!(seconds = countdown, "next beacon");
            last_countdown = countdown;
        }
        if node.poll() == PollEvent::Idle {
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    let stats = node.stats();
    println!();
    println!("Received:   {} packets", stats.packets_rx);
    println!("Forwarded:  {} packets", stats.packets_forwarded);
    println!("Duplicates: {} dropped", stats.duplicates_dropped);
    println!("Own echoes: {} dropped", stats.own_echoes_dropped);
    println!("Beacons:    {} sent", stats.beacons_tx);

    Ok(())
}

fn cmd_run(
    config: Option<PathBuf>,
    callsign: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    listen: SocketAddr,
    peer: SocketAddr,
) -> Result<()> {
    let config = load_config(config, callsign, lat, lng)?;
    config.validate()?;

    let radio = UdpRadio::new(listen, peer).context("failed to open UDP radio link")?;
    println!("Station:    {}", config.callsign);
    println!("Frequency:  {:.4} MHz", config.frequency_hz as f64 / 1e6);
    println!("Radio link: {} -> {}", listen, peer);

    match config.igate.clone() {
        Some(igate) => {
            println!("Uplink:     {}:{}", igate.host, igate.port);
            let uplink = IsUplink::new(&config.callsign, igate);
            run_loop(config, radio, uplink)
        }
        None => run_loop(config, radio, NoUplink),
    }
}

fn cmd_beacon(
    config: Option<PathBuf>,
    callsign: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<()> {
    let config = load_config(config, callsign, lat, lng)?;
    config.validate()?;

    let mut scheduler = BeaconScheduler::new(
        &config.callsign,
        config.latitude,
        config.longitude,
        &config.comment,
        config.kind,
        config.beacon_interval_mins,
    );
    // The first beacon is due at startup, so this cannot be empty.
    if let Some(beacon) = scheduler.take_due() {
        println!("{}", beacon.encode());
    }
    Ok(())
}

fn cmd_passcode(callsign: String) -> Result<()> {
    println!("{}", aprs_passcode(&callsign));
    Ok(())
}

fn cmd_simulate(
    stations: usize,
    steps: u64,
    rate: f64,
    dup_rate: f64,
    seed: Option<u64>,
) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let sim_config = SimConfig::default()
        .with_station_count(stations)
        .with_traffic_rate(rate)
        .with_duplicate_rate(dup_rate)
        .with_seed(seed);

    println!("APRS Traffic Simulation");
    println!("=======================");
    println!("Stations:   {}", stations);
    println!("Steps:      {} simulated seconds", steps);
    println!("Rate:       {:.4} packets/station/s", rate);
    println!("Duplicates: {:.0}%", dup_rate * 100.0);
    println!("Seed:       {}", seed);
    println!();

    let mut sim = TrafficSim::new(sim_config);
    let report = sim.run(steps);

    println!("Offered:    {} packets", report.packets_offered);
    println!("Forwarded:  {} packets", report.forwarded);
    println!("Duplicates: {} dropped", report.duplicates_dropped);
    println!("Beacons:    {} sent", report.beacons);
    println!("Pruned:     {} ledger entries", report.entries_pruned);
    println!("Forward rate: {:.1}%", report.forward_rate() * 100.0);

    Ok(())
}

fn cmd_info(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config, None, None, None)?;
    let (table, symbol) = config.kind.symbol();

    println!("Station Configuration");
    println!("=====================");
    println!("Callsign:        {}", config.callsign);
    println!(
        "Position:        {} {}",
        aprs_digi_core::format_latitude(config.latitude),
        aprs_digi_core::format_longitude(config.longitude)
    );
    println!(
        "Kind:            {}",
        match config.kind {
            StationKind::Relay => "digipeater",
            StationKind::InternetGate => "internet gateway",
        }
    );
    println!("Symbol:          {}{}", table, symbol);
    println!("Comment:         {}", config.comment);
    println!("Frequency:       {:.4} MHz", config.frequency_hz as f64 / 1e6);
    println!("Beacon interval: {} min", config.beacon_interval_mins);
    println!("Dedup window:    {} min", config.forward_timeout_mins);
    match &config.igate {
        Some(igate) => println!("APRS-IS uplink:  {}:{}", igate.host, igate.port),
        None => println!("APRS-IS uplink:  disabled"),
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            config,
            callsign,
            lat,
            lng,
            listen,
            peer,
        } => cmd_run(config, callsign, lat, lng, listen, peer),

        Commands::Beacon {
            config,
            callsign,
            lat,
            lng,
        } => cmd_beacon(config, callsign, lat, lng),

        Commands::Passcode { callsign } => cmd_passcode(callsign),

        Commands::Simulate {
            stations,
            steps,
            rate,
            dup_rate,
            seed,
        } => cmd_simulate(stations, steps, rate, dup_rate, seed),

        Commands::Info { config } => cmd_info(config),
    }
}
