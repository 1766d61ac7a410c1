// panel-cli/src/main.rs
// Operator surface for the panel bridge: opens the serial port, feeds
// simulator telemetry in, writes simulator events out, and logs counters.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use panel_bridge::{
    available_ports, spawn_json_lines_source, BridgeConfig, BridgeController, BridgeEvent,
    CounterSnapshot, JsonEventSink, LinkId, SerialLink, DEFAULT_BAUD, DEFAULT_FRAME_INTERVAL,
    DEFAULT_PORT,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CLI args
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "msfs-panel", about = "Bridge an Arduino autopilot panel with MSFS")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports present on this machine
    Ports,
    /// Connect to the panel and run the bridge
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    baud: u32,
    /// JSON-lines telemetry feed; `-` reads stdin
    #[arg(long)]
    telemetry: Option<PathBuf>,
    /// Replay interval between snapshots read from a file
    #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL.as_millis() as u64)]
    frame_ms: u64,
    /// Release the flow gate if the panel stays silent this long
    #[arg(long)]
    ack_timeout_ms: Option<u64>,
    #[arg(long, default_value_t = 1)]
    stats_secs: u64,
}

impl RunArgs {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            port_name: self.port.clone(),
            baud_rate: self.baud,
            ack_timeout: self.ack_timeout_ms.map(Duration::from_millis),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Ports => list_ports(),
        Command::Run(args) => run(args),
    }
}

fn list_ports() -> Result<()> {
    let ports = available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        eprintln!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Bridge session
// ---------------------------------------------------------------------------

fn run(args: RunArgs) -> Result<()> {
    let config = args.bridge_config();
    let (tx, rx) = mpsc::channel();

    // Simulator events go to stdout, one JSON object per line.
    let controller = BridgeController::new(Box::new(JsonEventSink::new(io::stdout())), config.clone());
    let counters = controller.counters();
    let controller = std::thread::Builder::new()
        .name("controller".into())
        .spawn(move || controller.run(rx))
        .context("Failed to start controller thread")?;

    let link = SerialLink::open(&config.port_name, config.baud_rate, LinkId(1), tx.clone())
        .with_context(|| format!("Failed to connect to {}", config.port_name))?;
    info!("{} open at {} baud", link.port_name(), config.baud_rate);
    tx.send(BridgeEvent::Connect { link: LinkId(1), sink: Box::new(link) })
        .map_err(|_| anyhow!("controller stopped before connect"))?;

    let source = match &args.telemetry {
        Some(path) => {
            let (reader, pacing) = open_telemetry(path, Duration::from_millis(args.frame_ms))?;
            Some(spawn_json_lines_source(reader, tx.clone(), pacing)
                .context("Failed to start telemetry thread")?)
        }
        None => None,
    };

    // Log counters until the feed ends, the link drops or the controller stops.
    let interval = Duration::from_secs(args.stats_secs.max(1));
    loop {
        std::thread::sleep(interval);
        let snapshot = counters.snapshot();
        log_counters(&snapshot);
        if let Err(e) = check_link(&snapshot, &config.port_name) {
            let _ = tx.send(BridgeEvent::Shutdown);
            let _ = controller.join();
            return Err(e);
        }
        if controller.is_finished() {
            break;
        }
        if source.as_ref().is_some_and(|s| s.is_finished()) {
            let _ = tx.send(BridgeEvent::Shutdown);
            break;
        }
    }

    let totals = controller
        .join()
        .map_err(|_| anyhow!("controller thread panicked"))?;
    eprintln!("Done. Totals:");
    eprintln!("  snapshots received: {}", totals.snapshots_received);
    eprintln!("  lines from panel:   {}", totals.lines_received);
    eprintln!("  lines to panel:     {}", totals.messages_sent);
    eprintln!("  snapshots dropped:  {}", totals.snapshots_dropped);
    Ok(())
}

/// Stdin is treated as a live feed and never paced.
fn open_telemetry(path: &Path, frame: Duration) -> Result<(Box<dyn BufRead + Send>, Option<Duration>)> {
    if path.as_os_str() == "-" {
        return Ok((Box::new(BufReader::new(io::stdin())), None));
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open telemetry feed {}", path.display()))?;
    Ok((Box::new(BufReader::new(file)), Some(frame)))
}

/// There is no automatic reconnect: a lost link ends the session.
fn check_link(c: &CounterSnapshot, port: &str) -> Result<()> {
    if c.link_losses > 0 {
        bail!("Lost connection to {port}; re-run to reconnect");
    }
    Ok(())
}

fn log_counters(c: &CounterSnapshot) {
    info!(
        "snapshots {} | from panel {} | to panel {} | dropped {} | unknown {} | forced {} | sim errors {}",
        c.snapshots_received,
        c.lines_received,
        c.messages_sent,
        c.snapshots_dropped,
        c.unknown_lines,
        c.forced_releases,
        c.sim_failures,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
