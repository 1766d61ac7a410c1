//! BridgeController state machine, the core of the panel bridge.
//!
//! This module is free of serial-port and simulator SDK types so it can be
//! fully unit-tested via `RecordingLink` and `RecordingSink`.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};
use panel_protocol::{decode_line, encode_telemetry, InboundCommand, HANDSHAKE_PC};
use panel_schema::TelemetrySnapshot;
use serde::Serialize;

use crate::command_table;
use crate::error::BridgeError;
use crate::flow_gate::{FlowGate, GateState};
use crate::link::{LineSink, LinkId};
use crate::sim_shim::SimEventSink;
use crate::telemetry_cache::TelemetryCache;

// ── Constants ─────────────────────────────────────────────────────────────────

pub const DEFAULT_PORT: &str = "COM4";
pub const DEFAULT_BAUD: u32 = 9600;
/// One simulator visual frame at 60 fps.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub port_name: String,
    pub baud_rate: u32,
    /// Force the flow gate open if the panel has not answered within this
    /// long. `None` waits forever for `READY`.
    pub ack_timeout: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD,
            ack_timeout: None,
        }
    }
}

// ── Connection state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Port open and handshake sent, no reply yet.
    ConnectedUnverified,
    /// Panel answered the handshake.
    ConnectedVerified,
}

// ── Counters ──────────────────────────────────────────────────────────────────

/// Live counters shared with the operator surface.
#[derive(Debug, Default)]
pub struct BridgeCounters {
    snapshots_received: AtomicU64,
    lines_received: AtomicU64,
    messages_sent: AtomicU64,
    snapshots_dropped: AtomicU64,
    unknown_lines: AtomicU64,
    forced_releases: AtomicU64,
    sim_failures: AtomicU64,
    link_losses: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub snapshots_received: u64,
    pub lines_received: u64,
    pub messages_sent: u64,
    pub snapshots_dropped: u64,
    pub unknown_lines: u64,
    pub forced_releases: u64,
    pub sim_failures: u64,
    /// Links dropped after a transport failure (operator disconnects excluded).
    pub link_losses: u64,
}

impl BridgeCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        let rd = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CounterSnapshot {
            snapshots_received: rd(&self.snapshots_received),
            lines_received:     rd(&self.lines_received),
            messages_sent:      rd(&self.messages_sent),
            snapshots_dropped:  rd(&self.snapshots_dropped),
            unknown_lines:      rd(&self.unknown_lines),
            forced_releases:    rd(&self.forced_releases),
            sim_failures:       rd(&self.sim_failures),
            link_losses:        rd(&self.link_losses),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

// ── Event bus (producers → controller thread) ─────────────────────────────────

/// Everything that can happen to the bridge, in arrival order.
pub enum BridgeEvent {
    Snapshot(TelemetrySnapshot),
    HardwareLine { link: LinkId, line: String },
    TransportError { link: LinkId, error: BridgeError },
    /// Operator opened a port; the controller sends the handshake.
    Connect { link: LinkId, sink: Box<dyn LineSink> },
    Disconnect,
    AttachSimulator(Box<dyn SimEventSink>),
    SimulatorLost(String),
    Shutdown,
}

// ── BridgeController ──────────────────────────────────────────────────────────

pub struct BridgeController {
    sim: Box<dyn SimEventSink>,
    link: Option<(LinkId, Box<dyn LineSink>)>,
    connection: ConnectionState,
    pub(crate) gate: FlowGate,
    cache: TelemetryCache,
    config: BridgeConfig,
    counters: Arc<BridgeCounters>,
}

impl BridgeController {
    pub fn new(sim: Box<dyn SimEventSink>, config: BridgeConfig) -> Self {
        BridgeController {
            sim,
            link: None,
            connection: ConnectionState::Disconnected,
            gate: FlowGate::new(),
            cache: TelemetryCache::new(),
            config,
            counters: Arc::new(BridgeCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<BridgeCounters> {
        Arc::clone(&self.counters)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn cache(&self) -> &TelemetryCache {
        &self.cache
    }

    pub fn link_id(&self) -> Option<LinkId> {
        self.link.as_ref().map(|(id, _)| *id)
    }

    // ── Simulator → panel ─────────────────────────────────────────────────────

    /// Handle one simulator frame.
    ///
    /// The cache is always refreshed; the line is only sent if the gate is free.
    pub fn on_snapshot(&mut self, snap: &TelemetrySnapshot) {
        bump(&self.counters.snapshots_received);
        self.cache.update(snap.heading_whole_deg(), snap.altitude_whole_ft());

        if self.link.is_none() {
            return;
        }

        let now = Instant::now();
        if let Some(timeout) = self.config.ack_timeout {
            if self.gate.is_stale(now, timeout) {
                warn!("panel silent for over {timeout:?}; releasing flow gate");
                self.gate.release();
                bump(&self.counters.forced_releases);
            }
        }

        if !self.gate.try_acquire(now) {
            bump(&self.counters.snapshots_dropped);
            trace!("gate busy; snapshot dropped");
            return;
        }

        let line = encode_telemetry(snap);
        self.write_line(&line);
    }

    // ── Panel → bridge ────────────────────────────────────────────────────────

    /// Handle one line read from the panel.
    ///
    /// Commands are forwarded regardless of the gate state.
    pub fn on_hardware_line(&mut self, line: &str) {
        bump(&self.counters.lines_received);

        match decode_line(line) {
            InboundCommand::Handshake => {
                self.gate.release();
                if self.link.is_some() && self.connection != ConnectionState::ConnectedVerified {
                    info!("panel answered handshake");
                    self.connection = ConnectionState::ConnectedVerified;
                }
            }
            InboundCommand::Ready => self.gate.release(),
            InboundCommand::ControlEvent(kind) => {
                let (event, param) = command_table::resolve(kind, &self.cache);
                debug!("{kind} -> {event}({param})");
                if let Err(e) = self.sim.transmit(event, param) {
                    bump(&self.counters.sim_failures);
                    error!("could not send {event} to simulator: {e}");
                }
            }
            InboundCommand::Unknown => {
                bump(&self.counters.unknown_lines);
                debug!("ignoring unrecognised line {:?}", line.trim_end());
            }
        }
    }

    // ── Connection management ─────────────────────────────────────────────────

    /// Attach a freshly opened link and greet the panel.
    pub fn connect(&mut self, link: LinkId, sink: Box<dyn LineSink>) {
        if let Some((old, _)) = self.link.take() {
            info!("{old}: replaced by {link}");
        }
        self.link = Some((link, sink));
        if let Err(e) = self.on_handshake_request() {
            warn!("{link}: {e}");
        }
    }

    /// Send the handshake line, bypassing and then holding the gate so no
    /// telemetry leaves before the panel replies.
    ///
    /// A failed write is handled as a transport error, not returned.
    pub fn on_handshake_request(&mut self) -> Result<(), BridgeError> {
        let link = self.link_id().ok_or(BridgeError::NotConnected)?;
        info!("{link}: sending handshake");
        if self.write_line(HANDSHAKE_PC) {
            self.gate.hold(Instant::now());
            self.connection = ConnectionState::ConnectedUnverified;
        }
        Ok(())
    }

    /// The link failed: drop it and wait for the operator to reconnect.
    pub fn on_transport_error(&mut self, error: &BridgeError) {
        match self.link_id() {
            Some(link) => error!("{link}: {error}; reconnect to resume"),
            None => error!("hardware link: {error}"),
        }
        if self.link.is_some() {
            bump(&self.counters.link_losses);
        }
        self.reset_link();
    }

    pub fn disconnect(&mut self) {
        if let Some(link) = self.link_id() {
            info!("{link}: closing");
        }
        self.reset_link();
    }

    pub fn attach_simulator(&mut self, sim: Box<dyn SimEventSink>) {
        info!("simulator session attached");
        self.sim = sim;
    }

    pub fn on_simulator_lost(&mut self, reason: &str) {
        error!("simulator session lost: {reason}");
    }

    fn reset_link(&mut self) {
        self.link = None;
        self.gate.release();
        self.connection = ConnectionState::Disconnected;
    }

    fn write_line(&mut self, line: &str) -> bool {
        let Some((_, sink)) = self.link.as_mut() else { return false };
        match sink.send_line(line) {
            Ok(()) => {
                bump(&self.counters.messages_sent);
                debug!("-> {line}");
                true
            }
            Err(e) => {
                self.on_transport_error(&e);
                false
            }
        }
    }

    fn is_current(&self, link: LinkId) -> bool {
        self.link_id() == Some(link)
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Apply one event. Returns `Break` on [`BridgeEvent::Shutdown`].
    pub fn handle(&mut self, event: BridgeEvent) -> ControlFlow<()> {
        match event {
            BridgeEvent::Snapshot(snap) => self.on_snapshot(&snap),
            BridgeEvent::HardwareLine { link, line } => {
                if self.is_current(link) {
                    self.on_hardware_line(&line);
                }
            }
            BridgeEvent::TransportError { link, error } => {
                if self.is_current(link) {
                    self.on_transport_error(&error);
                } else {
                    debug!("{link}: late error ignored: {error}");
                }
            }
            BridgeEvent::Connect { link, sink } => self.connect(link, sink),
            BridgeEvent::Disconnect => self.disconnect(),
            BridgeEvent::AttachSimulator(sim) => self.attach_simulator(sim),
            BridgeEvent::SimulatorLost(reason) => self.on_simulator_lost(&reason),
            BridgeEvent::Shutdown => {
                self.disconnect();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Consume events until `Shutdown` or until every sender is gone.
    pub fn run(mut self, events: mpsc::Receiver<BridgeEvent>) -> CounterSnapshot {
        for event in events {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.disconnect();
        self.counters.snapshot()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
