//! Serial bridge between an Arduino autopilot panel and Microsoft Flight
//! Simulator.
//!
//! Simulator frames become `<DATA;...;END;>` lines for the panel; panel
//! button and knob lines become simulator key events. `BridgeController` holds
//! all protocol state and is driven through a single `mpsc` channel of
//! [`BridgeEvent`]s. Serial and simulator I/O sit behind the [`LineSink`] and
//! [`SimEventSink`] traits; unit tests use `RecordingLink` and `RecordingSink`.

pub mod command_table;
pub mod controller;
pub mod error;
pub mod flow_gate;
pub mod link;
pub mod serial_link;
pub mod sim_shim;
pub mod telemetry_cache;
pub mod telemetry_source;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use controller::{
    BridgeConfig, BridgeController, BridgeCounters, BridgeEvent, ConnectionState, CounterSnapshot,
    DEFAULT_BAUD, DEFAULT_FRAME_INTERVAL, DEFAULT_PORT,
};
pub use error::{BridgeError, SimError};
pub use flow_gate::GateState;
pub use link::{LineSink, LinkId, RecordingLink};
pub use panel_protocol::{ControlKind, HANDSHAKE_DEVICE, HANDSHAKE_PC, READY};
pub use panel_schema::TelemetrySnapshot;
pub use serial_link::{available_ports, SerialLink};
pub use sim_shim::{JsonEventSink, RecordingSink, SimEvent, SimEventSink};
pub use telemetry_source::spawn_json_lines_source;
