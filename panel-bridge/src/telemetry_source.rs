//! JSON-lines telemetry feed.
//!
//! Stands in for the simulator's per-frame data subscription: each line is one
//! serialized [`TelemetrySnapshot`]. Missing fields take their defaults, so a
//! feed only needs to carry what it changes.

use std::io::BufRead;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};
use panel_schema::TelemetrySnapshot;

use crate::controller::BridgeEvent;

/// Parse one feed line. Blank lines yield `Ok(None)`.
pub fn parse_snapshot_line(line: &str) -> Result<Option<TelemetrySnapshot>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Start a thread that forwards every snapshot in `reader` to `events`.
///
/// With `pacing` set, the thread sleeps that long after each snapshot so a
/// recorded file replays at frame rate. When the feed ends the controller gets
/// [`BridgeEvent::SimulatorLost`].
pub fn spawn_json_lines_source<R>(
    reader: R,
    events: mpsc::Sender<BridgeEvent>,
    pacing: Option<Duration>,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("telemetry".into())
        .spawn(move || pump_snapshots(reader, &events, pacing))
}

fn pump_snapshots<R: BufRead>(reader: R, events: &mpsc::Sender<BridgeEvent>, pacing: Option<Duration>) {
    let mut forwarded = 0u64;
    for (idx, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                let _ = events.send(BridgeEvent::SimulatorLost(format!("telemetry read failed: {e}")));
                return;
            }
        };
        let snap = match parse_snapshot_line(&line) {
            Ok(Some(s)) => s,
            Ok(None) => continue,
            Err(e) => {
                warn!("telemetry line {}: skipped: {e}", idx + 1);
                continue;
            }
        };
        if events.send(BridgeEvent::Snapshot(snap)).is_err() {
            debug!("controller gone; telemetry source stopping");
            return;
        }
        forwarded += 1;
        if let Some(frame) = pacing {
            std::thread::sleep(frame);
        }
    }
    info!("telemetry stream ended after {forwarded} snapshots");
    let _ = events.send(BridgeEvent::SimulatorLost("telemetry stream ended".into()));
}
