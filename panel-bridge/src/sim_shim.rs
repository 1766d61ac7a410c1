//! Simulator session abstraction.
//!
//! Everything the bridge sends to the simulator goes through the
//! `SimEventSink` trait so that unit tests can substitute `RecordingSink`
//! without a running simulator.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::SimError;

// ── SimEvent ──────────────────────────────────────────────────────────────────

/// Client events the bridge maps onto simulator key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimEvent {
    ApMaster,
    YawDamperToggle,
    ApHdgHold,
    ApAprHold,
    ApNav1Hold,
    ApPanelAltitudeHold,
    ApPanelVsOn,
    KohlsmanInc,
    KohlsmanDec,
    HeadingBugDec,
    HeadingBugInc,
    ApAltVarInc,
    ApAltVarDec,
    ApVsVarInc,
    ApVsVarDec,
    HeadingBugSet,
    ApAltVarSetEnglish,
}

impl SimEvent {
    /// Simulator key event name this client event is mapped to.
    pub fn name(self) -> &'static str {
        match self {
            Self::ApMaster            => "AP_MASTER",
            Self::YawDamperToggle     => "YAW_DAMPER_TOGGLE",
            Self::ApHdgHold           => "AP_HDG_HOLD",
            Self::ApAprHold           => "AP_APR_HOLD",
            Self::ApNav1Hold          => "AP_NAV1_HOLD",
            Self::ApPanelAltitudeHold => "AP_PANEL_ALTITUDE_HOLD",
            Self::ApPanelVsOn         => "AP_PANEL_VS_ON",
            Self::KohlsmanInc         => "KOHLSMAN_INC",
            Self::KohlsmanDec         => "KOHLSMAN_DEC",
            Self::HeadingBugDec       => "HEADING_BUG_DEC",
            Self::HeadingBugInc       => "HEADING_BUG_INC",
            Self::ApAltVarInc         => "AP_ALT_VAR_INC",
            Self::ApAltVarDec         => "AP_ALT_VAR_DEC",
            Self::ApVsVarInc          => "AP_VS_VAR_INC",
            Self::ApVsVarDec          => "AP_VS_VAR_DEC",
            Self::HeadingBugSet       => "HEADING_BUG_SET",
            Self::ApAltVarSetEnglish  => "AP_ALT_VAR_SET_ENGLISH",
        }
    }
}

impl std::fmt::Display for SimEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// A live simulator session that accepts discrete control events.
///
/// `Send` so the session can move into the controller thread.
pub trait SimEventSink: Send {
    fn transmit(&mut self, event: SimEvent, param: u32) -> Result<(), SimError>;
}

// ── JsonEventSink ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmittedEvent {
    event: SimEvent,
    param: u32,
}

/// Writes each event as one JSON object per line, e.g.
/// `{"event":"HEADING_BUG_SET","param":123}`.
pub struct JsonEventSink<W> {
    out: W,
}

impl<W: Write + Send> JsonEventSink<W> {
    pub fn new(out: W) -> Self {
        JsonEventSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> SimEventSink for JsonEventSink<W> {
    fn transmit(&mut self, event: SimEvent, param: u32) -> Result<(), SimError> {
        serde_json::to_writer(&mut self.out, &EmittedEvent { event, param })?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingInner {
    events: Vec<(SimEvent, u32)>,
    offline: bool,
}

/// Test implementation: records every event; clones share one log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<RecordingInner>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the recorded `(event, param)` pairs.
    pub fn events(&self) -> Vec<(SimEvent, u32)> {
        self.lock().events.clone()
    }

    /// Make subsequent `transmit` calls fail as if the session dropped.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingInner> {
        // A panicking test thread must not hide the log from the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SimEventSink for RecordingSink {
    fn transmit(&mut self, event: SimEvent, param: u32) -> Result<(), SimError> {
        let mut g = self.lock();
        if g.offline {
            return Err(SimError::Unavailable);
        }
        g.events.push((event, param));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_EVENTS: [SimEvent; 17] = [
        SimEvent::ApMaster,
        SimEvent::YawDamperToggle,
        SimEvent::ApHdgHold,
        SimEvent::ApAprHold,
        SimEvent::ApNav1Hold,
        SimEvent::ApPanelAltitudeHold,
        SimEvent::ApPanelVsOn,
        SimEvent::KohlsmanInc,
        SimEvent::KohlsmanDec,
        SimEvent::HeadingBugDec,
        SimEvent::HeadingBugInc,
        SimEvent::ApAltVarInc,
        SimEvent::ApAltVarDec,
        SimEvent::ApVsVarInc,
        SimEvent::ApVsVarDec,
        SimEvent::HeadingBugSet,
        SimEvent::ApAltVarSetEnglish,
    ];

    #[test]
    fn serde_name_matches_sim_name() {
        for ev in ALL_EVENTS {
            assert_eq!(serde_json::to_string(&ev).unwrap(), format!("\"{}\"", ev.name()));
        }
    }

    #[test]
    fn json_sink_writes_one_line_per_event() {
        let mut sink = JsonEventSink::new(Vec::new());
        sink.transmit(SimEvent::HeadingBugSet, 123).unwrap();
        sink.transmit(SimEvent::ApMaster, 0).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"event\":\"HEADING_BUG_SET\",\"param\":123}\n{\"event\":\"AP_MASTER\",\"param\":0}\n"
        );
    }

    #[test]
    fn recording_sink_offline_rejects() {
        let mut sink = RecordingSink::new();
        sink.set_offline(true);
        assert!(matches!(sink.transmit(SimEvent::ApMaster, 0), Err(SimError::Unavailable)));
        sink.set_offline(false);
        sink.transmit(SimEvent::ApMaster, 0).unwrap();
        assert_eq!(sink.events(), vec![(SimEvent::ApMaster, 0)]);
    }
}
