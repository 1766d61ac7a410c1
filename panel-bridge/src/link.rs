//! Outbound side of the hardware link.

use std::sync::{Arc, Mutex};

use crate::error::BridgeError;

/// Identifies one open/close cycle of the hardware link.
///
/// Reader and writer threads tag their events with it so that late events from
/// a link that has since been closed are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Line-oriented write half of the hardware link.
///
/// Implementations must not block the caller on device I/O.
pub trait LineSink: Send {
    /// Queue one line (without terminator) for transmission.
    fn send_line(&mut self, line: &str) -> Result<(), BridgeError>;
}

// ── RecordingLink ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingInner {
    lines: Vec<String>,
    broken: bool,
}

/// Test implementation: records written lines; clones share one log.
#[derive(Clone, Default)]
pub struct RecordingLink {
    inner: Arc<Mutex<RecordingInner>>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot all lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.clone()
    }

    /// Make subsequent writes fail as if the cable was pulled.
    pub fn break_link(&self) {
        self.lock().broken = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LineSink for RecordingLink {
    fn send_line(&mut self, line: &str) -> Result<(), BridgeError> {
        let mut g = self.lock();
        if g.broken {
            return Err(BridgeError::LinkClosed);
        }
        g.lines.push(line.to_string());
        Ok(())
    }
}
