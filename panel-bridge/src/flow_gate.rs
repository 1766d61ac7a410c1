//! Single-slot flow control towards the panel.
//!
//! The panel firmware parses one line at a time and answers `READY` when it
//! is done. At most one telemetry line may be unacknowledged; snapshots that
//! arrive in the meantime are dropped, never queued.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitingAck,
}

#[derive(Debug)]
pub struct FlowGate {
    /// When the outstanding line was sent; `None` while idle.
    pub(crate) awaiting_since: Option<Instant>,
}

impl FlowGate {
    pub fn new() -> Self {
        FlowGate { awaiting_since: None }
    }

    pub fn state(&self) -> GateState {
        match self.awaiting_since {
            Some(_) => GateState::AwaitingAck,
            None => GateState::Idle,
        }
    }

    /// Claim the slot. Returns `false` if a line is already outstanding.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.awaiting_since.is_some() {
            return false;
        }
        self.awaiting_since = Some(now);
        true
    }

    /// Claim the slot whether or not it is free (handshake).
    pub fn hold(&mut self, now: Instant) {
        self.awaiting_since = Some(now);
    }

    /// Free the slot. Idempotent.
    pub fn release(&mut self) {
        self.awaiting_since = None;
    }

    /// `true` if a line has been outstanding for longer than `timeout`.
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        self.awaiting_since
            .is_some_and(|since| now.saturating_duration_since(since) > timeout)
    }
}

impl Default for FlowGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        assert_eq!(FlowGate::new().state(), GateState::Idle);
    }

    #[test]
    fn second_acquire_without_release_fails() {
        let now = Instant::now();
        let mut gate = FlowGate::new();
        assert!(gate.try_acquire(now));
        assert!(!gate.try_acquire(now));
        assert_eq!(gate.state(), GateState::AwaitingAck);

        gate.release();
        assert!(gate.try_acquire(now));
    }

    #[test]
    fn release_is_idempotent() {
        let mut gate = FlowGate::new();
        gate.release();
        gate.release();
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn interleavings_never_admit_two() {
        // Every sequence of 8 ops: bit set = acquire, clear = release.
        let now = Instant::now();
        for pattern in 0u16..256 {
            let mut gate = FlowGate::new();
            let mut outstanding = 0;
            for bit in 0..8 {
                if pattern & (1 << bit) != 0 {
                    if gate.try_acquire(now) {
                        outstanding += 1;
                    }
                } else {
                    gate.release();
                    outstanding = 0;
                }
                assert!(outstanding <= 1, "pattern {pattern:08b}");
            }
        }
    }

    #[test]
    fn hold_blocks_acquire() {
        let now = Instant::now();
        let mut gate = FlowGate::new();
        gate.hold(now);
        assert!(!gate.try_acquire(now));
        gate.hold(now); // holding twice is fine
        gate.release();
        assert!(gate.try_acquire(now));
    }

    #[test]
    fn staleness() {
        let start = Instant::now();
        let mut gate = FlowGate::new();
        assert!(!gate.is_stale(start + Duration::from_secs(60), Duration::from_secs(1)));

        gate.try_acquire(start);
        assert!(!gate.is_stale(start + Duration::from_millis(500), Duration::from_secs(1)));
        assert!(gate.is_stale(start + Duration::from_secs(2), Duration::from_secs(1)));
    }
}
