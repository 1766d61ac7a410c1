//! Serial port transport for the panel.
//!
//! Opening a port spawns two threads: a reader that splits incoming bytes into
//! lines and forwards them as [`BridgeEvent::HardwareLine`], and a writer that
//! drains a channel of outbound lines. Both report failures as
//! [`BridgeEvent::TransportError`] and exit.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use log::{debug, warn};
use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::controller::BridgeEvent;
use crate::error::BridgeError;
use crate::link::{LineSink, LinkId};

/// Read timeout; lets the reader notice a close request.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Outbound line terminator (the firmware reads up to `\n`).
const LINE_END: &[u8] = b"\n";

/// Longest inbound line kept; anything longer is flushed as-is and decodes
/// as an unknown line.
pub const MAX_LINE_LEN: usize = 256;

// ── SerialLink ────────────────────────────────────────────────────────────────

/// Write handle for an open panel port. Dropping it stops both threads.
pub struct SerialLink {
    port_name: String,
    tx: mpsc::Sender<String>,
    stop: Arc<AtomicBool>,
}

impl SerialLink {
    /// Open `port_name` at `baud_rate` (8N1) and start the I/O threads.
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        link: LinkId,
        events: mpsc::Sender<BridgeEvent>,
    ) -> Result<Self, BridgeError> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| BridgeError::PortOpen { port: port_name.to_string(), source })?;
        let reader = port
            .try_clone()
            .map_err(|source| BridgeError::PortOpen { port: port_name.to_string(), source })?;

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<String>();

        {
            let events = events.clone();
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name(format!("{port_name}-rx"))
                .spawn(move || read_lines(reader, link, &events, &stop))?;
        }
        let writer = std::thread::Builder::new()
            .name(format!("{port_name}-tx"))
            .spawn(move || write_lines(port, link, rx, &events));
        if let Err(e) = writer {
            stop.store(true, Ordering::Relaxed);
            return Err(e.into());
        }

        Ok(SerialLink { port_name: port_name.to_string(), tx, stop })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl LineSink for SerialLink {
    fn send_line(&mut self, line: &str) -> Result<(), BridgeError> {
        self.tx.send(line.to_string()).map_err(|_| BridgeError::LinkClosed)
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        // The writer exits when `tx` drops; the reader polls this flag.
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Names of the serial ports currently present on the host.
pub fn available_ports() -> Result<Vec<String>, BridgeError> {
    let ports = serialport::available_ports().map_err(BridgeError::Enumerate)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

// ── I/O threads ───────────────────────────────────────────────────────────────

fn read_lines<R: Read>(
    port: R,
    link: LinkId,
    events: &mpsc::Sender<BridgeEvent>,
    stop: &AtomicBool,
) {
    let mut reader = BufReader::new(port);
    let mut pending = Vec::with_capacity(64);
    while !stop.load(Ordering::Relaxed) {
        let room = (MAX_LINE_LEN - pending.len()) as u64;
        match (&mut reader).take(room).read_until(b'\n', &mut pending) {
            Ok(0) => {
                let _ = events.send(BridgeEvent::TransportError { link, error: BridgeError::PortClosed });
                return;
            }
            Ok(_) if pending.ends_with(b"\n") => {
                let line = String::from_utf8_lossy(&pending).into_owned();
                pending.clear();
                if events.send(BridgeEvent::HardwareLine { link, line }).is_err() {
                    return; // controller gone
                }
            }
            Ok(_) if pending.len() >= MAX_LINE_LEN => {
                warn!("{link}: {} bytes without a line break; discarding", pending.len());
                let line = String::from_utf8_lossy(&pending).into_owned();
                pending.clear();
                if events.send(BridgeEvent::HardwareLine { link, line }).is_err() {
                    return;
                }
            }
            // Partial line; keep accumulating.
            Ok(_) => {}
            Err(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock) => {}
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                if !stop.load(Ordering::Relaxed) {
                    warn!("{link}: read failed: {e}");
                    let _ = events.send(BridgeEvent::TransportError { link, error: e.into() });
                }
                return;
            }
        }
    }
    debug!("{link}: reader stopped");
}

fn write_lines(
    mut port: Box<dyn SerialPort>,
    link: LinkId,
    rx: mpsc::Receiver<String>,
    events: &mpsc::Sender<BridgeEvent>,
) {
    for line in rx {
        let result = port
            .write_all(line.as_bytes())
            .and_then(|()| port.write_all(LINE_END))
            .and_then(|()| port.flush());
        if let Err(e) = result {
            warn!("{link}: write failed: {e}");
            let _ = events.send(BridgeEvent::TransportError { link, error: e.into() });
            return;
        }
    }
    debug!("{link}: writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields its chunks one `read` at a time, then a timeout, then EOF.
    struct ChunkedPort {
        chunks: Vec<Vec<u8>>,
        timed_out: bool,
    }

    impl Read for ChunkedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.chunks.is_empty() {
                let chunk = self.chunks.remove(0);
                buf[..chunk.len()].copy_from_slice(&chunk);
                return Ok(chunk.len());
            }
            if !self.timed_out {
                self.timed_out = true;
                return Err(std::io::ErrorKind::TimedOut.into());
            }
            Ok(0)
        }
    }

    fn drain(rx: &mpsc::Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn reader_reassembles_split_lines() {
        let (tx, rx) = mpsc::channel();
        let port = ChunkedPort {
            chunks: vec![b"REA".to_vec(), b"DY\r\nsync_".to_vec(), b"heading\r\n".to_vec()],
            timed_out: false,
        };
        read_lines(port, LinkId(7), &tx, &AtomicBool::new(false));

        let events = drain(&rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], BridgeEvent::HardwareLine { link: LinkId(7), line } if line == "READY\r\n"));
        assert!(matches!(&events[1], BridgeEvent::HardwareLine { line, .. } if line == "sync_heading\r\n"));
        assert!(matches!(events[2], BridgeEvent::TransportError { error: BridgeError::PortClosed, .. }));
    }

    #[test]
    fn reader_caps_runaway_lines() {
        let (tx, rx) = mpsc::channel();
        let port = ChunkedPort {
            chunks: vec![vec![b'x'; 300], b"\nREADY\r\n".to_vec()],
            timed_out: false,
        };
        read_lines(port, LinkId(3), &tx, &AtomicBool::new(false));

        let events = drain(&rx);
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], BridgeEvent::HardwareLine { line, .. } if line.len() == MAX_LINE_LEN));
        assert!(matches!(&events[1], BridgeEvent::HardwareLine { line, .. } if line.len() == 45));
        assert!(matches!(&events[2], BridgeEvent::HardwareLine { line, .. } if line == "READY\r\n"));
        assert!(matches!(events[3], BridgeEvent::TransportError { error: BridgeError::PortClosed, .. }));
    }

    #[test]
    fn reader_exits_quietly_when_stopped() {
        let (tx, rx) = mpsc::channel();
        read_lines(Cursor::new(b"READY\r\n".to_vec()), LinkId(1), &tx, &AtomicBool::new(true));
        assert!(drain(&rx).is_empty());
    }
}
