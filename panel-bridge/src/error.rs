use thiserror::Error;

/// Failures on the hardware side of the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cannot open serial port {port}: {source}")]
    PortOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("cannot list serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port closed by the device")]
    PortClosed,
    #[error("hardware link is closed")]
    LinkClosed,
    #[error("no hardware link attached")]
    NotConnected,
}

/// Failures on the simulator side of the bridge.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulator session unavailable")]
    Unavailable,
    #[error("event sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_failures_convert_with_source() {
        let err = BridgeError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(err, BridgeError::Io(_)));
        assert!(err.source().is_some());

        let err = SimError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(BridgeError::NotConnected.to_string(), "no hardware link attached");
        assert_eq!(BridgeError::PortClosed.to_string(), "serial port closed by the device");
        assert_eq!(SimError::Unavailable.to_string(), "simulator session unavailable");
    }
}
