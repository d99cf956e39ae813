//! Protocol errors

use thiserror::Error;

use super::faults;

/// Errors that can occur while talking to the controller
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The serial port could not be opened; the connection stays down and
    /// the caller may retry
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Read or write failed mid-exchange; the connection has been dropped
    /// and the next operation will reconnect
    #[error("Transport error: {0}")]
    Transport(String),

    /// A reply arrived shorter than a full frame, so the channel has lost
    /// frame alignment
    #[error("Malformed reply: expected 6 bytes, got {len}")]
    MalformedReply {
        /// Number of bytes actually received
        len: usize,
    },

    /// The device itself reported a fault (reply command code 255)
    #[error("Controller fault {code} ({name}): {description}")]
    ControllerFault {
        /// Raw error code from the reply's data word
        code: i32,
        /// Short name from the fault catalog, or "unknown"
        name: String,
        /// Human-readable description
        description: String,
    },

    /// I/O error at the channel boundary
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Build a [`ProtocolError::ControllerFault`] from a raw error code
    ///
    /// Known codes are enriched from the fault catalog; unknown codes get a
    /// generic description carrying the raw value.
    pub fn controller_fault(code: i32) -> Self {
        match faults::lookup(code) {
            Some((name, description)) => ProtocolError::ControllerFault {
                code,
                name: name.to_string(),
                description: description.to_string(),
            },
            None => ProtocolError::ControllerFault {
                code,
                name: "unknown".to_string(),
                description: format!("unknown controller error {code}"),
            },
        }
    }
}
