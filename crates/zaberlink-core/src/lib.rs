//! # ZaberLink Core Library
//!
//! Driver for Zaber T-series motion controllers speaking the 6-byte binary
//! serial protocol.
//!
//! This library provides:
//! - The fixed 6-byte little-endian frame codec
//! - A blocking send/receive connection engine with lazy reconnection
//! - The motor command catalog (moves, homing, settings, status)
//! - Controller fault decoding with a built-in error-code table
//!
//! The protocol is half-duplex request/reply: every operation writes one
//! frame and blocks for at most one reply frame, bounded by a read timeout.
//!
//! ## Example
//!
//! ```rust,ignore
//! use zaberlink_core::protocol::Connection;
//!
//! // Connect to the controller (9600 baud, fixed by the device)
//! let mut conn = Connection::open("/dev/ttyUSB0")?;
//!
//! // Home the unit, then move to 100000 steps
//! conn.home(0)?;
//! let pos = conn.move_absolute(100_000.0, 0)?;
//! println!("position: {:?}", pos);
//! ```

#![warn(missing_docs)]

pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        Connection, ConnectionConfig, ConnectionState, DeviceStatus, Frame, ProtocolError,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
