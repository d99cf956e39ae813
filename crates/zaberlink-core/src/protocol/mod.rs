//! Binary Serial Protocol Engine
//!
//! Implements the Zaber T-series binary command/response protocol.
//!
//! Both directions of the wire carry the same fixed 6-byte frame: a device
//! number, a command code, and a signed 32-bit data word, little-endian,
//! with no delimiters and no checksum. Synchronization relies entirely on
//! the fixed frame size and the one-request-one-reply discipline.

pub mod commands;
mod connection;
mod error;
mod faults;
mod frame;
pub mod serial;
pub mod status;
mod stream;

pub use commands::{decode_current, encode_current, Command, Setting};
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use error::ProtocolError;
pub use frame::{Frame, FRAME_SIZE};
pub use serial::{list_ports, open_channel, PortInfo};
pub use status::DeviceStatus;
pub use stream::{Channel, SerialChannel};

/// Default baud rate for the binary protocol (fixed by the controller)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default reply timeout in milliseconds
///
/// The controller answers well within 200ms on a quiet line; 500ms leaves
/// margin for USB serial adapters.
pub const DEFAULT_TIMEOUT_MS: u64 = 500;
