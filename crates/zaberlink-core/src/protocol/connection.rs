//! Connection management
//!
//! Handles the connection lifecycle and the blocking one-request-one-reply
//! exchange with the controller, and exposes the motor command catalog as
//! typed methods.

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use tracing::{debug, trace, warn};

use super::commands::{self, Command, Setting};
use super::frame::{Frame, FRAME_SIZE};
use super::serial::open_channel;
use super::status::DeviceStatus;
use super::stream::Channel;
use super::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected; the next send will reconnect implicitly
    Disconnected,
    /// Transport open and ready for an exchange
    Connected,
}

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM4")
    pub port_name: String,
    /// Baud rate; the controller is fixed at 9600
    pub baud_rate: u32,
    /// Reply timeout in milliseconds
    pub timeout_ms: u64,
}

impl ConnectionConfig {
    /// Configuration for `port` with the default baud rate and timeout
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port_name: port.into(),
            ..Self::default()
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Factory producing the underlying channel from the configuration
type ChannelOpener =
    Box<dyn Fn(&ConnectionConfig) -> Result<Box<dyn Channel>, ProtocolError> + Send>;

/// Driver connection to a motor controller
///
/// The protocol is half-duplex with no sequence numbers or correlation ids,
/// so only one request may be outstanding; every exchange method takes
/// `&mut self` to enforce that. Callers sharing a connection across threads
/// must serialize access, e.g. behind a `Mutex`.
///
/// The connection reconnects lazily: sending while disconnected opens the
/// configured port first, so callers never manage connection state
/// explicitly.
pub struct Connection {
    channel: Option<Box<dyn Channel>>,
    state: ConnectionState,
    config: ConnectionConfig,
    opener: ChannelOpener,
}

impl Connection {
    /// Create a connection (not yet connected)
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            channel: None,
            state: ConnectionState::Disconnected,
            config,
            opener: Box::new(open_channel),
        }
    }

    /// Configure for `port` with defaults and connect immediately
    pub fn open(port: impl Into<String>) -> Result<Self, ProtocolError> {
        let mut conn = Self::new(ConnectionConfig::new(port));
        conn.connect()?;
        Ok(conn)
    }

    /// Create a connection with a custom channel factory
    ///
    /// Used by tests and by embeddings that bring their own transport; the
    /// factory is also what lazy reconnection calls.
    pub fn with_opener<F>(config: ConnectionConfig, opener: F) -> Self
    where
        F: Fn(&ConnectionConfig) -> Result<Box<dyn Channel>, ProtocolError> + Send + 'static,
    {
        Self {
            channel: None,
            state: ConnectionState::Disconnected,
            config,
            opener: Box::new(opener),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The configuration this connection was built with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the transport, closing any previous channel first
    ///
    /// On failure the state remains [`ConnectionState::Disconnected`].
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        if self.channel.is_some() {
            self.close();
        }
        match (self.opener)(&self.config) {
            Ok(channel) => {
                self.channel = Some(channel);
                self.state = ConnectionState::Connected;
                debug!(port = %self.config.port_name, "connected");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                warn!(port = %self.config.port_name, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    /// Close the transport
    ///
    /// Idempotent; always leaves the state Disconnected. Dropping the
    /// channel releases the port handle, so nothing here can fail.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            debug!(port = %self.config.port_name, "closed");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Write one command frame
    ///
    /// Reconnects implicitly with the configured port when disconnected. A
    /// write failure drops the connection and surfaces immediately as
    /// [`ProtocolError::Transport`]; it is never deferred to the following
    /// receive.
    pub fn send_command(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        if self.channel.is_none() {
            debug!(port = %self.config.port_name, "reconnecting before send");
            self.connect()?;
        }
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| ProtocolError::ConnectionFailed("port is not open".to_string()))?;

        // Drop stale input so the next reply is frame-aligned
        let _ = channel.clear_input_buffer();

        let bytes = frame.encode();
        let result = channel.write_all(&bytes).and_then(|()| channel.flush());
        match result {
            Ok(()) => {
                trace!(bytes = ?bytes, command = frame.command, "tx frame");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "write failed, dropping connection");
                self.close();
                Err(ProtocolError::Transport(e.to_string()))
            }
        }
    }

    /// Read one reply frame
    ///
    /// Returns `Ok(None)` when the controller sends nothing within the
    /// timeout; the caller interprets that as "no reply". A short non-empty
    /// read means the channel lost frame alignment and is reported as
    /// [`ProtocolError::MalformedReply`]. A transport-level read error
    /// drops the connection and is reported as [`ProtocolError::Transport`].
    pub fn receive_reply(&mut self) -> Result<Option<Frame>, ProtocolError> {
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| ProtocolError::Transport("port is not open".to_string()))?;

        let mut buf = [0u8; FRAME_SIZE];
        let mut filled = 0;
        let mut read_error: Option<io::Error> = None;
        while filled < FRAME_SIZE {
            match channel.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    break
                }
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = read_error {
            warn!(error = %e, "read failed, dropping connection");
            self.close();
            return Err(ProtocolError::Transport(e.to_string()));
        }

        match filled {
            0 => {
                debug!("no reply within timeout");
                Ok(None)
            }
            FRAME_SIZE => {
                let frame = Frame::decode(&buf)?;
                trace!(?frame, "rx frame");
                Ok(Some(frame))
            }
            len => Err(ProtocolError::MalformedReply { len }),
        }
    }

    /// One full exchange: send a command frame, block for at most one reply
    ///
    /// Strict send-then-receive, exactly once, no retry. A reply with
    /// command code 255 is a controller fault and is always surfaced as
    /// [`ProtocolError::ControllerFault`], never swallowed.
    pub fn send_receive(&mut self, frame: &Frame) -> Result<Option<Frame>, ProtocolError> {
        self.send_command(frame)?;
        match self.receive_reply()? {
            Some(reply) if reply.command == commands::FAULT_COMMAND => {
                Err(ProtocolError::controller_fault(reply.data))
            }
            other => Ok(other),
        }
    }

    fn exchange(
        &mut self,
        command: Command,
        motor_id: u8,
        data: i32,
    ) -> Result<Option<i32>, ProtocolError> {
        let frame = command.frame(motor_id, data);
        Ok(self.send_receive(&frame)?.map(|reply| reply.data))
    }

    // ---- Command catalog ---------------------------------------------------
    //
    // One method per catalog entry. `motor_id` 0 addresses the default unit.
    // Value-returning operations yield `Ok(None)` when no reply arrived
    // within the timeout.

    /// Reset the unit as if power-cycled (command 0)
    pub fn reset(&mut self, motor_id: u8) -> Result<(), ProtocolError> {
        self.exchange(Command::Reset, motor_id, 0)?;
        Ok(())
    }

    /// Move to the home position and zero the position counter (command 1)
    pub fn home(&mut self, motor_id: u8) -> Result<(), ProtocolError> {
        self.exchange(Command::Home, motor_id, 0)?;
        Ok(())
    }

    /// Query the device id (command 50)
    pub fn device_id(&mut self, motor_id: u8) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::DeviceId, motor_id, 0)
    }

    /// Query the firmware version (command 51)
    pub fn firmware_version(&mut self, motor_id: u8) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::FirmwareVersion, motor_id, 0)
    }

    /// Query the current position in steps (command 60)
    pub fn position(&mut self, motor_id: u8) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::Position, motor_id, 0)
    }

    /// Move to an absolute position in steps (command 20)
    ///
    /// The protocol has no fractional representation; the position is
    /// truncated to an integer. The reply reports the position reached.
    pub fn move_absolute(
        &mut self,
        position: f64,
        motor_id: u8,
    ) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::MoveAbsolute, motor_id, position as i32)
    }

    /// Move by a signed number of steps (command 21)
    pub fn move_relative(
        &mut self,
        delta: f64,
        motor_id: u8,
    ) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::MoveRelative, motor_id, delta as i32)
    }

    /// Set the target speed in device units (command 42)
    pub fn set_target_speed(
        &mut self,
        speed: f64,
        motor_id: u8,
    ) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::Set(Setting::TargetSpeed), motor_id, speed as i32)
    }

    /// Query the target speed (command 53, setting 42)
    pub fn target_speed(&mut self, motor_id: u8) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::Query(Setting::TargetSpeed), motor_id, 0)
    }

    /// Set the acceleration in device units (command 43)
    pub fn set_acceleration(
        &mut self,
        acceleration: f64,
        motor_id: u8,
    ) -> Result<Option<i32>, ProtocolError> {
        self.exchange(
            Command::Set(Setting::Acceleration),
            motor_id,
            acceleration as i32,
        )
    }

    /// Query the acceleration (command 53, setting 43)
    pub fn acceleration(&mut self, motor_id: u8) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::Query(Setting::Acceleration), motor_id, 0)
    }

    /// Overwrite the position counter without moving (command 45)
    pub fn set_current_position(
        &mut self,
        position: f64,
        motor_id: u8,
    ) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::SetCurrentPosition, motor_id, position as i32)
    }

    /// Set the microstep resolution: 1, 2, 4, ..., 128 (command 37)
    ///
    /// Out-of-range values are rejected by the controller itself with a
    /// fault reply.
    pub fn set_microstep_resolution(
        &mut self,
        resolution: i32,
        motor_id: u8,
    ) -> Result<Option<i32>, ProtocolError> {
        self.exchange(
            Command::Set(Setting::MicrostepResolution),
            motor_id,
            resolution,
        )
    }

    /// Query the microstep resolution (command 53, setting 37)
    pub fn microstep_resolution(&mut self, motor_id: u8) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::Query(Setting::MicrostepResolution), motor_id, 0)
    }

    /// Stop any motion; the reply reports the final position (command 23)
    pub fn stop(&mut self, motor_id: u8) -> Result<Option<i32>, ProtocolError> {
        self.exchange(Command::Stop, motor_id, 0)
    }

    /// Set the running current in amps (command 38)
    ///
    /// The device stores `10 / amps` truncated to an integer, so the value
    /// actually applied may differ from the request; the return value is
    /// the applied current decoded from the echo. Requests at or below
    /// [`commands::MIN_CURRENT`] collapse to 0.
    pub fn set_running_current(
        &mut self,
        amps: f64,
        motor_id: u8,
    ) -> Result<Option<f64>, ProtocolError> {
        Ok(self
            .exchange(
                Command::Set(Setting::RunningCurrent),
                motor_id,
                commands::encode_current(amps),
            )?
            .map(commands::decode_current))
    }

    /// Query the running current in amps (command 53, setting 38)
    pub fn running_current(&mut self, motor_id: u8) -> Result<Option<f64>, ProtocolError> {
        Ok(self
            .exchange(Command::Query(Setting::RunningCurrent), motor_id, 0)?
            .map(commands::decode_current))
    }

    /// Set the hold current in amps, same scaling as the running current
    /// (command 39)
    pub fn set_hold_current(
        &mut self,
        amps: f64,
        motor_id: u8,
    ) -> Result<Option<f64>, ProtocolError> {
        Ok(self
            .exchange(
                Command::Set(Setting::HoldCurrent),
                motor_id,
                commands::encode_current(amps),
            )?
            .map(commands::decode_current))
    }

    /// Query the hold current in amps (command 53, setting 39)
    pub fn hold_current(&mut self, motor_id: u8) -> Result<Option<f64>, ProtocolError> {
        Ok(self
            .exchange(Command::Query(Setting::HoldCurrent), motor_id, 0)?
            .map(commands::decode_current))
    }

    /// Query the motion status (command 54)
    ///
    /// A status code outside the documented table decodes to
    /// [`DeviceStatus::Unrecognized`]; no further bytes are read, keeping
    /// the channel aligned on one reply per request.
    pub fn status(&mut self, motor_id: u8) -> Result<Option<DeviceStatus>, ProtocolError> {
        Ok(self
            .exchange(Command::Status, motor_id, 0)?
            .map(DeviceStatus::from_code))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
