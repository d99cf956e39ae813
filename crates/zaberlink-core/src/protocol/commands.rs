//! Command catalog
//!
//! Defines the motor commands of the binary protocol, the "return setting"
//! meta-command, and the running/hold current scaling shared by commands
//! 38 and 39.

use serde::{Deserialize, Serialize};

use super::frame::Frame;

/// Command code of a reply reporting a controller fault ("Busy"/error)
pub const FAULT_COMMAND: u8 = 255;

/// Command code of the "return setting" meta-command
pub const RETURN_SETTING: u8 = 53;

/// A persistent device setting
///
/// Writing a setting uses the setting's own command code with the value as
/// payload. Reading goes through the "return setting" meta-command (code
/// 53): querying is itself a command whose data payload selects which
/// setting to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Setting {
    /// Microstep resolution, 1 to 128 in powers of two (code 37)
    MicrostepResolution,
    /// Running current, stored as the scaled device code (code 38)
    RunningCurrent,
    /// Hold current, same scaling as the running current (code 39)
    HoldCurrent,
    /// Target speed in device units (code 42)
    TargetSpeed,
    /// Acceleration in device units (code 43)
    Acceleration,
}

impl Setting {
    /// The setting's command code
    pub fn code(&self) -> u8 {
        match self {
            Setting::MicrostepResolution => 37,
            Setting::RunningCurrent => 38,
            Setting::HoldCurrent => 39,
            Setting::TargetSpeed => 42,
            Setting::Acceleration => 43,
        }
    }
}

/// Motor commands supported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reset the unit as if power-cycled (code 0)
    Reset,
    /// Move to the home position (code 1)
    Home,
    /// Move to an absolute position in steps (code 20)
    MoveAbsolute,
    /// Move by a signed number of steps (code 21)
    MoveRelative,
    /// Stop any motion; the reply carries the final position (code 23)
    Stop,
    /// Overwrite the position counter without moving (code 45)
    SetCurrentPosition,
    /// Query the device id (code 50)
    DeviceId,
    /// Query the firmware version (code 51)
    FirmwareVersion,
    /// Query the motion status (code 54)
    Status,
    /// Query the current position in steps (code 60)
    Position,
    /// Write a device setting using the setting's own code
    Set(Setting),
    /// Read a device setting through the "return setting" meta-command
    Query(Setting),
}

impl Command {
    /// Wire command code
    pub fn code(&self) -> u8 {
        match self {
            Command::Reset => 0,
            Command::Home => 1,
            Command::MoveAbsolute => 20,
            Command::MoveRelative => 21,
            Command::Stop => 23,
            Command::SetCurrentPosition => 45,
            Command::DeviceId => 50,
            Command::FirmwareVersion => 51,
            Command::Status => 54,
            Command::Position => 60,
            Command::Set(setting) => setting.code(),
            Command::Query(_) => RETURN_SETTING,
        }
    }

    /// Build the request frame addressed to `motor_id`
    ///
    /// For [`Command::Query`] the data word carries the target setting's
    /// code and the `data` argument is ignored.
    pub fn frame(&self, motor_id: u8, data: i32) -> Frame {
        match self {
            Command::Query(setting) => {
                Frame::new(motor_id, RETURN_SETTING, i32::from(setting.code()))
            }
            _ => Frame::new(motor_id, self.code(), data),
        }
    }
}

/// Smallest running/hold current representable by the device code, in amps
///
/// Requests at or below this value encode to code 0.
pub const MIN_CURRENT: f64 = 10.0 / 127.0;

/// Encode a physical current into the device code used by commands 38/39
///
/// The device stores `10 / current` truncated to an integer, so the mapping
/// is a lossy quantization: distinct currents below [`MIN_CURRENT`] all
/// collapse to code 0, and values above it collapse to the nearest
/// representable step.
pub fn encode_current(amps: f64) -> i32 {
    if amps > MIN_CURRENT {
        (10.0 / amps) as i32
    } else {
        0
    }
}

/// Decode a device current code back into amps
///
/// Code 0 decodes to 0.0; the division is guarded, never performed on zero.
pub fn decode_current(code: i32) -> f64 {
    if code == 0 {
        0.0
    } else {
        10.0 / f64::from(code)
    }
}
