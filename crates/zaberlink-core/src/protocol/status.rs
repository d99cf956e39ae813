//! Device status decoding
//!
//! The status query (command 54) replies with an integer motion state in
//! the data word. Codes outside the documented table are preserved as
//! [`DeviceStatus::Unrecognized`], never coerced into a known label.

use serde::{Deserialize, Serialize};

/// Motion state reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// No motion in progress (code 0)
    Idle,
    /// Homing in progress (code 1)
    Homing,
    /// Manual move via the knob (code 10)
    ManualMove,
    /// Moving to a stored position (code 18)
    MoveToStoredPosition,
    /// Absolute move in progress (code 20)
    AbsoluteMove,
    /// Relative move in progress (code 21)
    RelativeMove,
    /// Constant-velocity move in progress (code 22)
    ConstantMove,
    /// Stop in progress (code 23)
    Stopping,
    /// A status code outside the documented table, with the raw code
    Unrecognized(i32),
}

impl DeviceStatus {
    /// Decode a raw status code
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => DeviceStatus::Idle,
            1 => DeviceStatus::Homing,
            10 => DeviceStatus::ManualMove,
            18 => DeviceStatus::MoveToStoredPosition,
            20 => DeviceStatus::AbsoluteMove,
            21 => DeviceStatus::RelativeMove,
            22 => DeviceStatus::ConstantMove,
            23 => DeviceStatus::Stopping,
            other => DeviceStatus::Unrecognized(other),
        }
    }

    /// The raw status code
    pub fn code(&self) -> i32 {
        match self {
            DeviceStatus::Idle => 0,
            DeviceStatus::Homing => 1,
            DeviceStatus::ManualMove => 10,
            DeviceStatus::MoveToStoredPosition => 18,
            DeviceStatus::AbsoluteMove => 20,
            DeviceStatus::RelativeMove => 21,
            DeviceStatus::ConstantMove => 22,
            DeviceStatus::Stopping => 23,
            DeviceStatus::Unrecognized(code) => *code,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DeviceStatus::Idle => "idle",
            DeviceStatus::Homing => "homing",
            DeviceStatus::ManualMove => "manual move",
            DeviceStatus::MoveToStoredPosition => "move to stored pos",
            DeviceStatus::AbsoluteMove => "absolute move",
            DeviceStatus::RelativeMove => "relative move",
            DeviceStatus::ConstantMove => "constant move",
            DeviceStatus::Stopping => "stop",
            DeviceStatus::Unrecognized(_) => "unrecognized",
        }
    }

    /// True when the controller reports no motion in progress
    pub fn is_idle(&self) -> bool {
        matches!(self, DeviceStatus::Idle)
    }
}
