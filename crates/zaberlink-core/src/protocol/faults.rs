//! Controller fault catalog
//!
//! When a reply carries command code 255 the data word is an error code
//! reported by the device itself. This table maps the documented codes to a
//! short name and description. It is a process-wide constant; codes outside
//! the table are handled by the caller with a generic fallback, never a
//! panic.

/// Look up a documented controller error code
///
/// Returns `(name, description)` for known codes, `None` otherwise.
pub fn lookup(code: i32) -> Option<(&'static str, &'static str)> {
    let entry = match code {
        1 => ("cannot home", "home command failed, no home sensor found"),
        2 => ("device number invalid", "device number must be 1 to 254"),
        14 => ("voltage low", "supply voltage below the operating range"),
        15 => ("voltage high", "supply voltage above the operating range"),
        18 => (
            "stored position invalid",
            "requested stored position register is empty or out of range",
        ),
        20 => (
            "absolute position invalid",
            "target position outside the range of travel",
        ),
        21 => (
            "relative position invalid",
            "relative move would exceed the range of travel",
        ),
        22 => (
            "velocity invalid",
            "constant-velocity move speed out of range",
        ),
        36 => (
            "peripheral id invalid",
            "restore settings requested for an unknown peripheral id",
        ),
        37 => (
            "resolution invalid",
            "microstep resolution must be 1, 2, 4, 8, 16, 32, 64 or 128",
        ),
        38 => ("run current invalid", "running current code out of range"),
        39 => ("hold current invalid", "hold current code out of range"),
        42 => ("target speed invalid", "target speed out of range"),
        43 => ("acceleration invalid", "acceleration out of range"),
        44 => (
            "maximum range invalid",
            "maximum range setting out of range",
        ),
        45 => (
            "current position invalid",
            "position counter value outside the range of travel",
        ),
        47 => ("offset invalid", "home offset out of range"),
        48 => ("alias invalid", "alias number must be 0 to 254"),
        49 => ("lock state invalid", "lock state must be 0 or 1"),
        50 => (
            "device id unknown",
            "the device id is not recognized by the firmware",
        ),
        64 => ("command invalid", "the command code is not supported"),
        255 => ("busy", "a move is in progress, command rejected"),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_resolve() {
        let (name, description) = lookup(20).unwrap();
        assert_eq!(name, "absolute position invalid");
        assert!(description.contains("range of travel"));

        let (name, _) = lookup(255).unwrap();
        assert_eq!(name, "busy");
    }

    #[test]
    fn test_unknown_codes_return_none() {
        assert!(lookup(0).is_none());
        assert!(lookup(12345).is_none());
        assert!(lookup(-7).is_none());
    }
}
